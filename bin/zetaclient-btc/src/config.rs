use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use zeta_btc_db::persistent::config::DbConfig;
use zeta_btc_params::{constants::DEFAULT_ZETA_CHAIN_ID, prelude::ComplianceConfig};
use zeta_btc_signer::SignerConfig;
use zetacore_client::ZetacoreConfig;

use crate::constants::DEFAULT_CONTEXT_REFRESH_INTERVAL;

/// The configuration values that dictate the behavior of the client.
///
/// These values are operational: observers of the same chain may run with different ones without
/// disagreeing on what they vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory to store all the data in.
    pub datadir: PathBuf,

    /// The number of worker threads of the runtime.
    pub num_threads: Option<u8>,

    /// The stack size of each worker thread, in bytes.
    pub thread_stack_size: Option<usize>,

    /// How long running tasks are given to stop once shutdown is requested.
    pub shutdown_timeout: Duration,

    /// The bitcoin nodes, tried in the order given.
    pub btc_clients: Vec<BtcClientConfig>,

    /// The endpoints of the consensus chain.
    pub zetacore: ZetacoreConfig,

    /// The signing key.
    pub tss: TssConfig,

    /// The configuration for the sqlite3 database.
    #[serde(default)]
    pub db: DbConfig,

    /// Settings of the observer.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Settings of the withdrawal signer.
    #[serde(default)]
    pub signer: SignerConfig,

    /// Addresses that are never paid nor credited.
    #[serde(default)]
    pub compliance: ComplianceConfig,
}

/// A bitcoin node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BtcClientConfig {
    pub url: String,
    pub user: String,
    pub pass: String,
    pub retry_count: Option<u8>,
    pub retry_interval: Option<u64>,
}

/// The key the client signs withdrawals with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TssConfig {
    /// A file holding the hex-encoded secret key.
    ///
    /// NOTE: a single local key only stands in for the threshold signer on development networks.
    pub secret_key_file: PathBuf,
}

/// Settings of the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ObserverConfig {
    /// Chain id of the consensus chain.
    pub zeta_chain_id: i64,

    /// Interval between two refreshes of the chain params, flags and TSS key.
    pub context_refresh_interval: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            zeta_chain_id: DEFAULT_ZETA_CHAIN_ID,
            context_refresh_interval: DEFAULT_CONTEXT_REFRESH_INTERVAL,
        }
    }
}
