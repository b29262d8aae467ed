//! A periodically refreshed snapshot of the consensus chain configuration.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use bitcoin::PublicKey;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeta_btc_params::prelude::{ChainParams, CrosschainFlags};

use crate::{client::ZetacoreClient, errors::ZetacoreResult};

/// The configuration of the consensus chain at some point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreSnapshot {
    /// Params of every supported chain, by chain id.
    pub chain_params: BTreeMap<i64, ChainParams>,

    /// Crosschain feature flags.
    pub flags: CrosschainFlags,

    /// The current TSS public key, once known.
    pub tss_pubkey: Option<PublicKey>,
}

/// Read handle on the latest [`CoreSnapshot`].
///
/// Cloning is cheap. Readers always see a whole snapshot; updates replace it atomically.
#[derive(Debug, Clone)]
pub struct CoreContext {
    receiver: watch::Receiver<Arc<CoreSnapshot>>,
}

impl CoreContext {
    /// Creates a context that always returns `snapshot`.
    pub fn fixed(snapshot: CoreSnapshot) -> Self {
        let (_, receiver) = watch::channel(Arc::new(snapshot));
        Self { receiver }
    }

    /// Returns the latest snapshot.
    pub fn snapshot(&self) -> Arc<CoreSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Returns the params of `chain_id`, if the chain is known.
    pub fn chain_params(&self, chain_id: i64) -> Option<ChainParams> {
        self.receiver.borrow().chain_params.get(&chain_id).cloned()
    }

    /// Returns the crosschain flags.
    pub fn flags(&self) -> CrosschainFlags {
        self.receiver.borrow().flags.clone()
    }

    /// Returns the TSS public key, if known.
    pub fn tss_pubkey(&self) -> Option<PublicKey> {
        self.receiver.borrow().tss_pubkey
    }
}

/// The single writer of the [`CoreContext`].
#[derive(Debug)]
pub struct CoreContextUpdater<Z: ?Sized> {
    client: Arc<Z>,
    sender: watch::Sender<Arc<CoreSnapshot>>,
}

impl<Z: ZetacoreClient + ?Sized> CoreContextUpdater<Z> {
    /// Creates the updater and the context it feeds, starting from `initial`.
    pub fn new(client: Arc<Z>, initial: CoreSnapshot) -> (Self, CoreContext) {
        let (sender, receiver) = watch::channel(Arc::new(initial));

        (Self { client, sender }, CoreContext { receiver })
    }

    /// Fetches the latest configuration and publishes it.
    ///
    /// On error the previous snapshot stays in place. Chain params that fail validation are
    /// dropped from the new snapshot.
    pub async fn refresh(&self) -> ZetacoreResult<()> {
        let params = self.client.get_chain_params().await?;
        let flags = self.client.get_crosschain_flags().await?;
        let tss_pubkey = self.client.get_tss_pubkey().await?;

        let chain_params = params
            .into_iter()
            .filter(|params| match params.validate() {
                Ok(()) => params.is_supported,
                Err(err) => {
                    warn!(chain_id = %params.chain_id, %err, "ignoring invalid chain params");
                    false
                }
            })
            .map(|params| (params.chain_id, params))
            .collect();

        let snapshot = CoreSnapshot {
            chain_params,
            flags,
            tss_pubkey: Some(tss_pubkey),
        };

        let changed = self.sender.send_if_modified(|current| {
            if **current == snapshot {
                return false;
            }

            *current = Arc::new(snapshot);
            true
        });

        if changed {
            info!("core context updated");
        } else {
            debug!("core context unchanged");
        }

        Ok(())
    }

    /// Refreshes the context every `interval` until `cancel` fires.
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(?interval, "core context updater started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("core context updater stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh().await {
                        warn!(%err, "could not refresh core context, keeping the previous one");
                    }
                }
            }
        }
    }
}
