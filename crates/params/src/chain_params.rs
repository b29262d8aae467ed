//! Per-chain parameters and feature flags published by the consensus chain.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{default, errors::ParamsError};

/// Per-chain parameters set by governance on the consensus chain.
///
/// These are shared read-mostly by all tasks and are replaced as a whole whenever the consensus
/// chain publishes new values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// The chain these params apply to.
    pub chain_id: i64,

    /// Number of confirmations a block needs before it is scanned.
    pub confirmation_count: u64,

    /// Interval between two gas price reports, in seconds.
    pub gas_price_ticker: u64,

    /// Interval between two inbound scans, in seconds.
    pub inbound_ticker: u64,

    /// Interval between two outbound scans, in seconds.
    pub outbound_ticker: u64,

    /// Interval between two UTXO refreshes, in seconds.
    pub watch_utxo_ticker: u64,

    /// Number of consensus-chain blocks between two keysign attempts of the same outbound.
    pub outbound_schedule_interval: u64,

    /// Number of pending outbounds looked at per scheduling round.
    pub outbound_schedule_lookahead: u64,

    /// Whether the chain is supported at all.
    pub is_supported: bool,
}

impl ChainParams {
    /// Creates params for `chain_id` filled with the default values.
    pub fn with_defaults(chain_id: i64) -> Self {
        Self {
            chain_id,
            confirmation_count: default::CONFIRMATION_COUNT,
            gas_price_ticker: default::GAS_PRICE_TICKER,
            inbound_ticker: default::INBOUND_TICKER,
            outbound_ticker: default::OUTBOUND_TICKER,
            watch_utxo_ticker: default::WATCH_UTXO_TICKER,
            outbound_schedule_interval: default::OUTBOUND_SCHEDULE_INTERVAL,
            outbound_schedule_lookahead: default::OUTBOUND_SCHEDULE_LOOKAHEAD,
            is_supported: true,
        }
    }

    /// Checks that the params can drive the observer.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.confirmation_count == 0 {
            return Err(ParamsError::InvalidChainParams(
                "confirmation count must be positive".to_string(),
            ));
        }

        let tickers = [
            ("gas_price_ticker", self.gas_price_ticker),
            ("inbound_ticker", self.inbound_ticker),
            ("outbound_ticker", self.outbound_ticker),
            ("watch_utxo_ticker", self.watch_utxo_ticker),
            ("outbound_schedule_interval", self.outbound_schedule_interval),
        ];
        if let Some((name, _)) = tickers.iter().find(|(_, secs)| *secs == 0) {
            return Err(ParamsError::InvalidChainParams(format!(
                "{name} must be positive"
            )));
        }

        Ok(())
    }

    /// Interval between two gas price reports.
    pub fn gas_price_interval(&self) -> Duration {
        Duration::from_secs(self.gas_price_ticker)
    }

    /// Interval between two inbound scans.
    pub fn inbound_interval(&self) -> Duration {
        Duration::from_secs(self.inbound_ticker)
    }

    /// Interval between two outbound scans.
    pub fn outbound_interval(&self) -> Duration {
        Duration::from_secs(self.outbound_ticker)
    }

    /// Interval between two UTXO refreshes.
    pub fn watch_utxo_interval(&self) -> Duration {
        Duration::from_secs(self.watch_utxo_ticker)
    }
}

/// Feature switches that apply to all chains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosschainFlags {
    /// Whether deposits are observed and voted.
    pub is_inbound_enabled: bool,

    /// Whether withdrawals are signed and broadcast.
    pub is_outbound_enabled: bool,

    /// Chains for which block headers are relayed to the consensus chain.
    #[serde(default)]
    pub header_verification_chains: Vec<i64>,
}

impl CrosschainFlags {
    /// Returns whether block headers of `chain_id` are relayed.
    pub fn is_header_verification_enabled(&self, chain_id: i64) -> bool {
        self.header_verification_chains.contains(&chain_id)
    }
}
