//! Default values for the observer parameters.

/// Default number of confirmations before a block is scanned.
pub(crate) const CONFIRMATION_COUNT: u64 = 2;

/// Default interval between two inbound scans, in seconds.
pub(crate) const INBOUND_TICKER: u64 = 60;

/// Default interval between two outbound scans, in seconds.
pub(crate) const OUTBOUND_TICKER: u64 = 60;

/// Default interval between two gas price reports, in seconds.
pub(crate) const GAS_PRICE_TICKER: u64 = 300;

/// Default interval between two UTXO refreshes, in seconds.
pub(crate) const WATCH_UTXO_TICKER: u64 = 30;

/// Default number of consensus-chain blocks between two keysign attempts of an outbound.
pub(crate) const OUTBOUND_SCHEDULE_INTERVAL: u64 = 2;

/// Default number of pending outbounds looked at per scheduling round.
pub(crate) const OUTBOUND_SCHEDULE_LOOKAHEAD: u64 = 60;

/// Default fee rate charged to depositors, in sat/vB.
pub(crate) const DEPOSITOR_FEE_RATE: u64 = 20;

/// Default fee rate used on testnet when no recent block yields a rate, in sat/vB.
pub(crate) const TESTNET_FEE_RATE: u64 = 10;

/// Default multiplier applied to fee rates derived from blocks.
pub(crate) const GAS_PRICE_MULTIPLIER: f64 = 2.0;

/// Mainnet height at which the dynamic depositor fee takes effect.
pub(crate) const DYNAMIC_DEPOSITOR_FEE_HEIGHT: u64 = 834_500;
