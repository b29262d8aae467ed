//! Protocol constants shared by the observer and the signer.

use std::time::Duration;

use bitcoin::Amount;

/// Amounts at or above this value are considered "big" and require
/// [`BIG_VALUE_CONFIRMATION_COUNT`] confirmations.
pub const BIG_VALUE_SATS: Amount = Amount::from_sat(200_000_000);

/// Number of confirmations required for big-value transfers.
pub const BIG_VALUE_CONFIRMATION_COUNT: u64 = 6;

/// Offset added to the nonce to derive the value of the nonce-mark output.
///
/// The offset keeps the nonce-mark above the dust limit.
pub const BTC_DUST_OFFSET: u64 = 2_000;

/// If the persisted last scanned block is further than this behind the tip, scanning restarts at
/// the tip.
pub const MAX_HEIGHT_DIFF: u64 = 10_000;

/// Number of blocks produced per day on average. Used to size the block cache.
pub const BTC_BLOCKS_PER_DAY: usize = 144;

/// The memo sent by donations to the TSS address. Such deposits are not credited.
pub const DONATION_MESSAGE: &str = "I am rich!";

/// The maximum number of inputs a single withdrawal may spend.
pub const MAX_INPUTS_PER_TX: usize = 20;

/// UTXOs ranked below this many largest ones are swept in by withdrawals to reduce fragmentation.
pub const CONSOLIDATION_RANK: usize = 10;

/// The block at which scanning starts on regtest.
pub const REGTEST_BOOTSTRAP_HEIGHT: u64 = 100;

/// Interval of the RPC health check.
pub const RPC_STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// A tip older than this is reported as stale by the RPC health check.
pub const RPC_STALE_TIP_AGE: Duration = Duration::from_secs(1200);

/// Number of attempts made to broadcast a signed withdrawal.
pub const BROADCAST_ATTEMPTS: usize = 5;

/// Upper bound of the random delay before each broadcast attempt.
pub const BROADCAST_MAX_JITTER: Duration = Duration::from_millis(1500);

/// Chain id of the consensus chain when the configuration does not name one.
pub const DEFAULT_ZETA_CHAIN_ID: i64 = 7000;

/// Interval between two outbound scheduling rounds, roughly one consensus-chain block.
pub const OUTBOUND_SCHEDULE_TICK: Duration = Duration::from_secs(3);
