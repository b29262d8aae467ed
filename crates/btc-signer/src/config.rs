//! Operator settings of the signer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeta_btc_params::constants::{
    BROADCAST_ATTEMPTS, BROADCAST_MAX_JITTER, OUTBOUND_SCHEDULE_TICK,
};

/// How withdrawals are scheduled and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Number of `sendrawtransaction` attempts per signed withdrawal.
    pub broadcast_attempts: usize,

    /// Upper bound of the random delay before each attempt, in milliseconds.
    pub max_broadcast_jitter_ms: u64,

    /// Interval between two scheduling rounds, in milliseconds.
    pub schedule_tick_ms: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            broadcast_attempts: BROADCAST_ATTEMPTS,
            max_broadcast_jitter_ms: BROADCAST_MAX_JITTER.as_millis() as u64,
            schedule_tick_ms: OUTBOUND_SCHEDULE_TICK.as_millis() as u64,
        }
    }
}

impl SignerConfig {
    /// Upper bound of the random delay before each broadcast attempt.
    pub fn max_broadcast_jitter(&self) -> Duration {
        Duration::from_millis(self.max_broadcast_jitter_ms)
    }

    /// Interval between two scheduling rounds.
    pub fn schedule_tick(&self) -> Duration {
        Duration::from_millis(self.schedule_tick_ms)
    }
}
