//! Constants of the fee model.
//!
//! All sizes are in virtual bytes. The values are computed once at startup and passed by value to
//! whoever needs them so that tests can run the fee model with alternate parameters.

use bitcoin::Amount;
use serde::{Deserialize, Serialize};

use crate::default;

/// The parameters of the fee model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Size of a segwit input excluding its witness: outpoint (36) + script length (1) +
    /// sequence (4).
    pub bytes_per_input: u64,

    /// Size of a P2TR output.
    pub bytes_per_output_p2tr: u64,

    /// Size of a P2WSH output.
    pub bytes_per_output_p2wsh: u64,

    /// Size of a P2WPKH output.
    pub bytes_per_output_p2wpkh: u64,

    /// Size of a P2SH output.
    pub bytes_per_output_p2sh: u64,

    /// Size of a P2PKH output.
    pub bytes_per_output_p2pkh: u64,

    /// Size assumed for outputs of any other type.
    pub bytes_per_output_avg: u64,

    /// Weight of the first input's witness, including the segwit marker and flag.
    pub bytes_first_witness: u64,

    /// Weight of each further input's witness.
    pub bytes_per_witness: u64,

    /// Lower clamp of the estimated withdrawal size.
    pub outbound_bytes_min: u64,

    /// Upper clamp of the estimated withdrawal size. Also used to estimate the fee before the
    /// inputs are known.
    pub outbound_bytes_max: u64,

    /// Average size of a withdrawal.
    pub outbound_bytes_avg: u64,

    /// Fee rate charged to depositors when no dynamic rate applies, in sat/vB.
    pub default_depositor_fee_rate: u64,

    /// Fee rate reported on testnet when recent blocks yield nothing, in sat/vB.
    pub default_testnet_fee_rate: u64,

    /// Number of recent blocks looked at to derive the testnet fee rate.
    pub fee_rate_count_back_blocks: u64,

    /// Multiplier applied to block-derived fee rates.
    pub gas_price_multiplier: f64,

    /// Mainnet height from which the depositor fee follows the block fee rate.
    pub dynamic_depositor_fee_height: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            bytes_per_input: 41,
            bytes_per_output_p2tr: 43,
            bytes_per_output_p2wsh: 43,
            bytes_per_output_p2wpkh: 31,
            bytes_per_output_p2sh: 32,
            bytes_per_output_p2pkh: 34,
            bytes_per_output_avg: 37,
            bytes_first_witness: 110,
            bytes_per_witness: 108,
            outbound_bytes_min: 239,
            outbound_bytes_max: 1543,
            outbound_bytes_avg: 245,
            default_depositor_fee_rate: default::DEPOSITOR_FEE_RATE,
            default_testnet_fee_rate: default::TESTNET_FEE_RATE,
            fee_rate_count_back_blocks: 2,
            gas_price_multiplier: default::GAS_PRICE_MULTIPLIER,
            dynamic_depositor_fee_height: default::DYNAMIC_DEPOSITOR_FEE_HEIGHT,
        }
    }
}

impl FeeConfig {
    /// Virtual size of the input that spends a deposit: one P2WPKH input and its witness.
    pub fn depositor_tx_vsize(&self) -> u64 {
        self.bytes_per_input + self.bytes_per_witness / 4
    }

    /// The fee charged to a depositor at `sat_per_vbyte`.
    pub fn depositor_fee(&self, sat_per_vbyte: u64) -> Amount {
        Amount::from_sat(sat_per_vbyte * self.depositor_tx_vsize())
    }

    /// The depositor fee charged at the default rate.
    ///
    /// This doubles as the minimum value of a UTXO worth spending.
    pub fn default_depositor_fee(&self) -> Amount {
        self.depositor_fee(self.default_depositor_fee_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depositor_fee() {
        let config = FeeConfig::default();

        assert_eq!(config.depositor_tx_vsize(), 68);
        assert_eq!(
            config.default_depositor_fee(),
            Amount::from_sat(1360),
            "default depositor fee must be 0.00001360 BTC"
        );
    }
}
