//! The fee model: transaction size estimates, block fee rates, depositor fees and the confirmation
//! policy.
//!
//! Every function takes its constants from a [`FeeConfig`] passed by the caller.

use bitcoin::{consensus, consensus::encode::VarInt, Address, AddressType, Amount, Transaction};
use tracing::warn;
use zeta_btc_params::{
    chain::BtcChain,
    constants::{BIG_VALUE_CONFIRMATION_COUNT, BIG_VALUE_SATS},
    fee::FeeConfig,
};

use crate::{
    errors::{FeeError, ScriptError},
    rpc_types::GetBlockVerboseTxResult,
};

/// Segwit weight units per virtual byte.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// The block reward before any halving.
const INITIAL_SUBSIDY: Amount = Amount::from_sat(50 * 100_000_000);

/// Size of the non-input/output part of a transaction: version, lock time and the two counts.
pub fn wired_tx_size(num_inputs: u64, num_outputs: u64) -> u64 {
    8 + VarInt(num_inputs).size() as u64 + VarInt(num_outputs).size() as u64
}

/// Size of an output paying to `address`.
pub fn output_size_for_address(address: &Address, cfg: &FeeConfig) -> Result<u64, ScriptError> {
    match address.address_type() {
        Some(AddressType::P2tr) => Ok(cfg.bytes_per_output_p2tr),
        Some(AddressType::P2wsh) => Ok(cfg.bytes_per_output_p2wsh),
        Some(AddressType::P2wpkh) => Ok(cfg.bytes_per_output_p2wpkh),
        Some(AddressType::P2sh) => Ok(cfg.bytes_per_output_p2sh),
        Some(AddressType::P2pkh) => Ok(cfg.bytes_per_output_p2pkh),
        _ => Err(ScriptError::UnsupportedAddress(address.to_string())),
    }
}

/// Estimates the virtual size of a withdrawal spending `num_inputs` TSS inputs.
///
/// Besides one output per payee, the withdrawal carries the nonce-mark and the change output,
/// both P2WPKH. Returns zero if there is no input.
pub fn estimate_outbound_size(
    num_inputs: u64,
    payees: &[Address],
    cfg: &FeeConfig,
) -> Result<u64, FeeError> {
    if num_inputs == 0 {
        return Ok(0);
    }

    let num_outputs = 2 + payees.len() as u64;
    let bytes_wired = wired_tx_size(num_inputs, num_outputs);
    let bytes_inputs = num_inputs * cfg.bytes_per_input;
    let bytes_outputs = 2 * cfg.bytes_per_output_p2wpkh;

    let mut bytes_payees = 0;
    for payee in payees {
        bytes_payees += output_size_for_address(payee, cfg)?;
    }

    let bytes_witness = cfg.bytes_first_witness + (num_inputs - 1) * cfg.bytes_per_witness;

    Ok(bytes_wired
        + bytes_inputs
        + bytes_outputs
        + bytes_payees
        + bytes_witness / WITNESS_SCALE_FACTOR)
}

/// Virtual size borne by the withdrawer: one input and three outputs, one of which is of average
/// size.
pub fn outbound_size_withdrawer(cfg: &FeeConfig) -> u64 {
    wired_tx_size(1, 3)
        + cfg.bytes_per_input
        + 2 * cfg.bytes_per_output_p2wpkh
        + cfg.bytes_per_output_avg
        + cfg.bytes_first_witness / WITNESS_SCALE_FACTOR
}

/// Converts a fee rate in BTC/kvB, as returned by the node, into sat/vB.
pub fn fee_rate_to_sat_per_vbyte(btc_per_kvb: f64) -> u64 {
    let sat_per_kvb = (btc_per_kvb * Amount::ONE_BTC.to_sat() as f64).max(0.0) as u64;
    sat_per_kvb / 1000
}

/// The block subsidy at `height` on `chain`.
pub fn block_subsidy(height: u64, chain: &BtcChain) -> Amount {
    let halvings = height / chain.subsidy_halving_interval();
    if halvings >= 64 {
        return Amount::ZERO;
    }

    Amount::from_sat(INITIAL_SUBSIDY.to_sat() >> halvings)
}

/// Computes the average fee rate, in sat/vB, paid by the transactions of `block`.
///
/// The rate is what the coinbase collected on top of the subsidy divided by the virtual size of
/// all non-coinbase transactions. A block with only a coinbase yields zero.
pub fn calc_block_avg_fee_rate(
    block: &GetBlockVerboseTxResult,
    chain: &BtcChain,
) -> Result<u64, FeeError> {
    let Some(coinbase) = block.tx.first() else {
        return Err(FeeError::NoTransactions);
    };
    if block.tx.len() == 1 {
        return Ok(0);
    }

    if block.weight < WITNESS_SCALE_FACTOR {
        return Err(FeeError::WeightTooSmall(block.weight));
    }
    if block.weight < coinbase.weight {
        return Err(FeeError::WeightBelowCoinbase {
            block: block.weight,
            coinbase: coinbase.weight,
        });
    }
    if block.height <= 0 || block.height > i64::from(i32::MAX) {
        return Err(FeeError::InvalidHeight(block.height));
    }

    let coinbase_tx: Transaction = hex::decode(&coinbase.hex)
        .ok()
        .and_then(|bytes| consensus::deserialize(&bytes).ok())
        .ok_or_else(|| FeeError::CoinbaseDecode(coinbase.txid.to_string()))?;
    if !coinbase_tx.is_coinbase() {
        return Err(FeeError::NotCoinbase(coinbase.txid.to_string()));
    }

    let earned: Amount = coinbase_tx
        .output
        .iter()
        .map(|out| out.value)
        .filter(|value| *value > Amount::ZERO)
        .sum();
    let subsidy = block_subsidy(block.height as u64, chain);
    if earned < subsidy {
        return Err(FeeError::BelowSubsidy { earned, subsidy });
    }
    let fees = earned - subsidy;

    let weight: u64 = block.tx.iter().skip(1).map(|tx| tx.weight).sum();
    let vbytes = weight / WITNESS_SCALE_FACTOR;
    if vbytes == 0 {
        return Err(FeeError::ZeroVirtualSize);
    }

    Ok(fees.to_sat() / vbytes)
}

/// Computes the fee deducted from deposits found in `block`.
///
/// Regtest and mainnet blocks below the activation height use the default rate. Otherwise the
/// block's average fee rate, scaled by the gas price multiplier, is used; if that cannot be
/// computed the default applies.
pub fn calc_depositor_fee(
    block: &GetBlockVerboseTxResult,
    chain: &BtcChain,
    cfg: &FeeConfig,
) -> Amount {
    if chain.is_regtest() {
        return cfg.default_depositor_fee();
    }
    if chain.is_mainnet() && block.height < cfg.dynamic_depositor_fee_height as i64 {
        return cfg.default_depositor_fee();
    }

    match calc_block_avg_fee_rate(block, chain) {
        Ok(rate) => {
            let rate = (rate as f64 * cfg.gas_price_multiplier) as u64;
            cfg.depositor_fee(rate)
        }
        Err(err) => {
            warn!(height = block.height, %err, "cannot compute block fee rate, using default depositor fee");
            cfg.default_depositor_fee()
        }
    }
}

/// Number of confirmations an outbound of `amount` needs before it is voted.
///
/// Big amounts need at least [`BIG_VALUE_CONFIRMATION_COUNT`] confirmations; the result is never
/// below `configured`.
pub fn confirmations_threshold(amount: Amount, configured: u64) -> u64 {
    if amount >= BIG_VALUE_SATS {
        configured.max(BIG_VALUE_CONFIRMATION_COUNT)
    } else {
        configured
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{
        absolute::LockTime, transaction::Version, Network, OutPoint, ScriptBuf, Sequence, TxIn,
        TxOut, Txid, Witness,
    };
    use proptest::prelude::*;

    use super::*;
    use crate::rpc_types::TxRawResult;

    fn coinbase_hex(outputs: &[u64]) -> String {
        let tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(vec![0x03, 0xa0, 0xa4, 0x0c]),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: outputs
                .iter()
                .map(|sats| TxOut {
                    value: Amount::from_sat(*sats),
                    script_pubkey: ScriptBuf::new(),
                })
                .collect(),
        };

        hex::encode(consensus::serialize(&tx))
    }

    fn raw_tx(hex: String, weight: u64) -> TxRawResult {
        TxRawResult {
            hex,
            txid: Txid::from_str("259fc21e63e138136c8f19270a0f7ca10039a66a474f91d23a17896f46e677a7")
                .expect("valid txid"),
            weight,
            ..Default::default()
        }
    }

    fn block(height: i64, coinbase_outputs: &[u64], weights: &[u64]) -> GetBlockVerboseTxResult {
        let mut tx = vec![raw_tx(coinbase_hex(coinbase_outputs), 800)];
        tx.extend(weights.iter().map(|w| raw_tx(String::new(), *w)));

        GetBlockVerboseTxResult {
            height,
            weight: 800 + weights.iter().sum::<u64>(),
            tx,
            ..Default::default()
        }
    }

    fn p2wpkh() -> Address {
        Address::from_str("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
            .expect("valid address")
            .require_network(Network::Bitcoin)
            .expect("mainnet address")
    }

    fn p2tr() -> Address {
        Address::from_str("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0")
            .expect("valid address")
            .require_network(Network::Bitcoin)
            .expect("mainnet address")
    }

    #[test]
    fn test_estimate_outbound_size() {
        let cfg = FeeConfig::default();

        assert_eq!(estimate_outbound_size(0, &[p2wpkh()], &cfg), Ok(0));
        assert_eq!(
            estimate_outbound_size(2, &[p2wpkh()], &cfg),
            Ok(cfg.outbound_bytes_min),
            "two inputs paying P2WPKH must be the lower size bound"
        );
        assert_eq!(
            estimate_outbound_size(21, &[p2tr()], &cfg),
            Ok(cfg.outbound_bytes_max),
            "21 inputs paying P2TR must be the upper size bound"
        );
    }

    #[test]
    fn test_depositor_and_withdrawer_sizes() {
        let cfg = FeeConfig::default();

        assert_eq!(cfg.depositor_tx_vsize(), 68);
        assert_eq!(outbound_size_withdrawer(&cfg), 177);
    }

    #[test]
    fn test_fee_rate_conversion() {
        assert_eq!(fee_rate_to_sat_per_vbyte(0.00001), 1);
        assert_eq!(fee_rate_to_sat_per_vbyte(0.0002), 20);
        assert_eq!(fee_rate_to_sat_per_vbyte(0.0), 0);
    }

    #[test]
    fn test_block_subsidy() {
        let mainnet = BtcChain::mainnet();
        assert_eq!(block_subsidy(0, &mainnet), Amount::from_btc(50.0).expect("valid"));
        assert_eq!(
            block_subsidy(840_000, &mainnet),
            Amount::from_sat(312_500_000)
        );
        assert_eq!(block_subsidy(150, &BtcChain::regtest()), Amount::from_sat(2_500_000_000));
        assert_eq!(block_subsidy(64 * 210_000, &mainnet), Amount::ZERO);
    }

    #[test]
    fn test_calc_block_avg_fee_rate() {
        let chain = BtcChain::mainnet();
        let subsidy = block_subsidy(840_000, &chain).to_sat();

        // 1000 vB of transactions paying 25_000 sats
        let blk = block(840_000, &[subsidy + 20_000, 5_000, 0], &[2000, 2000]);
        assert_eq!(calc_block_avg_fee_rate(&blk, &chain), Ok(25));

        let coinbase_only = block(840_000, &[subsidy], &[]);
        assert_eq!(calc_block_avg_fee_rate(&coinbase_only, &chain), Ok(0));
    }

    #[test]
    fn test_calc_block_avg_fee_rate_errors() {
        let chain = BtcChain::mainnet();
        let subsidy = block_subsidy(840_000, &chain).to_sat();

        let empty = GetBlockVerboseTxResult::default();
        assert_eq!(
            calc_block_avg_fee_rate(&empty, &chain),
            Err(FeeError::NoTransactions)
        );

        let mut light = block(840_000, &[subsidy], &[400]);
        light.weight = 3;
        assert_eq!(
            calc_block_avg_fee_rate(&light, &chain),
            Err(FeeError::WeightTooSmall(3))
        );

        let mut below_coinbase = block(840_000, &[subsidy], &[400]);
        below_coinbase.weight = 700;
        assert!(matches!(
            calc_block_avg_fee_rate(&below_coinbase, &chain),
            Err(FeeError::WeightBelowCoinbase { .. })
        ));

        let bad_height = block(0, &[subsidy], &[400]);
        assert_eq!(
            calc_block_avg_fee_rate(&bad_height, &chain),
            Err(FeeError::InvalidHeight(0))
        );

        let mut not_hex = block(840_000, &[subsidy], &[400]);
        not_hex.tx[0].hex = "zz".to_string();
        assert!(matches!(
            calc_block_avg_fee_rate(&not_hex, &chain),
            Err(FeeError::CoinbaseDecode(_))
        ));

        let underpaid = block(840_000, &[subsidy - 1], &[400]);
        assert!(
            matches!(
                calc_block_avg_fee_rate(&underpaid, &chain),
                Err(FeeError::BelowSubsidy { .. })
            ),
            "coinbase paying less than the subsidy must be rejected"
        );

        let weightless = block(840_000, &[subsidy], &[0, 3]);
        assert_eq!(
            calc_block_avg_fee_rate(&weightless, &chain),
            Err(FeeError::ZeroVirtualSize)
        );
    }

    #[test]
    fn test_not_coinbase_rejected() {
        let chain = BtcChain::mainnet();
        let mut blk = block(840_000, &[1], &[400]);

        let spend = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: blk.tx[0].txid,
                    vout: 0,
                },
                ..Default::default()
            }],
            output: vec![TxOut {
                value: Amount::from_sat(1000),
                script_pubkey: ScriptBuf::new(),
            }],
        };
        blk.tx[0].hex = hex::encode(consensus::serialize(&spend));

        assert!(matches!(
            calc_block_avg_fee_rate(&blk, &chain),
            Err(FeeError::NotCoinbase(_))
        ));
    }

    #[test]
    fn test_calc_depositor_fee() {
        let cfg = FeeConfig::default();
        let default_fee = cfg.default_depositor_fee();

        let mainnet = BtcChain::mainnet();
        let subsidy = block_subsidy(840_000, &mainnet).to_sat();
        let blk = block(840_000, &[subsidy + 25_000], &[2000, 2000]);
        assert_eq!(
            calc_depositor_fee(&blk, &mainnet, &cfg),
            Amount::from_sat(50 * 68),
            "dynamic fee must be the block rate times the multiplier"
        );

        let old = block(834_499, &[subsidy + 25_000], &[2000, 2000]);
        assert_eq!(calc_depositor_fee(&old, &mainnet, &cfg), default_fee);
        assert_eq!(
            calc_depositor_fee(&blk, &BtcChain::regtest(), &cfg),
            default_fee
        );

        let broken = block(840_000, &[subsidy - 1], &[2000]);
        assert_eq!(
            calc_depositor_fee(&broken, &mainnet, &cfg),
            default_fee,
            "must fall back to the default fee"
        );
    }

    #[test]
    fn test_confirmations_threshold() {
        assert_eq!(confirmations_threshold(Amount::from_sat(1000), 2), 2);
        assert_eq!(confirmations_threshold(BIG_VALUE_SATS, 2), 6);
        assert_eq!(
            confirmations_threshold(BIG_VALUE_SATS, 10),
            10,
            "big values must never require fewer confirmations than configured"
        );
    }

    proptest! {
        #[test]
        fn confirmations_threshold_is_monotonic(
            small in 0u64..BIG_VALUE_SATS.to_sat(),
            big in BIG_VALUE_SATS.to_sat()..21_000_000 * 100_000_000,
            configured in 0u64..20,
        ) {
            prop_assert!(
                confirmations_threshold(Amount::from_sat(big), configured)
                    >= confirmations_threshold(Amount::from_sat(small), configured)
            );
        }

        #[test]
        fn estimate_grows_with_inputs(n in 1u64..200) {
            let cfg = FeeConfig::default();
            let payees = [p2wpkh()];
            prop_assert!(
                estimate_outbound_size(n + 1, &payees, &cfg).expect("must estimate")
                    > estimate_outbound_size(n, &payees, &cfg).expect("must estimate")
            );
        }
    }
}
