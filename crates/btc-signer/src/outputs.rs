//! Outputs of a withdrawal.

use bitcoin::{Address, Amount, Transaction, TxOut};
use tracing::info;
use zeta_btc_primitives::scripts::pay_to_address_script;

use crate::errors::SignerError;

/// What the outputs of a withdrawal must pay.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawOutputs<'a> {
    /// The TSS address, receiving the nonce-mark and the change.
    pub tss: &'a Address,

    /// The receiver of the withdrawal.
    pub to: &'a Address,

    /// Sum of the selected inputs.
    pub total: Amount,

    /// The amount paid to the receiver.
    pub amount: Amount,

    /// The nonce-mark of the withdrawal.
    pub nonce_mark: Amount,

    /// The fee left to miners.
    pub fees: Amount,

    /// Whether the payment is cancelled and its amount kept by the TSS.
    pub cancelled: bool,
}

fn sats(amount: Amount) -> i64 {
    i64::try_from(amount.to_sat()).unwrap_or(i64::MAX)
}

/// Appends the outputs of a withdrawal to `tx`: the nonce-mark to the TSS, the payment to the
/// receiver unless cancelled, then the change to the TSS if there is any.
///
/// A change equal to the nonce-mark is lowered by one satoshi so that the withdrawal never creates
/// two outputs that look like its nonce-mark.
pub fn add_withdraw_tx_outputs(
    tx: &mut Transaction,
    outputs: &WithdrawOutputs<'_>,
) -> Result<(), SignerError> {
    let mut remaining = sats(outputs.total)
        .saturating_sub(sats(outputs.amount))
        .saturating_sub(sats(outputs.fees))
        .saturating_sub(sats(outputs.nonce_mark));
    if remaining < 0 {
        return Err(SignerError::NegativeRemainder(remaining));
    }
    if remaining == sats(outputs.nonce_mark) {
        info!(%remaining, "adjusting change to avoid a duplicate nonce-mark");
        remaining -= 1;
    }

    let tss_script = pay_to_address_script(outputs.tss);
    tx.output.push(TxOut {
        value: outputs.nonce_mark,
        script_pubkey: tss_script.clone(),
    });

    if outputs.cancelled {
        remaining = remaining.saturating_add(sats(outputs.amount));
    } else {
        tx.output.push(TxOut {
            value: outputs.amount,
            script_pubkey: pay_to_address_script(outputs.to),
        });
    }

    if remaining > 0 {
        tx.output.push(TxOut {
            value: Amount::from_sat(remaining as u64),
            script_pubkey: tss_script,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{absolute::LockTime, transaction::Version, Network};
    use zeta_btc_test_utils::prelude::*;

    use super::*;

    fn empty_tx() -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![],
        }
    }

    fn receiver() -> Address {
        Address::from_str("bc1qaxf82vyzy8y80v000e7t64gpten7gawewzu42y")
            .expect("must parse")
            .require_network(Network::Bitcoin)
            .expect("must be a mainnet address")
    }

    fn values(tx: &Transaction) -> Vec<(u64, bool)> {
        let tss_script = tx.output[0].script_pubkey.clone();
        tx.output
            .iter()
            .map(|out| (out.value.to_sat(), out.script_pubkey == tss_script))
            .collect()
    }

    fn outputs<'a>(tss: &'a Address, to: &'a Address, total: u64) -> WithdrawOutputs<'a> {
        WithdrawOutputs {
            tss,
            to,
            total: Amount::from_sat(total),
            amount: Amount::from_sat(20_000_000),
            nonce_mark: Amount::from_sat(10_000),
            fees: Amount::from_sat(2_000),
            cancelled: false,
        }
    }

    #[test]
    fn test_outputs_with_change() {
        let tss = generate_p2wpkh_address(Network::Bitcoin);
        let to = receiver();
        let mut tx = empty_tx();

        add_withdraw_tx_outputs(&mut tx, &outputs(&tss, &to, 100_012_000)).expect("must add outputs");

        assert_eq!(
            values(&tx),
            vec![(10_000, true), (20_000_000, false), (80_000_000, true)]
        );
        assert_eq!(tx.output[1].script_pubkey, to.script_pubkey());
    }

    #[test]
    fn test_outputs_without_change() {
        let tss = generate_p2wpkh_address(Network::Bitcoin);
        let to = receiver();
        let mut tx = empty_tx();

        add_withdraw_tx_outputs(&mut tx, &outputs(&tss, &to, 20_012_000)).expect("must add outputs");

        assert_eq!(values(&tx), vec![(10_000, true), (20_000_000, false)]);
    }

    #[test]
    fn test_cancelled_outputs_keep_amount() {
        let tss = generate_p2wpkh_address(Network::Bitcoin);
        let to = receiver();
        let mut tx = empty_tx();
        let cancelled = WithdrawOutputs {
            cancelled: true,
            ..outputs(&tss, &to, 100_012_000)
        };

        add_withdraw_tx_outputs(&mut tx, &cancelled).expect("must add outputs");

        assert_eq!(values(&tx), vec![(10_000, true), (100_000_000, true)]);
    }

    #[test]
    fn test_negative_remainder() {
        let tss = generate_p2wpkh_address(Network::Bitcoin);
        let to = receiver();

        let mut tx = empty_tx();
        assert!(matches!(
            add_withdraw_tx_outputs(&mut tx, &outputs(&tss, &to, 12_000)),
            Err(SignerError::NegativeRemainder(_))
        ));

        let mut tx = empty_tx();
        assert!(
            matches!(
                add_withdraw_tx_outputs(&mut tx, &outputs(&tss, &to, 20_011_000)),
                Err(SignerError::NegativeRemainder(-1_000))
            ),
            "fees and nonce-mark must be covered too"
        );
        assert!(tx.output.is_empty(), "no output must be added on error");
    }

    #[test]
    fn test_change_never_duplicates_nonce_mark() {
        let tss = generate_p2wpkh_address(Network::Bitcoin);
        let to = receiver();
        let mut tx = empty_tx();

        add_withdraw_tx_outputs(&mut tx, &outputs(&tss, &to, 20_022_000)).expect("must add outputs");

        assert_eq!(
            values(&tx),
            vec![(10_000, true), (20_000_000, false), (9_999, true)]
        );
    }
}
