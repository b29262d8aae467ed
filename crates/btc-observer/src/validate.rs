//! Structural validation of outbound transactions paid by the TSS.

use bitcoin::{OutPoint, Txid};
use zeta_btc_primitives::{
    nonce::nonce_mark_amount,
    rpc_types::{GetTransactionResult, TxRawResult, Vin, Vout},
    scripts::{decode_btc_address, decode_tss_vout},
};
use zetacore_client::types::{CrossChainTx, OutboundParams};

use crate::{
    compliance::is_cctx_restricted,
    errors::{ObserverError, ValidationError},
    observer::BtcObserver,
};

impl BtcObserver {
    /// Fetches the verbose form of the transaction described by `result`.
    ///
    /// Mempool transactions come from `getrawtransaction`; mined ones are read from their block at
    /// the reported index.
    pub async fn get_raw_tx_result(
        &self,
        txid: Txid,
        result: &GetTransactionResult,
    ) -> Result<TxRawResult, ObserverError> {
        if result.confirmations == 0 {
            return Ok(self.rpc().get_raw_transaction_verbose(txid).await?);
        }
        if result.confirmations < 0 {
            return Err(ValidationError::NegativeConfirmations {
                txid,
                confirmations: result.confirmations,
            }
            .into());
        }

        let hash = result.blockhash.ok_or(ValidationError::MissingField {
            txid,
            field: "block hash",
        })?;
        let index = result.blockindex.ok_or(ValidationError::MissingField {
            txid,
            field: "block index",
        })?;

        let block = self.rpc().get_block_verbose_tx(hash).await?;
        let count = block.tx.len();
        let tx = usize::try_from(index)
            .ok()
            .and_then(|i| block.tx.into_iter().nth(i))
            .ok_or(ValidationError::BlockIndexOutOfRange { hash, index, count })?;

        if tx.txid != txid {
            return Err(ValidationError::BlockTxMismatch {
                hash,
                index,
                expected: txid,
                actual: tx.txid,
            }
            .into());
        }

        Ok(tx)
    }

    /// Checks that `txid` is shaped like the outbound `cctx` asks for.
    pub async fn check_tss_outbound_result(
        &self,
        cctx: &CrossChainTx,
        txid: Txid,
        result: &GetTransactionResult,
    ) -> Result<(), ObserverError> {
        let params = cctx
            .current_outbound_params()
            .ok_or_else(|| ValidationError::MissingOutboundParams(cctx.index.clone()))?;

        let raw = self.get_raw_tx_result(txid, result).await?;
        self.check_tss_vin(&raw.vin, params.tss_nonce).await?;

        if is_cctx_restricted(self.compliance(), cctx) {
            self.check_tss_vout_cancelled(params, &raw.vout)?;
        } else {
            self.check_tss_vout(params, &raw.vout)?;
        }

        Ok(())
    }

    /// Inputs are `[nonce-mark, utxo, ...]`, all signed by the TSS key.
    ///
    /// Nonce 0 has no previous nonce-mark to spend.
    pub async fn check_tss_vin(&self, vins: &[Vin], nonce: u64) -> Result<(), ObserverError> {
        if nonce > 0 && vins.len() <= 1 {
            return Err(ValidationError::TooFewInputs {
                nonce,
                count: vins.len(),
            }
            .into());
        }

        for (index, vin) in vins.iter().enumerate() {
            let witness = vin.witness();
            if witness.len() != 2 {
                return Err(ValidationError::WitnessCount {
                    index,
                    count: witness.len(),
                }
                .into());
            }
            if witness[1] != self.tss_pubkey_hex() {
                return Err(ValidationError::WitnessPubkey {
                    index,
                    expected: self.tss_pubkey_hex().to_string(),
                    actual: witness[1].clone(),
                }
                .into());
            }

            if nonce > 0 && index == 0 {
                let prev_txid = self.get_outbound_txid_by_nonce(nonce - 1).await?;
                let expected = OutPoint::new(prev_txid, 0);
                if vin.outpoint() != Some(expected) {
                    return Err(ValidationError::NonceMarkInput {
                        expected,
                        actual: vin.outpoint(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Outputs are `[nonce-mark, payment, change (optional)]`.
    pub fn check_tss_vout(
        &self,
        params: &OutboundParams,
        vouts: &[Vout],
    ) -> Result<(), ValidationError> {
        if vouts.len() != 2 && vouts.len() != 3 {
            return Err(ValidationError::OutputCount(vouts.len()));
        }

        let network = self.chain().network();
        let receiver = decode_btc_address(&params.receiver, network)?;

        for vout in vouts {
            let expected = if vout.n == 1 {
                &receiver
            } else {
                self.tss_address()
            };
            let (actual, amount) = decode_tss_vout(vout, expected, network)?;
            if &actual != expected {
                return Err(ValidationError::AddressMismatch {
                    index: vout.n,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }

            let expected_amount = match vout.n {
                0 => nonce_mark_amount(params.tss_nonce),
                1 => params.amount(),
                _ => continue,
            };
            if amount != expected_amount {
                return Err(ValidationError::AmountMismatch {
                    index: vout.n,
                    expected: expected_amount,
                    actual: amount,
                });
            }
        }

        Ok(())
    }

    /// Outputs of a cancelled outbound are `[nonce-mark, change (optional)]`.
    pub fn check_tss_vout_cancelled(
        &self,
        params: &OutboundParams,
        vouts: &[Vout],
    ) -> Result<(), ValidationError> {
        if vouts.len() != 1 && vouts.len() != 2 {
            return Err(ValidationError::OutputCount(vouts.len()));
        }

        let tss_address = self.tss_address();
        for vout in vouts {
            let (actual, amount) = decode_tss_vout(vout, tss_address, self.chain().network())?;
            if &actual != tss_address {
                return Err(ValidationError::AddressMismatch {
                    index: vout.n,
                    expected: tss_address.to_string(),
                    actual: actual.to_string(),
                });
            }

            let expected_amount = nonce_mark_amount(params.tss_nonce);
            if vout.n == 0 && amount != expected_amount {
                return Err(ValidationError::AmountMismatch {
                    index: vout.n,
                    expected: expected_amount,
                    actual: amount,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::Network;
    use zeta_btc_primitives::rpc_types::GetBlockVerboseTxResult;
    use zeta_btc_test_utils::prelude::*;

    use super::*;
    use crate::fixtures::Harness;

    fn outbound_params(nonce: u64, receiver: &str, sats: u64) -> OutboundParams {
        OutboundParams {
            receiver: receiver.to_string(),
            amount: sats,
            tss_nonce: nonce,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_check_tss_vout() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let tss = observer.tss_address().clone();
        let receiver = generate_p2wpkh_address(Network::Regtest);
        let params = outbound_params(7, &receiver.to_string(), 50_000);

        let valid = vec![
            p2wpkh_vout(0, &tss, 2_007),
            p2wpkh_vout(1, &receiver, 50_000),
            p2wpkh_vout(2, &tss, 10_000),
        ];
        assert!(observer.check_tss_vout(&params, &valid).is_ok());
        assert!(
            observer.check_tss_vout(&params, &valid[..2]).is_ok(),
            "change output must be optional"
        );

        assert!(matches!(
            observer.check_tss_vout(&params, &valid[..1]),
            Err(ValidationError::OutputCount(1))
        ));

        let wrong_mark = vec![p2wpkh_vout(0, &tss, 2_006), valid[1].clone()];
        assert!(matches!(
            observer.check_tss_vout(&params, &wrong_mark),
            Err(ValidationError::AmountMismatch { index: 0, .. })
        ));

        let wrong_amount = vec![valid[0].clone(), p2wpkh_vout(1, &receiver, 49_999)];
        assert!(matches!(
            observer.check_tss_vout(&params, &wrong_amount),
            Err(ValidationError::AmountMismatch { index: 1, .. })
        ));

        let stranger = generate_p2wpkh_address(Network::Regtest);
        let wrong_change = vec![
            valid[0].clone(),
            valid[1].clone(),
            p2wpkh_vout(2, &stranger, 10_000),
        ];
        assert!(matches!(
            observer.check_tss_vout(&params, &wrong_change),
            Err(ValidationError::AddressMismatch { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_check_tss_vout_cancelled() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let tss = observer.tss_address().clone();
        let params = outbound_params(3, "bcrt1qrestricted", 0);

        assert!(observer
            .check_tss_vout_cancelled(&params, &[p2wpkh_vout(0, &tss, 2_003)])
            .is_ok());
        assert!(observer
            .check_tss_vout_cancelled(
                &params,
                &[p2wpkh_vout(0, &tss, 2_003), p2wpkh_vout(1, &tss, 70_000)]
            )
            .is_ok());

        let payment = generate_p2wpkh_address(Network::Regtest);
        assert!(matches!(
            observer.check_tss_vout_cancelled(
                &params,
                &[p2wpkh_vout(0, &tss, 2_003), p2wpkh_vout(1, &payment, 70_000)]
            ),
            Err(ValidationError::AddressMismatch { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_check_tss_vin() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let prev_txid = generate_txid();
        observer
            .state()
            .set_included_tx(4, generate_tx_result(prev_txid, 2))
            .await
            .expect("must include previous outbound");

        let witness = harness.tss_witness();
        let vins = vec![
            p2wpkh_vin(prev_txid, 0, witness.clone()),
            p2wpkh_vin(generate_txid(), 1, witness.clone()),
        ];
        assert!(observer.check_tss_vin(&vins, 5).await.is_ok());

        assert!(matches!(
            observer.check_tss_vin(&vins[..1], 5).await,
            Err(ObserverError::Validation(ValidationError::TooFewInputs { .. }))
        ));

        let wrong_mark = vec![
            p2wpkh_vin(prev_txid, 1, witness.clone()),
            vins[1].clone(),
        ];
        assert!(matches!(
            observer.check_tss_vin(&wrong_mark, 5).await,
            Err(ObserverError::Validation(ValidationError::NonceMarkInput { .. }))
        ));

        let foreign = vec![
            vins[0].clone(),
            p2wpkh_vin(generate_txid(), 0, vec!["30".to_string(), "02ab".to_string()]),
        ];
        assert!(matches!(
            observer.check_tss_vin(&foreign, 5).await,
            Err(ObserverError::Validation(ValidationError::WitnessPubkey { index: 1, .. }))
        ));

        let single = vec![p2wpkh_vin(generate_txid(), 3, witness)];
        assert!(
            observer.check_tss_vin(&single, 0).await.is_ok(),
            "nonce 0 must not need a nonce-mark"
        );
    }

    #[tokio::test]
    async fn test_get_raw_tx_result() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let txid = generate_txid();

        let mempool = generate_tx_result(txid, 0);
        harness
            .rpc
            .node()
            .verbose_txs
            .insert(txid, raw_tx(txid, vec![], vec![]));
        assert!(observer
            .get_raw_tx_result(txid, &mempool)
            .await
            .is_ok_and(|tx| tx.txid == txid));

        let mut mined = generate_tx_result(txid, 2);
        let hash = mined.blockhash.expect("mined result must have a block hash");
        harness.rpc.node().blocks.insert(
            hash,
            GetBlockVerboseTxResult {
                hash,
                tx: vec![coinbase_tx(generate_txid()), raw_tx(txid, vec![], vec![])],
                ..Default::default()
            },
        );
        assert!(observer
            .get_raw_tx_result(txid, &mined)
            .await
            .is_ok_and(|tx| tx.txid == txid));

        mined.blockindex = Some(2);
        assert!(matches!(
            observer.get_raw_tx_result(txid, &mined).await,
            Err(ObserverError::Validation(
                ValidationError::BlockIndexOutOfRange { count: 2, .. }
            ))
        ));

        let orphan = generate_tx_result(txid, -1);
        assert!(matches!(
            observer.get_raw_tx_result(txid, &orphan).await,
            Err(ObserverError::Validation(
                ValidationError::NegativeConfirmations { .. }
            ))
        ));
    }
}
