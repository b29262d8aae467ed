//! Building and signing of a withdrawal.

use bitcoin::{
    absolute::LockTime, ecdsa, hashes::Hash, sighash::SighashCache, transaction::Version, Address,
    Amount, EcdsaSighashType, ScriptBuf, Sequence, Transaction, TxIn, Witness,
};
use tracing::{error, info, warn};
use zeta_btc_params::constants::{CONSOLIDATION_RANK, MAX_INPUTS_PER_TX};
use zeta_btc_primitives::{
    fee::{estimate_outbound_size, outbound_size_withdrawer},
    nonce::nonce_mark_amount,
    types::Utxo,
};
use zeta_btc_state::{select_utxos, SelectionRequest};
use zeta_tss::to_ecdsa_signature;

use crate::{
    errors::SignerError,
    outputs::{add_withdraw_tx_outputs, WithdrawOutputs},
    signer::BtcSigner,
};

/// A withdrawal to build and sign.
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    /// The receiver.
    pub to: Address,

    /// The amount paid to the receiver. Zero for a cancelled withdrawal.
    pub amount: Amount,

    /// Fee rate, in sat/vB.
    pub gas_price: u64,

    /// Size the withdrawer paid fees for.
    pub size_limit: u64,

    /// Consensus-chain height the keysign is tagged with.
    pub height: u64,

    /// The outbound nonce.
    pub nonce: u64,

    /// Whether the payment is cancelled.
    pub cancelled: bool,
}

fn checked_fee(size: u64, gas_price: u64) -> Result<Amount, SignerError> {
    size.checked_mul(gas_price)
        .map(Amount::from_sat)
        .ok_or(SignerError::FeeOverflow { size, gas_price })
}

/// Computes the segwit v0 `SIGHASH_ALL` digest of every input of `tx`, which spends `utxos` in
/// order.
pub fn witness_sighashes(tx: &Transaction, utxos: &[Utxo]) -> Result<Vec<[u8; 32]>, SignerError> {
    let mut cache = SighashCache::new(tx);

    utxos
        .iter()
        .enumerate()
        .map(|(index, utxo)| {
            cache
                .p2wpkh_signature_hash(
                    index,
                    &utxo.script_pub_key,
                    utxo.amount,
                    EcdsaSighashType::All,
                )
                .map(|sighash| sighash.to_byte_array())
                .map_err(|err| SignerError::Sighash {
                    index,
                    reason: err.to_string(),
                })
        })
        .collect()
}

impl BtcSigner {
    /// Builds the withdrawal described by `request` and signs all of its inputs in one TSS
    /// ceremony.
    ///
    /// The inputs must cover the payment, the nonce-mark and a fee estimated at the maximum
    /// withdrawal size; the fee actually paid follows the estimated size of the built
    /// transaction.
    pub async fn sign_withdraw_tx(
        &self,
        request: &WithdrawRequest,
    ) -> Result<Transaction, SignerError> {
        let observer = self.observer();
        let fee_config = observer.fee_config();
        let nonce = request.nonce;
        let estimated_fee = checked_fee(fee_config.outbound_bytes_max, request.gas_price)?;
        let nonce_mark = nonce_mark_amount(nonce);

        if let Err(err) = observer.fetch_utxos().await {
            error!(%nonce, %err, "could not refresh utxos, selecting from the last known set");
        }

        let prev_txid = match nonce {
            0 => None,
            nonce => Some(observer.get_outbound_txid_by_nonce(nonce - 1).await?),
        };

        let needed = request
            .amount
            .checked_add(estimated_fee)
            .and_then(|amount| amount.checked_add(nonce_mark))
            .ok_or(SignerError::FeeOverflow {
                size: fee_config.outbound_bytes_max,
                gas_price: request.gas_price,
            })?;
        let utxos = observer.state().utxos().await?;
        let selection = select_utxos(
            &utxos,
            &SelectionRequest {
                amount: needed,
                max_inputs: MAX_INPUTS_PER_TX,
                nonce,
                consolidation_rank: CONSOLIDATION_RANK,
                prev_txid,
                tss_address: observer.tss_address().to_string(),
            },
        )?;

        let mut tx = Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: selection
                .utxos
                .iter()
                .map(|utxo| TxIn {
                    previous_output: utxo.outpoint(),
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: vec![],
        };

        let withdrawer_size = outbound_size_withdrawer(fee_config);
        if request.size_limit < withdrawer_size {
            info!(%nonce, size_limit = request.size_limit, %withdrawer_size, "size limit is below the withdrawer size");
        }

        let estimated_size = estimate_outbound_size(
            selection.utxos.len() as u64,
            std::slice::from_ref(&request.to),
            fee_config,
        )?;
        let size = estimated_size.clamp(fee_config.outbound_bytes_min, fee_config.outbound_bytes_max);
        if size != estimated_size {
            warn!(%nonce, %estimated_size, %size, "clamped withdrawal size");
        }

        let fees = checked_fee(size, request.gas_price)?;
        info!(
            %nonce,
            gas_price = request.gas_price,
            %size,
            fees = fees.to_sat(),
            consolidated = selection.consolidated_count,
            consolidated_value = selection.consolidated_value.to_sat(),
            "building bitcoin outbound"
        );

        add_withdraw_tx_outputs(
            &mut tx,
            &WithdrawOutputs {
                tss: observer.tss_address(),
                to: &request.to,
                total: selection.total,
                amount: request.amount,
                nonce_mark,
                fees,
                cancelled: request.cancelled,
            },
        )?;

        let digests = witness_sighashes(&tx, &selection.utxos)?;
        let expected = digests.len();
        let signatures = self
            .tss()
            .sign_batch(digests, request.height, nonce, observer.chain_id())
            .await?;
        if signatures.len() != expected {
            return Err(SignerError::SignatureCount {
                expected,
                actual: signatures.len(),
            });
        }

        let pubkey = self.tss().pubkey().serialize();
        for (input, signature) in tx.input.iter_mut().zip(&signatures) {
            let signature = ecdsa::Signature::sighash_all(to_ecdsa_signature(signature)?);
            input.witness = Witness::from_slice(&[signature.to_vec(), pubkey.to_vec()]);
        }

        Ok(tx)
    }
}
