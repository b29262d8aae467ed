//! Processing of one pending outbound: sign, broadcast and report.

use std::time::Duration;

use bitcoin::{Amount, Transaction, Txid};
use rand::Rng;
use tracing::{error, info, warn};
use zeta_btc_observer::compliance::is_cctx_restricted;
use zeta_btc_primitives::{
    fee::fee_rate_to_sat_per_vbyte, nonce::nonce_mark_amount, scripts::decode_btc_address,
    types::Utxo,
};
use zetacore_client::types::{CoinType, CrossChainTx};

use crate::{errors::SignerError, sign::WithdrawRequest, signer::BtcSigner};

impl BtcSigner {
    /// Signs and broadcasts the withdrawal of `cctx`, tagging the keysign with the consensus
    /// `height`.
    ///
    /// Returns the txid once broadcast, or `None` when outbounds are disabled. A withdrawal to or
    /// from a restricted address is cancelled: it still consumes its nonce but pays nothing.
    pub async fn try_process_outbound(
        &self,
        cctx: &CrossChainTx,
        height: u64,
    ) -> Result<Option<Txid>, SignerError> {
        let observer = self.observer();
        let params = cctx
            .current_outbound_params()
            .ok_or_else(|| SignerError::MissingOutboundParams(cctx.index.clone()))?;

        let coin_type = cctx.inbound_params.coin_type;
        if matches!(coin_type, CoinType::Zeta | CoinType::Erc20) {
            return Err(SignerError::UnsupportedCoin(coin_type));
        }

        if !observer.context().flags().is_outbound_enabled {
            info!(index = %cctx.index, "outbound is disabled");
            return Ok(None);
        }

        let nonce = params.tss_nonce;
        let gas_price = params
            .gas_price()
            .ok_or_else(|| SignerError::InvalidGasPrice(params.gas_price.clone()))?;
        let to = decode_btc_address(&params.receiver, observer.chain().network())?;

        let network_info = observer.rpc().get_network_info().await?;
        let relay_fee_rate = fee_rate_to_sat_per_vbyte(network_info.relayfee);
        let gas_price = gas_price
            .checked_add(relay_fee_rate)
            .ok_or_else(|| SignerError::InvalidGasPrice(params.gas_price.clone()))?;

        let cancelled = is_cctx_restricted(observer.compliance(), cctx);
        let amount = if cancelled {
            warn!(
                target: "compliance",
                chain_id = %observer.chain_id(),
                index = %cctx.index,
                sender = %cctx.inbound_params.sender,
                receiver = %params.receiver,
                "restricted address detected in outbound, cancelling"
            );
            Amount::ZERO
        } else {
            params.amount()
        };

        info!(index = %cctx.index, %nonce, %to, amount = params.amount, %gas_price, "signing bitcoin outbound");
        let tx = self
            .sign_withdraw_tx(&WithdrawRequest {
                to,
                amount,
                gas_price,
                size_limit: params.gas_limit,
                height,
                nonce,
                cancelled,
            })
            .await?;
        let txid = tx.compute_txid();
        info!(%nonce, %txid, "keysign succeeded");

        if let Err(err) = observer.zetacore().get_observer_list().await {
            warn!(%nonce, %err, "unable to get observer list");
        }

        self.broadcast(&tx, nonce).await?;

        match observer
            .zetacore()
            .add_outbound_tracker(observer.chain_id(), nonce, txid.to_string())
            .await
        {
            Ok(zeta_tx_hash) => info!(%nonce, %txid, %zeta_tx_hash, "added outbound tracker"),
            Err(err) => error!(%nonce, %txid, %err, "unable to add outbound tracker"),
        }

        observer.save_broadcasted_tx(nonce, txid).await?;

        let tss = observer.tss_address();
        observer
            .state()
            .add_utxo(Utxo {
                txid,
                vout: 0,
                address: tss.to_string(),
                amount: nonce_mark_amount(nonce),
                confirmations: 0,
                script_pub_key: tss.script_pubkey(),
            })
            .await?;

        Ok(Some(txid))
    }

    fn broadcast_jitter(&self) -> Duration {
        let max = self.config().max_broadcast_jitter_ms;
        Duration::from_millis(rand::thread_rng().gen_range(0..=max))
    }

    /// Sends `tx` to the node, retrying after a random delay until the configured number of
    /// attempts is exhausted.
    async fn broadcast(&self, tx: &Transaction, nonce: u64) -> Result<(), SignerError> {
        let attempts = self.config().broadcast_attempts.max(1);
        let mut attempt = 1;

        loop {
            tokio::time::sleep(self.broadcast_jitter()).await;

            match self.observer().rpc().send_raw_transaction(tx.clone()).await {
                Ok(txid) => {
                    info!(%nonce, %txid, %attempt, "broadcast bitcoin outbound");
                    return Ok(());
                }
                Err(err) if attempt < attempts => {
                    warn!(%nonce, txid = %tx.compute_txid(), %attempt, %err, "broadcast failed, retrying");
                    attempt += 1;
                }
                Err(source) => {
                    return Err(SignerError::BroadcastFailed {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }
}
