//! Tracking of outbounds paid by the TSS.

use std::str::FromStr;

use bitcoin::Txid;
use tracing::{debug, error, info, warn};
use zeta_btc_primitives::{fee::confirmations_threshold, rpc_types::GetTransactionResult};
use zeta_btc_state::IncludeOutcome;
use zetacore_client::types::{CoinType, CrossChainTx, MsgVoteOutbound, ReceiveStatus};

use crate::{
    compliance::is_cctx_restricted,
    errors::{ObserverError, ValidationError},
    observer::BtcObserver,
};

/// Where an outbound stands, as seen by this observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundStatus {
    /// A transaction for the outbound is known, in the mempool or mined.
    pub included: bool,

    /// The outbound is buried deep enough and its vote was posted.
    pub confirmed: bool,
}

impl OutboundStatus {
    const UNKNOWN: Self = Self {
        included: false,
        confirmed: false,
    };

    const PENDING: Self = Self {
        included: true,
        confirmed: false,
    };

    const CONFIRMED: Self = Self {
        included: true,
        confirmed: true,
    };

    /// Returns whether a new keysign may be started for the outbound.
    pub fn needs_keysign(&self) -> bool {
        !self.included && !self.confirmed
    }
}

impl BtcObserver {
    /// Walks the outbound trackers by ascending nonce and records which candidate hash actually
    /// paid each outbound.
    ///
    /// Stops at the first nonce whose cctx cannot be fetched or does not match the tracker.
    pub async fn observe_outbound(&self) -> Result<(), ObserverError> {
        let mut trackers = self.zetacore().get_outbound_trackers(self.chain_id()).await?;
        trackers.sort_by_key(|tracker| tracker.nonce);

        for tracker in trackers {
            let nonce = tracker.nonce;
            let cctx = match self.zetacore().get_cctx_by_nonce(self.chain_id(), nonce).await {
                Ok(cctx) => cctx,
                Err(err) => {
                    error!(%nonce, %err, "could not fetch cctx of outbound tracker");
                    break;
                }
            };

            let cctx_nonce = cctx.current_outbound_params().map(|params| params.tss_nonce);
            if cctx_nonce != Some(nonce) {
                error!(%nonce, ?cctx_nonce, index = %cctx.index, "tracker nonce does not match cctx");
                break;
            }

            if tracker.hash_list.len() > 1 {
                warn!(%nonce, count = tracker.hash_list.len(), "multiple outbound hashes reported");
            }

            let mut included = Vec::new();
            for entry in &tracker.hash_list {
                let txid = match Txid::from_str(&entry.tx_hash) {
                    Ok(txid) => txid,
                    Err(err) => {
                        warn!(%nonce, tx_hash = %entry.tx_hash, %err, "malformed outbound hash");
                        continue;
                    }
                };

                if let Some(result) = self.check_included_tx(&cctx, txid).await {
                    included.push(result);
                }
            }

            match included.len() {
                0 => {}
                1 => {
                    if let Some(result) = included.pop() {
                        self.set_included_tx(nonce, result).await?;
                    }
                }
                count => {
                    error!(%nonce, %count, "duplicate payment: more than one outbound included for nonce, purging");
                    self.remove_included_tx(nonce).await?;
                }
            }
        }

        Ok(())
    }

    /// Returns the `gettransaction` result of `txid` if it is a valid outbound for `cctx`, in the
    /// mempool or mined.
    pub async fn check_included_tx(
        &self,
        cctx: &CrossChainTx,
        txid: Txid,
    ) -> Option<GetTransactionResult> {
        let result = match self.rpc().get_transaction(txid).await {
            Ok(result) => result,
            Err(err) => {
                debug!(%txid, %err, "outbound not known to the node");
                return None;
            }
        };

        if result.txid != txid {
            let err = ValidationError::TxidMismatch {
                expected: txid,
                actual: result.txid,
            };
            error!(%err, "node returned another transaction");
            return None;
        }

        if result.confirmations < 0 {
            debug!(%txid, confirmations = result.confirmations, "outbound not included yet");
            return None;
        }

        if let Err(err) = self.check_tss_outbound_result(cctx, txid, &result).await {
            error!(%txid, index = %cctx.index, %err, "outbound failed validation");
            return None;
        }

        Some(result)
    }

    /// Records `result` as the transaction paying outbound `nonce`, in memory and in the store.
    ///
    /// A failed write to the store is logged; the in-memory record stands.
    pub async fn set_included_tx(
        &self,
        nonce: u64,
        result: GetTransactionResult,
    ) -> Result<IncludeOutcome, ObserverError> {
        let key = self.outbound_key(nonce);
        let txid = result.txid;
        let outcome = self.state().set_included_tx(nonce, result.clone()).await?;

        match &outcome {
            IncludeOutcome::New => {
                if let Err(err) = self.db().save_included_tx(&key, &result).await {
                    error!(%nonce, %txid, %err, "could not persist included outbound");
                }
                let pending_nonce = self.state().pending_nonce().await?;
                info!(%nonce, %txid, %pending_nonce, "included new bitcoin outbound");
            }
            IncludeOutcome::Refreshed => {
                if let Err(err) = self.db().save_included_tx(&key, &result).await {
                    error!(%nonce, %txid, %err, "could not persist included outbound");
                }
                debug!(%nonce, %txid, confirmations = result.confirmations, "refreshed bitcoin outbound");
            }
            IncludeOutcome::Duplicate { existing } => {
                if let Err(err) = self.db().delete_included_tx(&key).await {
                    error!(%nonce, %err, "could not delete included outbound");
                }
                error!(%nonce, %txid, %existing, "duplicate payment: outbound already included with another hash");
            }
        }

        Ok(outcome)
    }

    /// Forgets the included transaction of outbound `nonce`, in memory and in the store.
    ///
    /// A failed delete in the store is logged.
    pub async fn remove_included_tx(&self, nonce: u64) -> Result<(), ObserverError> {
        self.state().remove_included_tx(nonce).await?;
        if let Err(err) = self.db().delete_included_tx(&self.outbound_key(nonce)).await {
            error!(%nonce, %err, "could not delete included outbound");
        }

        Ok(())
    }

    /// Remembers that `txid` was broadcast for outbound `nonce`, in memory and in the store.
    ///
    /// A failed write to the store is logged; the in-memory record stands.
    pub async fn save_broadcasted_tx(&self, nonce: u64, txid: Txid) -> Result<(), ObserverError> {
        self.state().save_broadcasted_tx(nonce, txid).await?;
        if let Err(err) = self
            .db()
            .save_broadcasted_tx(&self.outbound_key(nonce), txid)
            .await
        {
            error!(%nonce, %txid, %err, "could not persist broadcasted outbound");
        }
        debug!(%nonce, %txid, "saved broadcasted outbound");

        Ok(())
    }

    /// Returns the txid that paid outbound `nonce`.
    ///
    /// Trusts either a transaction this observer included itself or the hash finalized on the
    /// consensus chain, provided the node sees it mined.
    pub async fn get_outbound_txid_by_nonce(&self, nonce: u64) -> Result<Txid, ObserverError> {
        if let Some(result) = self.state().included_tx(nonce).await? {
            return Ok(result.txid);
        }

        let cctx = self.zetacore().get_cctx_by_nonce(self.chain_id(), nonce).await?;
        let hash = cctx
            .current_outbound_params()
            .map(|params| params.hash.as_str())
            .unwrap_or_default();
        if hash.is_empty() {
            return Err(ObserverError::OutboundTxidNotFound(nonce));
        }

        let txid = Txid::from_str(hash)
            .map_err(|err| ObserverError::InvalidData(format!("outbound hash {hash}: {err}")))?;
        let result = self.rpc().get_transaction(txid).await?;
        if result.confirmations <= 0 {
            return Err(ObserverError::OutboundNotIncluded { nonce, txid });
        }

        Ok(txid)
    }

    /// Raises the pending nonce to the lowest nonce the consensus chain still waits for.
    pub async fn refresh_pending_nonce(&self) -> Result<u64, ObserverError> {
        let nonces = self.zetacore().get_pending_nonces(self.chain_id()).await?;
        let nonce_low = u64::try_from(nonces.nonce_low).map_err(|_| {
            ObserverError::InvalidData(format!("negative pending nonce {}", nonces.nonce_low))
        })?;

        let before = self.state().pending_nonce().await?;
        let pending_nonce = self.state().raise_pending_nonce(nonce_low).await?;
        if pending_nonce > before {
            info!(%pending_nonce, "increased pending nonce");
        }

        Ok(pending_nonce)
    }

    /// Reports where the outbound of `cctx` stands and posts its vote once it is confirmed.
    ///
    /// A broadcast of nonce 0 is only ever waited on: there is no previous nonce-mark that would
    /// stop a second payment.
    pub async fn vote_outbound_if_confirmed(
        &self,
        cctx: &CrossChainTx,
    ) -> Result<OutboundStatus, ObserverError> {
        let params = cctx
            .current_outbound_params()
            .ok_or_else(|| ValidationError::MissingOutboundParams(cctx.index.clone()))?;
        let nonce = params.tss_nonce;

        let result = match self.state().included_tx(nonce).await? {
            Some(result) => result,
            None => {
                let Some(txid) = self.state().broadcasted_tx(nonce).await? else {
                    return Ok(OutboundStatus::UNKNOWN);
                };
                if nonce == 0 {
                    debug!(%txid, "waiting for inclusion of outbound nonce 0");
                    return Ok(OutboundStatus::PENDING);
                }

                let Some(result) = self.check_included_tx(cctx, txid).await else {
                    return Ok(OutboundStatus::UNKNOWN);
                };
                self.set_included_tx(nonce, result.clone()).await?;

                result
            }
        };

        if result.confirmations == 0 {
            debug!(%nonce, txid = %result.txid, "outbound still in mempool");
            return Ok(OutboundStatus::PENDING);
        }

        let required = confirmations_threshold(params.amount(), self.chain_params()?.confirmation_count);
        if (result.confirmations as u64) < required {
            debug!(%nonce, confirmations = result.confirmations, %required, "outbound not confirmed yet");
            return Ok(OutboundStatus::PENDING);
        }

        let status = if is_cctx_restricted(self.compliance(), cctx) {
            ReceiveStatus::Failed
        } else {
            ReceiveStatus::Success
        };

        let msg = MsgVoteOutbound {
            cctx_hash: cctx.index.clone(),
            outbound_hash: result.txid.to_string(),
            outbound_block_height: result.blockindex.unwrap_or_default().max(0) as u64,
            outbound_gas_used: 0,
            outbound_gas_price: 0,
            outbound_gas_limit: 0,
            value_received: params.amount,
            status,
            chain_id: self.chain_id(),
            outbound_tss_nonce: nonce,
            coin_type: CoinType::Gas,
        };

        match self.zetacore().post_vote_outbound(msg).await {
            Ok(response) if response.zeta_tx_hash.is_empty() => {
                debug!(%nonce, txid = %result.txid, "outbound vote already finalized");
            }
            Ok(response) => {
                info!(%nonce, txid = %result.txid, zeta_tx_hash = %response.zeta_tx_hash, ballot = %response.ballot, "posted outbound vote");
            }
            Err(err) => {
                error!(%nonce, txid = %result.txid, %err, "could not post outbound vote");
            }
        }

        Ok(OutboundStatus::CONFIRMED)
    }
}
