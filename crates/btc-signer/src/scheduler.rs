//! Scheduling of keysigns for pending outbounds.

use std::sync::Arc;

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info};
use zeta_btc_primitives::types::OutboundKey;
use zetacore_client::types::CrossChainTx;

use crate::{errors::SignerError, signer::BtcSigner};

/// Releases the in-flight mark of an outbound when its keysign task ends, however it ends.
#[derive(Debug)]
struct InFlightGuard {
    signer: Arc<BtcSigner>,
    key: OutboundKey,
}

impl InFlightGuard {
    fn acquire(signer: &Arc<BtcSigner>, key: OutboundKey) -> Option<Self> {
        signer.start_processing(key.clone()).then(|| Self {
            signer: signer.clone(),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.signer.end_processing(&self.key);
    }
}

fn outbound_nonce(cctx: &CrossChainTx) -> u64 {
    cctx.current_outbound_params()
        .map(|params| params.tss_nonce)
        .unwrap_or(u64::MAX)
}

impl BtcSigner {
    /// Runs one scheduling round at consensus `zeta_height`.
    ///
    /// Pending cctxs are visited by ascending nonce, at most `outbound_schedule_lookahead` of them.
    /// Each one first gets its outbound vote if already confirmed; one that still needs a keysign
    /// is started on `tracker` when its nonce falls on this height's slot of the schedule interval
    /// and no keysign for it is running. Returns the number of keysigns started.
    pub async fn schedule_outbounds(
        self: &Arc<Self>,
        zeta_height: u64,
        tracker: &TaskTracker,
    ) -> Result<usize, SignerError> {
        let observer = self.observer();
        let chain_id = observer.chain_id();
        let params = observer.chain_params()?;
        let interval = params.outbound_schedule_interval.max(1);
        let lookahead = usize::try_from(params.outbound_schedule_lookahead).unwrap_or(usize::MAX);

        let mut cctxs = observer.zetacore().list_pending_cctx(chain_id).await?;
        cctxs.sort_by_key(outbound_nonce);

        let mut started = 0;
        for cctx in cctxs.into_iter().take(lookahead) {
            let outbound = cctx
                .current_outbound_params()
                .ok_or_else(|| SignerError::MissingOutboundParams(cctx.index.clone()))?;
            if outbound.receiver_chain_id != chain_id {
                return Err(SignerError::ChainMismatch {
                    index: cctx.index.clone(),
                    expected: chain_id,
                    actual: outbound.receiver_chain_id,
                });
            }
            let nonce = outbound.tss_nonce;

            let status = match observer.vote_outbound_if_confirmed(&cctx).await {
                Ok(status) => status,
                Err(err) => {
                    error!(%nonce, index = %cctx.index, %err, "could not check outbound status");
                    continue;
                }
            };
            if !status.needs_keysign() {
                debug!(%nonce, ?status, "outbound already included");
                continue;
            }

            if nonce % interval != zeta_height % interval {
                continue;
            }

            let Some(guard) = InFlightGuard::acquire(self, observer.outbound_key(nonce)) else {
                debug!(%nonce, "keysign already in flight");
                continue;
            };

            info!(%nonce, index = %cctx.index, %zeta_height, "scheduling keysign");
            let signer = self.clone();
            tracker.spawn(async move {
                let _guard = guard;
                match signer.try_process_outbound(&cctx, zeta_height).await {
                    Ok(Some(txid)) => info!(%nonce, %txid, "outbound processed"),
                    Ok(None) => debug!(%nonce, "outbound skipped"),
                    Err(err) => error!(%nonce, index = %cctx.index, %err, "could not process outbound"),
                }
            });
            started += 1;
        }

        Ok(started)
    }
}

/// Runs scheduling rounds until `cancel` fires. A round only runs when the consensus chain has
/// moved past the height of the previous round.
pub async fn run_scheduler(signer: Arc<BtcSigner>, tracker: TaskTracker, cancel: CancellationToken) {
    let chain_id = signer.observer().chain_id();
    info!(%chain_id, "outbound scheduler started");

    let mut last_height = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(signer.config().schedule_tick()) => {
                let height = match signer.observer().zetacore().get_block_height().await {
                    Ok(height) => height,
                    Err(err) => {
                        error!(%chain_id, %err, "could not get zeta height");
                        continue;
                    }
                };
                let Ok(height) = u64::try_from(height) else {
                    error!(%chain_id, err = %SignerError::NegativeZetaHeight(height), "invalid zeta height");
                    continue;
                };
                if last_height.is_some_and(|last| height <= last) {
                    continue;
                }

                match signer.schedule_outbounds(height, &tracker).await {
                    Ok(started) => debug!(%chain_id, %height, %started, "scheduling round completed"),
                    Err(err) => error!(%chain_id, %height, %err, "scheduling round failed"),
                }
                last_height = Some(height);
            }
        }
    }

    info!(%chain_id, "outbound scheduler stopped");
}

/// Spawns the scheduler on `tracker`. Keysigns it starts are tracked by `tracker` too.
pub fn spawn_scheduler(signer: Arc<BtcSigner>, tracker: &TaskTracker, cancel: CancellationToken) {
    tracker.spawn(run_scheduler(signer, tracker.clone(), cancel));
}
