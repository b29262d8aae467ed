//! The supervised set of periodic observer tasks.

use std::{fmt, sync::Arc, time::Duration};

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info};
use zeta_btc_params::{constants::RPC_STATUS_INTERVAL, prelude::ChainParams};

use crate::{errors::ObserverError, observer::BtcObserver};

/// A periodic job of the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverTask {
    /// Scans blocks for deposits.
    Inbound,

    /// Votes deposits reported by inbound trackers.
    InboundTrackers,

    /// Records which transaction paid each tracked outbound.
    Outbound,

    /// Refreshes the TSS UTXO set.
    Utxos,

    /// Reports the network fee rate.
    GasPrice,

    /// Checks the health of the node.
    RpcStatus,
}

impl ObserverTask {
    /// Every observer task.
    pub const ALL: [Self; 6] = [
        Self::Inbound,
        Self::InboundTrackers,
        Self::Outbound,
        Self::Utxos,
        Self::GasPrice,
        Self::RpcStatus,
    ];

    /// The pause between two runs under `params`.
    pub fn interval(&self, params: &ChainParams) -> Duration {
        match self {
            Self::Inbound | Self::InboundTrackers => params.inbound_interval(),
            Self::Outbound => params.outbound_interval(),
            Self::Utxos => params.watch_utxo_interval(),
            Self::GasPrice => params.gas_price_interval(),
            Self::RpcStatus => RPC_STATUS_INTERVAL,
        }
    }

    /// Runs the task once.
    pub async fn run_once(&self, observer: &BtcObserver) -> Result<(), ObserverError> {
        match self {
            Self::Inbound => observer.observe_inbound().await,
            Self::InboundTrackers => observer.process_inbound_trackers().await,
            Self::Outbound => observer.observe_outbound().await,
            Self::Utxos => observer.fetch_utxos().await,
            Self::GasPrice => observer.post_gas_price().await,
            Self::RpcStatus => observer.check_rpc_status().await.map(|_| ()),
        }
    }
}

impl fmt::Display for ObserverTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inbound => "inbound",
            Self::InboundTrackers => "inbound-trackers",
            Self::Outbound => "outbound",
            Self::Utxos => "utxos",
            Self::GasPrice => "gas-price",
            Self::RpcStatus => "rpc-status",
        };

        f.write_str(name)
    }
}

/// Spawns every observer task on `tracker`. Each one stops once `cancel` fires.
pub fn spawn_observer_tasks(
    observer: Arc<BtcObserver>,
    tracker: &TaskTracker,
    cancel: CancellationToken,
) {
    for task in ObserverTask::ALL {
        tracker.spawn(run_periodic(observer.clone(), task, cancel.child_token()));
    }
}

/// Runs `task` until `cancel` fires, waiting the interval from the latest chain params before each
/// run.
pub async fn run_periodic(observer: Arc<BtcObserver>, task: ObserverTask, cancel: CancellationToken) {
    info!(chain_id = %observer.chain_id(), %task, "observer task started");

    loop {
        let params = observer
            .chain_params()
            .unwrap_or_else(|_| ChainParams::with_defaults(observer.chain_id()));
        let interval = task.interval(&params);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                if let Err(err) = task.run_once(&observer).await {
                    error!(chain_id = %observer.chain_id(), %task, %err, "observer task failed");
                } else {
                    debug!(%task, "observer task completed");
                }
            }
        }
    }

    info!(chain_id = %observer.chain_id(), %task, "observer task stopped");
}

#[cfg(test)]
mod tests {
    use zeta_btc_params::prelude::ChainParams;

    use super::*;
    use crate::fixtures::Harness;

    #[test]
    fn test_intervals_follow_chain_params() {
        let params = ChainParams {
            gas_price_ticker: 7,
            inbound_ticker: 3,
            outbound_ticker: 5,
            watch_utxo_ticker: 11,
            ..ChainParams::with_defaults(18444)
        };

        assert_eq!(ObserverTask::Inbound.interval(&params), Duration::from_secs(3));
        assert_eq!(ObserverTask::InboundTrackers.interval(&params), Duration::from_secs(3));
        assert_eq!(ObserverTask::Outbound.interval(&params), Duration::from_secs(5));
        assert_eq!(ObserverTask::Utxos.interval(&params), Duration::from_secs(11));
        assert_eq!(ObserverTask::GasPrice.interval(&params), Duration::from_secs(7));
        assert_eq!(ObserverTask::RpcStatus.interval(&params), RPC_STATUS_INTERVAL);
    }

    #[tokio::test]
    async fn test_tasks_run_and_stop_on_cancel() {
        let harness = Harness::regtest().await;
        {
            let mut core = harness.core.core();
            core.chain_params = vec![ChainParams {
                gas_price_ticker: 1,
                ..ChainParams::with_defaults(18444)
            }];
        }
        harness.refresh().await;
        harness.rpc.node().block_count = Some(12);

        let Harness { observer, core, .. } = harness;
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        spawn_observer_tasks(Arc::new(observer), &tracker, cancel.clone());
        tracker.close();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("tasks must stop once cancelled");
        assert!(
            !core.core().gas_prices.is_empty(),
            "gas price must be posted at the configured interval"
        );
    }
}
