//! Health check of the bitcoin node.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::info;
use zeta_btc_params::constants::RPC_STALE_TIP_AGE;

use crate::{errors::ObserverError, observer::BtcObserver};

/// Upper bound of confirmations passed to `listunspent` by the health check.
const MAX_LIST_CONFIRMATIONS: u64 = 1_000_000;

impl BtcObserver {
    /// Checks that the node follows the chain and sees the TSS outputs.
    ///
    /// Returns the age of the tip.
    pub async fn check_rpc_status(&self) -> Result<Duration, ObserverError> {
        let tip = self.rpc().get_block_count().await?;
        if tip < 0 {
            return Err(ObserverError::NegativeBlockCount(tip));
        }

        let hash = self.rpc().get_block_hash(tip as u64).await?;
        let header = self.rpc().get_block_header(hash).await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let age = now.saturating_sub(Duration::from_secs(u64::from(header.time)));
        if age > RPC_STALE_TIP_AGE {
            return Err(ObserverError::Unhealthy(format!(
                "tip {tip} is {}s old",
                age.as_secs()
            )));
        }

        let utxos = self
            .rpc()
            .list_unspent(0, MAX_LIST_CONFIRMATIONS, vec![self.tss_address().to_string()])
            .await?;
        if utxos.is_empty() {
            return Err(ObserverError::Unhealthy(format!(
                "no utxos listed for tss address {}",
                self.tss_address()
            )));
        }

        info!(%tip, age_secs = age.as_secs(), utxos = utxos.len(), "bitcoin rpc is healthy");

        Ok(age)
    }
}
