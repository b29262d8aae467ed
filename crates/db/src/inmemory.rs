//! In-memory implementation of the observer database, used in tests and when no datadir is set.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bitcoin::Txid;
use tokio::sync::RwLock;
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::OutboundKey};

use crate::{errors::DbResult, observer::BtcObserverDb};

/// In-memory database for the chain observer.
#[derive(Debug, Clone, Default)]
pub struct BtcObserverInMemory {
    /// Last scanned block height.
    last_scanned_block: Arc<RwLock<Option<u64>>>,

    /// Broadcast hash per outbound.
    broadcasted_txs: Arc<RwLock<HashMap<OutboundKey, Txid>>>,

    /// Included-tx result per outbound.
    included_txs: Arc<RwLock<HashMap<OutboundKey, GetTransactionResult>>>,
}

#[async_trait]
impl BtcObserverDb for BtcObserverInMemory {
    async fn get_last_scanned_block(&self) -> DbResult<Option<u64>> {
        Ok(*self.last_scanned_block.read().await)
    }

    async fn set_last_scanned_block(&self, height: u64) -> DbResult<()> {
        let mut last_scanned_block = self.last_scanned_block.write().await;

        *last_scanned_block = Some(height);

        Ok(())
    }

    async fn get_broadcasted_txs(&self) -> DbResult<Vec<(OutboundKey, Txid)>> {
        Ok(self
            .broadcasted_txs
            .read()
            .await
            .iter()
            .map(|(key, txid)| (key.clone(), *txid))
            .collect())
    }

    async fn save_broadcasted_tx(&self, key: &OutboundKey, txid: Txid) -> DbResult<()> {
        self.broadcasted_txs.write().await.insert(key.clone(), txid);

        Ok(())
    }

    async fn get_included_txs(&self) -> DbResult<Vec<(OutboundKey, GetTransactionResult)>> {
        Ok(self
            .included_txs
            .read()
            .await
            .iter()
            .map(|(key, result)| (key.clone(), result.clone()))
            .collect())
    }

    async fn save_included_tx(
        &self,
        key: &OutboundKey,
        result: &GetTransactionResult,
    ) -> DbResult<()> {
        self.included_txs
            .write()
            .await
            .insert(key.clone(), result.clone());

        Ok(())
    }

    async fn delete_included_tx(&self, key: &OutboundKey) -> DbResult<()> {
        self.included_txs.write().await.remove(key);

        Ok(())
    }
}
