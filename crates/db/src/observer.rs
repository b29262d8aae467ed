use std::fmt;

use async_trait::async_trait;
use bitcoin::Txid;
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::OutboundKey};

use crate::errors::DbResult;

/// Persistence interface of the chain observer.
///
/// All records are overwritable: saving under an existing key replaces the previous value.
#[async_trait]
pub trait BtcObserverDb: fmt::Debug + Send + Sync + 'static {
    /// Returns the height of the last scanned block, if any was ever persisted.
    async fn get_last_scanned_block(&self) -> DbResult<Option<u64>>;

    /// Records the height of the last scanned block.
    async fn set_last_scanned_block(&self, height: u64) -> DbResult<()>;

    /// Returns every broadcast hash recorded, for all chains and TSS addresses.
    async fn get_broadcasted_txs(&self) -> DbResult<Vec<(OutboundKey, Txid)>>;

    /// Records that `txid` was broadcast for the outbound at `key`.
    async fn save_broadcasted_tx(&self, key: &OutboundKey, txid: Txid) -> DbResult<()>;

    /// Returns every included-tx result recorded, for all chains and TSS addresses.
    async fn get_included_txs(&self) -> DbResult<Vec<(OutboundKey, GetTransactionResult)>>;

    /// Records the transaction that paid the outbound at `key`.
    async fn save_included_tx(
        &self,
        key: &OutboundKey,
        result: &GetTransactionResult,
    ) -> DbResult<()>;

    /// Deletes the included-tx result for `key`. Deleting a missing record is not an error.
    async fn delete_included_tx(&self, key: &OutboundKey) -> DbResult<()>;
}
