//! A [`BitcoinRpc`] that spreads calls over several endpoints.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use bitcoin::{block::Header, BlockHash, Transaction, Txid};
use futures::{future::BoxFuture, FutureExt};
use parking_lot::Mutex;
use tracing::warn;
use zeta_btc_primitives::rpc_types::{
    GetBlockVerboseTxResult, GetNetworkInfoResult, GetTransactionResult, ListUnspentResult,
    TxRawResult,
};

use crate::{
    error::{ClientError, ClientResult},
    traits::BitcoinRpc,
};

/// Wraps an ordered queue of endpoints behind the [`BitcoinRpc`] interface.
///
/// Each call goes to the endpoint at the head of the queue. If it fails, that endpoint is moved to
/// the tail and the call is replayed against the new head, trying every endpoint at most once. The
/// error of the last attempt is returned if all of them fail. There is no backoff here; callers
/// poll at their own cadence.
pub struct RpcFailover {
    endpoints: Mutex<VecDeque<Arc<dyn BitcoinRpc>>>,
}

impl std::fmt::Debug for RpcFailover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcFailover")
            .field("endpoints", &self.endpoints.lock().len())
            .finish()
    }
}

impl RpcFailover {
    /// Creates a failover proxy over `endpoints`, in order of preference.
    pub fn new(endpoints: Vec<Arc<dyn BitcoinRpc>>) -> ClientResult<Self> {
        if endpoints.is_empty() {
            return Err(ClientError::NoEndpoints);
        }

        Ok(Self {
            endpoints: Mutex::new(endpoints.into()),
        })
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.lock().len()
    }

    /// Returns whether there is no endpoint.
    pub fn is_empty(&self) -> bool {
        self.endpoints.lock().is_empty()
    }

    fn head(&self) -> Option<Arc<dyn BitcoinRpc>> {
        self.endpoints.lock().front().cloned()
    }

    // Only rotates if `failed` is still the head, so that concurrent failures of the same endpoint
    // rotate the queue once.
    fn rotate(&self, failed: &Arc<dyn BitcoinRpc>) {
        let mut endpoints = self.endpoints.lock();
        if endpoints
            .front()
            .is_some_and(|head| Arc::ptr_eq(head, failed))
        {
            endpoints.rotate_left(1);
        }
    }

    async fn with_failover<T, F>(&self, method: &'static str, call: F) -> ClientResult<T>
    where
        F: Fn(Arc<dyn BitcoinRpc>) -> BoxFuture<'static, ClientResult<T>>,
    {
        let attempts = self.len();
        let mut last_err = ClientError::NoEndpoints;

        for attempt in 1..=attempts {
            let Some(endpoint) = self.head() else {
                break;
            };

            match call(endpoint.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    warn!(%method, %err, %attempt, %attempts, "rpc call failed, rotating endpoint");
                    self.rotate(&endpoint);
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }
}

#[async_trait]
impl BitcoinRpc for RpcFailover {
    async fn get_block_count(&self) -> ClientResult<i64> {
        self.with_failover("getblockcount", |c| {
            async move { c.get_block_count().await }.boxed()
        })
        .await
    }

    async fn get_block_hash(&self, height: u64) -> ClientResult<BlockHash> {
        self.with_failover("getblockhash", move |c| {
            async move { c.get_block_hash(height).await }.boxed()
        })
        .await
    }

    async fn get_block_header(&self, hash: BlockHash) -> ClientResult<Header> {
        self.with_failover("getblockheader", move |c| {
            async move { c.get_block_header(hash).await }.boxed()
        })
        .await
    }

    async fn get_block_verbose_tx(&self, hash: BlockHash) -> ClientResult<GetBlockVerboseTxResult> {
        self.with_failover("getblock", move |c| {
            async move { c.get_block_verbose_tx(hash).await }.boxed()
        })
        .await
    }

    async fn list_unspent(
        &self,
        min_conf: u64,
        max_conf: u64,
        addresses: Vec<String>,
    ) -> ClientResult<Vec<ListUnspentResult>> {
        self.with_failover("listunspent", move |c| {
            let addresses = addresses.clone();
            async move { c.list_unspent(min_conf, max_conf, addresses).await }.boxed()
        })
        .await
    }

    async fn get_transaction(&self, txid: Txid) -> ClientResult<GetTransactionResult> {
        self.with_failover("gettransaction", move |c| {
            async move { c.get_transaction(txid).await }.boxed()
        })
        .await
    }

    async fn get_raw_transaction(&self, txid: Txid) -> ClientResult<Transaction> {
        self.with_failover("getrawtransaction", move |c| {
            async move { c.get_raw_transaction(txid).await }.boxed()
        })
        .await
    }

    async fn get_raw_transaction_verbose(&self, txid: Txid) -> ClientResult<TxRawResult> {
        self.with_failover("getrawtransaction", move |c| {
            async move { c.get_raw_transaction_verbose(txid).await }.boxed()
        })
        .await
    }

    async fn send_raw_transaction(&self, tx: Transaction) -> ClientResult<Txid> {
        self.with_failover("sendrawtransaction", move |c| {
            let tx = tx.clone();
            async move { c.send_raw_transaction(tx).await }.boxed()
        })
        .await
    }

    async fn estimate_smart_fee(&self, conf_target: u16) -> ClientResult<u64> {
        self.with_failover("estimatesmartfee", move |c| {
            async move { c.estimate_smart_fee(conf_target).await }.boxed()
        })
        .await
    }

    async fn get_network_info(&self) -> ClientResult<GetNetworkInfoResult> {
        self.with_failover("getnetworkinfo", |c| {
            async move { c.get_network_info().await }.boxed()
        })
        .await
    }

    async fn import_address(&self, address: String) -> ClientResult<()> {
        self.with_failover("importaddress", move |c| {
            let address = address.clone();
            async move { c.import_address(address).await }.boxed()
        })
        .await
    }
}
