//! The interface to a bitcoin node.

use std::fmt;

use async_trait::async_trait;
use bitcoin::{block::Header, BlockHash, Transaction, Txid};
use zeta_btc_primitives::rpc_types::{
    GetBlockVerboseTxResult, GetNetworkInfoResult, GetTransactionResult, ListUnspentResult,
    TxRawResult,
};

use crate::error::ClientResult;

/// The subset of the bitcoind RPC interface used by the observer and the signer.
///
/// Arguments are taken by value so that a call can be replayed against another endpoint.
#[async_trait]
pub trait BitcoinRpc: fmt::Debug + Send + Sync + 'static {
    /// `getblockcount`
    async fn get_block_count(&self) -> ClientResult<i64>;

    /// `getblockhash`
    async fn get_block_hash(&self, height: u64) -> ClientResult<BlockHash>;

    /// `getblockheader <hash> false`
    async fn get_block_header(&self, hash: BlockHash) -> ClientResult<Header>;

    /// `getblock <hash> 2`
    async fn get_block_verbose_tx(&self, hash: BlockHash) -> ClientResult<GetBlockVerboseTxResult>;

    /// `listunspent <min_conf> <max_conf> <addresses>`
    async fn list_unspent(
        &self,
        min_conf: u64,
        max_conf: u64,
        addresses: Vec<String>,
    ) -> ClientResult<Vec<ListUnspentResult>>;

    /// `gettransaction <txid>`
    async fn get_transaction(&self, txid: Txid) -> ClientResult<GetTransactionResult>;

    /// `getrawtransaction <txid> false`
    async fn get_raw_transaction(&self, txid: Txid) -> ClientResult<Transaction>;

    /// `getrawtransaction <txid> true`
    async fn get_raw_transaction_verbose(&self, txid: Txid) -> ClientResult<TxRawResult>;

    /// `sendrawtransaction <hex>`
    async fn send_raw_transaction(&self, tx: Transaction) -> ClientResult<Txid>;

    /// `estimatesmartfee <conf_target>`, in sat/vB.
    async fn estimate_smart_fee(&self, conf_target: u16) -> ClientResult<u64>;

    /// `getnetworkinfo`
    async fn get_network_info(&self) -> ClientResult<GetNetworkInfoResult>;

    /// `importaddress <address> "" false`
    async fn import_address(&self, address: String) -> ClientResult<()>;
}
