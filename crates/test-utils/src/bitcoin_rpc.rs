//! An in-memory bitcoin node.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bitcoin::{block::Header, BlockHash, Transaction, Txid};
use parking_lot::{Mutex, MutexGuard};
use zeta_btc_primitives::rpc_types::{
    GetBlockVerboseTxResult, GetNetworkInfoResult, GetTransactionResult, ListUnspentResult,
    TxRawResult,
};
use zeta_btc_rpc::{BitcoinRpc, ClientError, ClientResult};

/// JSON-RPC code bitcoind uses for unknown transactions and blocks.
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

fn not_found(what: impl std::fmt::Display) -> ClientError {
    ClientError::Server {
        code: RPC_INVALID_ADDRESS_OR_KEY,
        message: format!("{what} not found"),
    }
}

/// What the mock node knows. Tests fill it through [`MockBitcoinRpc::node`].
#[derive(Debug, Default)]
pub struct MockNode {
    /// `getblockcount`; `None` makes the call fail.
    pub block_count: Option<i64>,

    /// Main chain block hashes by height.
    pub block_hashes: BTreeMap<u64, BlockHash>,

    /// Raw headers by hash.
    pub headers: HashMap<BlockHash, Header>,

    /// Verbose blocks by hash.
    pub blocks: HashMap<BlockHash, GetBlockVerboseTxResult>,

    /// Unspent outputs, filtered by address and confirmations on `listunspent`.
    pub utxos: Vec<ListUnspentResult>,

    /// Wallet transactions.
    pub wallet_txs: HashMap<Txid, GetTransactionResult>,

    /// Transactions returned by `getrawtransaction`.
    pub raw_txs: HashMap<Txid, Transaction>,

    /// Verbose transactions returned by `getrawtransaction <txid> true`.
    pub verbose_txs: HashMap<Txid, TxRawResult>,

    /// `estimatesmartfee` fee rate in sat/vB; `None` makes the estimate fail.
    pub fee_rate: Option<u64>,

    /// `getnetworkinfo` relay fee in BTC/kvB.
    pub relay_fee: f64,

    /// Number of upcoming `sendrawtransaction` calls that fail.
    pub send_failures: usize,

    /// Every transaction accepted by `sendrawtransaction`.
    pub sent: Vec<Transaction>,

    /// Every address passed to `importaddress`.
    pub imported: Vec<String>,
}

/// A [`BitcoinRpc`] backed by a [`MockNode`].
#[derive(Debug, Default)]
pub struct MockBitcoinRpc {
    node: Mutex<MockNode>,
}

impl MockBitcoinRpc {
    /// Creates an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the node for inspection or setup.
    pub fn node(&self) -> MutexGuard<'_, MockNode> {
        self.node.lock()
    }

    /// Adds `block` to the main chain along with its headers, and raises the tip to its height.
    pub fn add_block(&self, block: GetBlockVerboseTxResult, header: Header) {
        let mut node = self.node.lock();
        let height = block.height;

        node.block_hashes.insert(height as u64, block.hash);
        node.headers.insert(block.hash, header);
        node.blocks.insert(block.hash, block);
        if node.block_count.map_or(true, |tip| tip < height) {
            node.block_count = Some(height);
        }
    }
}

#[async_trait]
impl BitcoinRpc for MockBitcoinRpc {
    async fn get_block_count(&self) -> ClientResult<i64> {
        self.node
            .lock()
            .block_count
            .ok_or_else(|| ClientError::Transport("node down".to_string()))
    }

    async fn get_block_hash(&self, height: u64) -> ClientResult<BlockHash> {
        self.node
            .lock()
            .block_hashes
            .get(&height)
            .copied()
            .ok_or_else(|| not_found(format!("block at height {height}")))
    }

    async fn get_block_header(&self, hash: BlockHash) -> ClientResult<Header> {
        self.node
            .lock()
            .headers
            .get(&hash)
            .copied()
            .ok_or_else(|| not_found(hash))
    }

    async fn get_block_verbose_tx(&self, hash: BlockHash) -> ClientResult<GetBlockVerboseTxResult> {
        self.node
            .lock()
            .blocks
            .get(&hash)
            .cloned()
            .ok_or_else(|| not_found(hash))
    }

    async fn list_unspent(
        &self,
        min_conf: u64,
        max_conf: u64,
        addresses: Vec<String>,
    ) -> ClientResult<Vec<ListUnspentResult>> {
        let min_conf = min_conf as i64;
        let max_conf = i64::try_from(max_conf).unwrap_or(i64::MAX);

        Ok(self
            .node
            .lock()
            .utxos
            .iter()
            .filter(|utxo| addresses.contains(&utxo.address))
            .filter(|utxo| (min_conf..=max_conf).contains(&utxo.confirmations))
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, txid: Txid) -> ClientResult<GetTransactionResult> {
        self.node
            .lock()
            .wallet_txs
            .get(&txid)
            .cloned()
            .ok_or_else(|| not_found(txid))
    }

    async fn get_raw_transaction(&self, txid: Txid) -> ClientResult<Transaction> {
        self.node
            .lock()
            .raw_txs
            .get(&txid)
            .cloned()
            .ok_or_else(|| not_found(txid))
    }

    async fn get_raw_transaction_verbose(&self, txid: Txid) -> ClientResult<TxRawResult> {
        self.node
            .lock()
            .verbose_txs
            .get(&txid)
            .cloned()
            .ok_or_else(|| not_found(txid))
    }

    async fn send_raw_transaction(&self, tx: Transaction) -> ClientResult<Txid> {
        let mut node = self.node.lock();
        if node.send_failures > 0 {
            node.send_failures -= 1;
            return Err(ClientError::Server {
                code: -26,
                message: "min relay fee not met".to_string(),
            });
        }

        let txid = tx.compute_txid();
        node.sent.push(tx);

        Ok(txid)
    }

    async fn estimate_smart_fee(&self, _conf_target: u16) -> ClientResult<u64> {
        self.node.lock().fee_rate.ok_or_else(|| ClientError::Server {
            code: -32603,
            message: "Insufficient data or no feerate found".to_string(),
        })
    }

    async fn get_network_info(&self) -> ClientResult<GetNetworkInfoResult> {
        Ok(GetNetworkInfoResult {
            relayfee: self.node.lock().relay_fee,
            ..Default::default()
        })
    }

    async fn import_address(&self, address: String) -> ClientResult<()> {
        self.node.lock().imported.push(address);

        Ok(())
    }
}
