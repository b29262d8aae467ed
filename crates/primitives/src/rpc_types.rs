//! Data model of the verbose and wallet bitcoind JSON-RPC results consumed by the observer and the
//! signer.
//!
//! Only the fields that are read somewhere are modelled; unknown fields are ignored. BTC values
//! are kept as the `f64` the node returns and converted with [`crate::types::get_satoshis`] at the
//! point of use.

use bitcoin::{hashes::Hash, BlockHash, OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// The `scriptPubKey` object of an output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKeyResult {
    /// Disassembly of the script.
    #[serde(default)]
    pub asm: String,

    /// The script, hex-encoded.
    pub hex: String,

    /// The address type as reported by the node (e.g. `witness_v0_keyhash`).
    #[serde(rename = "type", default)]
    pub kind: String,

    /// The address, if the script has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// The `scriptSig` object of an input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptSig {
    /// Disassembly of the script.
    #[serde(default)]
    pub asm: String,

    /// The script, hex-encoded.
    #[serde(default)]
    pub hex: String,
}

/// An input of a verbose transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vin {
    /// The coinbase script, present only on coinbase inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,

    /// The transaction being spent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<Txid>,

    /// The index of the output being spent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,

    /// The unlocking script.
    #[serde(rename = "scriptSig", default, skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,

    /// The witness stack, hex-encoded items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txinwitness: Option<Vec<String>>,

    /// The sequence number.
    pub sequence: u32,
}

impl Vin {
    /// The outpoint spent by this input, if this is not a coinbase input.
    pub fn outpoint(&self) -> Option<OutPoint> {
        Some(OutPoint {
            txid: self.txid?,
            vout: self.vout?,
        })
    }

    /// The witness stack, empty if the input has none.
    pub fn witness(&self) -> &[String] {
        self.txinwitness.as_deref().unwrap_or_default()
    }
}

/// An output of a verbose transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    /// The value in BTC.
    pub value: f64,

    /// The index of the output.
    pub n: u32,

    /// The locking script.
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKeyResult,
}

/// A verbose transaction as returned by `getrawtransaction <txid> true` and inside
/// `getblock <hash> 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRawResult {
    /// The serialized transaction, hex-encoded.
    #[serde(default)]
    pub hex: String,

    /// The transaction id.
    pub txid: Txid,

    /// The witness transaction id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// The serialized size.
    #[serde(default)]
    pub size: u64,

    /// The virtual size.
    #[serde(default)]
    pub vsize: u64,

    /// The weight.
    #[serde(default)]
    pub weight: u64,

    /// The version.
    #[serde(default)]
    pub version: i32,

    /// The lock time.
    #[serde(default)]
    pub locktime: u32,

    /// The inputs.
    pub vin: Vec<Vin>,

    /// The outputs.
    pub vout: Vec<Vout>,

    /// The block containing the transaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<BlockHash>,

    /// Number of confirmations, if mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,

    /// Block time, if mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,
}

impl TxRawResult {
    /// Returns whether the first input is a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        self.vin.first().is_some_and(|vin| vin.coinbase.is_some())
    }
}

/// A block as returned by `getblock <hash> 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBlockVerboseTxResult {
    /// The block hash.
    pub hash: BlockHash,

    /// Number of confirmations; `-1` if not on the main chain.
    #[serde(default)]
    pub confirmations: i64,

    /// The block weight.
    pub weight: u64,

    /// The block height.
    pub height: i64,

    /// The block version.
    #[serde(default)]
    pub version: i32,

    /// The block time.
    #[serde(default)]
    pub time: u64,

    /// The previous block, absent for the genesis block.
    #[serde(
        rename = "previousblockhash",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_block_hash: Option<BlockHash>,

    /// The transactions, coinbase first.
    pub tx: Vec<TxRawResult>,
}

/// A wallet entry of a `gettransaction` result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTransactionDetails {
    /// The address involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// `send`, `receive`, etc.
    #[serde(default)]
    pub category: String,

    /// The amount in BTC.
    pub amount: f64,

    /// The output index.
    #[serde(default)]
    pub vout: u32,
}

/// The result of `gettransaction <txid>`.
///
/// This is the record persisted for included outbound transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTransactionResult {
    /// The amount in BTC.
    #[serde(default)]
    pub amount: f64,

    /// The fee in BTC, negative, for sends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,

    /// Number of confirmations; negative if conflicted.
    pub confirmations: i64,

    /// The block containing the transaction, if mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<BlockHash>,

    /// The index of the transaction in its block, if mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockindex: Option<i64>,

    /// The block time, if mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,

    /// The transaction id.
    pub txid: Txid,

    /// The time the wallet first saw the transaction.
    #[serde(default)]
    pub time: u64,

    /// The time the wallet received the transaction.
    #[serde(default)]
    pub timereceived: u64,

    /// Per-address wallet entries.
    #[serde(default)]
    pub details: Vec<GetTransactionDetails>,

    /// The serialized transaction, hex-encoded.
    #[serde(default)]
    pub hex: String,
}

/// An entry of the `listunspent` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListUnspentResult {
    /// The transaction that created the output.
    pub txid: Txid,

    /// The output index.
    pub vout: u32,

    /// The address holding the output.
    #[serde(default)]
    pub address: String,

    /// The locking script, hex-encoded.
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: String,

    /// The value in BTC.
    pub amount: f64,

    /// Number of confirmations.
    pub confirmations: i64,

    /// Whether the wallet can spend the output.
    #[serde(default)]
    pub spendable: bool,
}

/// The result of `getnetworkinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetNetworkInfoResult {
    /// Node version.
    #[serde(default)]
    pub version: i64,

    /// Node user agent.
    #[serde(default)]
    pub subversion: String,

    /// Minimum relay fee in BTC/kvB.
    pub relayfee: f64,

    /// Minimum fee rate increment for replacement, in BTC/kvB.
    #[serde(default)]
    pub incrementalfee: f64,
}

// Hash newtypes have no `Default`; the all-zero hash stands in for "unset".

impl Default for TxRawResult {
    fn default() -> Self {
        Self {
            hex: String::new(),
            txid: Txid::all_zeros(),
            hash: None,
            size: 0,
            vsize: 0,
            weight: 0,
            version: 0,
            locktime: 0,
            vin: Vec::new(),
            vout: Vec::new(),
            blockhash: None,
            confirmations: None,
            blocktime: None,
        }
    }
}

impl Default for GetBlockVerboseTxResult {
    fn default() -> Self {
        Self {
            hash: BlockHash::all_zeros(),
            confirmations: 0,
            weight: 0,
            height: 0,
            version: 0,
            time: 0,
            previous_block_hash: None,
            tx: Vec::new(),
        }
    }
}

impl Default for GetTransactionResult {
    fn default() -> Self {
        Self {
            amount: 0.0,
            fee: None,
            confirmations: 0,
            blockhash: None,
            blockindex: None,
            blocktime: None,
            txid: Txid::all_zeros(),
            time: 0,
            timereceived: 0,
            details: Vec::new(),
            hex: String::new(),
        }
    }
}
