//! Error types for the chain observer.

use bitcoin::{Amount, BlockHash, OutPoint, Txid};
use thiserror::Error;
use zeta_btc_db::DbError;
use zeta_btc_primitives::errors::{FeeError, ScriptError};
use zeta_btc_rpc::ClientError;
use zeta_btc_state::{SelectionError, StateError};
use zetacore_client::ZetacoreError;

/// Errors raised while observing the chain.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Errors from the bitcoin node.
    #[error("bitcoin rpc: {0}")]
    Rpc(#[from] ClientError),

    /// Errors from the consensus chain.
    #[error("zetacore: {0}")]
    Zetacore(#[from] ZetacoreError),

    /// Errors from the local store.
    #[error("database: {0}")]
    Db(#[from] DbError),

    /// Errors from the state owner, including a decreasing tip.
    #[error("state: {0}")]
    State(#[from] StateError),

    /// No subset of the UTXO set can pay for an outbound.
    #[error("utxo selection: {0}")]
    Selection(#[from] SelectionError),

    /// An outbound transaction failed structural validation.
    #[error("invalid outbound: {0}")]
    Validation(#[from] ValidationError),

    /// Errors from the fee engine.
    #[error("fee: {0}")]
    Fee(#[from] FeeError),

    /// A script or amount in a transaction could not be decoded.
    #[error("script: {0}")]
    Script(#[from] ScriptError),

    /// The node reported a negative block count.
    #[error("block count {0} is negative")]
    NegativeBlockCount(i64),

    /// The node reported a block count of zero.
    #[error("bitcoin node is not enabled")]
    NodeNotEnabled,

    /// The consensus chain did not publish params for the chain yet.
    #[error("chain params of chain {0} are unknown")]
    MissingChainParams(i64),

    /// No trusted txid is known for an outbound nonce.
    #[error("cannot find outbound txid for nonce {0}")]
    OutboundTxidNotFound(u64),

    /// The finalized txid of an outbound nonce is not mined.
    #[error("outbound txid {txid} for nonce {nonce} is not included")]
    OutboundNotIncluded {
        /// The outbound nonce.
        nonce: u64,

        /// The txid recorded on the consensus chain.
        txid: Txid,
    },

    /// The transaction carries no deposit to the TSS address.
    #[error("no inbound event found in tx {0}")]
    NoInboundEvent(Txid),

    /// The block to scan does not have enough confirmations.
    #[error("block {0} is not confirmed yet")]
    BlockNotConfirmed(u64),

    /// The node's view of the chain is not usable.
    #[error("rpc status: {0}")]
    Unhealthy(String),

    /// Data received from a peer is malformed.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Reasons a transaction is not accepted as an outbound of the TSS.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// `gettransaction` returned another transaction.
    #[error("tx result {actual} does not match requested {expected}")]
    TxidMismatch {
        /// Requested txid.
        expected: Txid,

        /// Txid of the returned result.
        actual: Txid,
    },

    /// The transaction has not been seen by the node.
    #[error("tx {txid} has negative confirmations {confirmations}")]
    NegativeConfirmations {
        /// The transaction.
        txid: Txid,

        /// Confirmations reported by the node.
        confirmations: i64,
    },

    /// A mined result lacks the fields needed to locate the transaction.
    #[error("tx result of {txid} is missing its {field}")]
    MissingField {
        /// The transaction.
        txid: Txid,

        /// The missing field.
        field: &'static str,
    },

    /// The block index of a mined result is out of range.
    #[error("block index {index} out of range for block {hash} with {count} txs")]
    BlockIndexOutOfRange {
        /// The block.
        hash: BlockHash,

        /// Index reported by `gettransaction`.
        index: i64,

        /// Number of transactions in the block.
        count: usize,
    },

    /// The transaction found at the block index is another transaction.
    #[error("tx at index {index} of block {hash} is {actual}, expected {expected}")]
    BlockTxMismatch {
        /// The block.
        hash: BlockHash,

        /// Index reported by `gettransaction`.
        index: i64,

        /// Expected txid.
        expected: Txid,

        /// Txid found at the index.
        actual: Txid,
    },

    /// An outbound with a nonce above zero must spend the previous nonce-mark plus funds.
    #[error("outbound of nonce {nonce} has {count} inputs")]
    TooFewInputs {
        /// The outbound nonce.
        nonce: u64,

        /// Number of inputs.
        count: usize,
    },

    /// A TSS input must carry a signature and a public key.
    #[error("input {index} has {count} witness items, expected 2")]
    WitnessCount {
        /// Input index.
        index: usize,

        /// Number of witness items.
        count: usize,
    },

    /// A TSS input was signed by another key.
    #[error("witness pubkey {actual} of input {index} does not match tss pubkey {expected}")]
    WitnessPubkey {
        /// Input index.
        index: usize,

        /// The TSS public key, hex encoded.
        expected: String,

        /// The public key found in the witness.
        actual: String,
    },

    /// The first input does not spend the previous nonce-mark.
    #[error("invalid nonce-mark input {actual:?}, expected {expected}")]
    NonceMarkInput {
        /// The nonce-mark of the previous nonce.
        expected: OutPoint,

        /// The outpoint spent by the first input.
        actual: Option<OutPoint>,
    },

    /// The number of outputs does not fit the outbound layout.
    #[error("invalid number of outputs: {0}")]
    OutputCount(usize),

    /// An output pays an unexpected address.
    #[error("output {index} pays {actual}, expected {expected}")]
    AddressMismatch {
        /// Output index.
        index: u32,

        /// Expected address.
        expected: String,

        /// Address found.
        actual: String,
    },

    /// An output carries an unexpected amount.
    #[error("output {index} carries {actual}, expected {expected}")]
    AmountMismatch {
        /// Output index.
        index: u32,

        /// Expected amount.
        expected: Amount,

        /// Amount found.
        actual: Amount,
    },

    /// The cctx has no outbound leg.
    #[error("cctx {0} has no outbound params")]
    MissingOutboundParams(String),

    /// A script or address could not be decoded.
    #[error("script: {0}")]
    Script(#[from] ScriptError),
}
