//! Records read from and messages posted to the consensus chain.

use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// The kind of asset moved by a cross-chain transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinType {
    /// The consensus chain's native token.
    Zeta,

    /// The external chain's gas token (BTC for bitcoin).
    #[default]
    Gas,

    /// An ERC20 token.
    Erc20,

    /// An administrative command.
    Cmd,
}

/// Lifecycle status of a cross-chain transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CctxStatus {
    #[default]
    PendingInbound,
    PendingOutbound,
    OutboundMined,
    PendingRevert,
    Reverted,
    Aborted,
}

/// Outcome reported by an outbound vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveStatus {
    /// The outbound paid its receiver.
    Success,

    /// The outbound was mined without paying its receiver.
    Failed,
}

/// The inbound leg of a cross-chain transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundParams {
    pub sender: String,

    pub sender_chain_id: i64,

    #[serde(default)]
    pub tx_origin: String,

    pub coin_type: CoinType,

    #[serde(default)]
    pub asset: String,

    /// Amount in the smallest unit of the asset.
    pub amount: u64,

    #[serde(default)]
    pub observed_hash: String,

    #[serde(default)]
    pub observed_external_height: u64,
}

/// An outbound leg of a cross-chain transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundParams {
    pub receiver: String,

    pub receiver_chain_id: i64,

    pub coin_type: CoinType,

    /// Amount in satoshis.
    pub amount: u64,

    pub tss_nonce: u64,

    /// Byte-size budget charged to the user.
    #[serde(default)]
    pub gas_limit: u64,

    /// Fee rate in sat/vB, as a decimal string.
    #[serde(default)]
    pub gas_price: String,

    /// The finalized outbound hash, empty until voted.
    #[serde(default)]
    pub hash: String,

    #[serde(default)]
    pub tss_pubkey: String,

    #[serde(default)]
    pub observed_external_height: u64,
}

impl OutboundParams {
    /// The amount to pay.
    pub fn amount(&self) -> Amount {
        Amount::from_sat(self.amount)
    }

    /// Parses the fee rate, in sat/vB.
    pub fn gas_price(&self) -> Option<u64> {
        self.gas_price.trim().parse().ok()
    }
}

/// A cross-chain transaction as stored on the consensus chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainTx {
    /// The cctx index, used as the "send hash" in outbound votes.
    pub index: String,

    #[serde(default)]
    pub creator: String,

    pub inbound_params: InboundParams,

    pub outbound_params: Vec<OutboundParams>,

    #[serde(default)]
    pub status: CctxStatus,
}

impl CrossChainTx {
    /// The outbound leg currently being processed: the revert leg if any, else the first one.
    pub fn current_outbound_params(&self) -> Option<&OutboundParams> {
        self.outbound_params.last()
    }

    /// The asset moved.
    pub fn coin_type(&self) -> CoinType {
        self.inbound_params.coin_type
    }
}

/// A hash reported for an outbound by one of the signers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHashEntry {
    pub tx_hash: String,

    #[serde(default)]
    pub tx_signer: String,
}

/// The candidate hashes reported for one outbound nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundTracker {
    #[serde(default)]
    pub index: String,

    pub chain_id: i64,

    pub nonce: u64,

    #[serde(default)]
    pub hash_list: Vec<TxHashEntry>,
}

/// A deposit reported by a user or an observer that may have been missed by block scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundTracker {
    pub chain_id: i64,

    pub tx_hash: String,

    pub coin_type: CoinType,
}

/// The range of outbound nonces not yet finalized for a chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNonces {
    pub nonce_low: i64,

    pub nonce_high: i64,

    pub chain_id: i64,

    #[serde(default)]
    pub tss: String,
}

/// Vote that a deposit was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteInbound {
    pub sender: String,

    pub sender_chain_id: i64,

    pub tx_origin: String,

    pub receiver: String,

    pub receiver_chain_id: i64,

    /// Credited amount in satoshis.
    pub amount: u64,

    /// Hex-encoded memo.
    pub message: String,

    pub inbound_hash: String,

    pub inbound_block_height: u64,

    pub gas_limit: u64,

    pub coin_type: CoinType,

    pub asset: String,

    pub event_index: u64,
}

/// Vote that an outbound was mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteOutbound {
    pub cctx_hash: String,

    pub outbound_hash: String,

    /// Index of the transaction inside its block.
    pub outbound_block_height: u64,

    pub outbound_gas_used: u64,

    pub outbound_gas_price: u64,

    pub outbound_gas_limit: u64,

    /// Paid amount in satoshis.
    pub value_received: u64,

    pub status: ReceiveStatus,

    pub chain_id: i64,

    pub outbound_tss_nonce: u64,

    pub coin_type: CoinType,
}

/// Report of the current fee rate of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVoteGasPrice {
    pub chain_id: i64,

    /// Fee rate in sat/vB.
    pub price: u64,

    pub supply: String,

    pub block_number: u64,
}

/// Relay of a block header for header verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAddBlockHeader {
    pub chain_id: i64,

    /// Hex-encoded block hash.
    pub block_hash: String,

    pub height: i64,

    /// Hex-encoded consensus serialization of the header.
    pub header: String,
}

/// Result of posting a vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Hash of the consensus chain transaction carrying the vote, empty if the vote was dropped.
    #[serde(default)]
    pub zeta_tx_hash: String,

    /// The ballot the vote was added to.
    #[serde(default)]
    pub ballot: String,
}
