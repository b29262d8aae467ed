//! The interface to the consensus chain.

use std::fmt;

use async_trait::async_trait;
use bitcoin::PublicKey;
use zeta_btc_params::prelude::{ChainParams, CrosschainFlags};

use crate::{
    errors::ZetacoreResult,
    types::{
        CrossChainTx, InboundTracker, MsgAddBlockHeader, MsgVoteGasPrice, MsgVoteInbound,
        MsgVoteOutbound, OutboundTracker, PendingNonces, VoteResponse,
    },
};

/// Queries and votes against the consensus chain.
///
/// None of the calls are assumed idempotent at the transport level; callers must tolerate a vote
/// being delivered more than once.
#[async_trait]
pub trait ZetacoreClient: fmt::Debug + Send + Sync + 'static {
    /// Votes that a deposit was observed.
    async fn post_vote_inbound(&self, msg: MsgVoteInbound) -> ZetacoreResult<VoteResponse>;

    /// Votes that an outbound was mined.
    async fn post_vote_outbound(&self, msg: MsgVoteOutbound) -> ZetacoreResult<VoteResponse>;

    /// Reports the current fee rate. Returns the consensus chain tx hash.
    async fn post_gas_price(&self, msg: MsgVoteGasPrice) -> ZetacoreResult<String>;

    /// Relays a block header. Returns the consensus chain tx hash.
    async fn post_block_header(&self, msg: MsgAddBlockHeader) -> ZetacoreResult<String>;

    /// Adds `tx_hash` to the tracker of outbound `nonce`. Returns the consensus chain tx hash.
    async fn add_outbound_tracker(
        &self,
        chain_id: i64,
        nonce: u64,
        tx_hash: String,
    ) -> ZetacoreResult<String>;

    /// Fetches the cctx paid by outbound `nonce` of `chain_id`.
    async fn get_cctx_by_nonce(&self, chain_id: i64, nonce: u64) -> ZetacoreResult<CrossChainTx>;

    /// Fetches all outbound trackers of `chain_id`, by ascending nonce.
    async fn get_outbound_trackers(&self, chain_id: i64) -> ZetacoreResult<Vec<OutboundTracker>>;

    /// Fetches all inbound trackers of `chain_id`.
    async fn get_inbound_trackers(&self, chain_id: i64) -> ZetacoreResult<Vec<InboundTracker>>;

    /// Fetches the range of pending nonces of `chain_id`.
    async fn get_pending_nonces(&self, chain_id: i64) -> ZetacoreResult<PendingNonces>;

    /// Fetches the cctxs waiting for an outbound on `chain_id`.
    async fn list_pending_cctx(&self, chain_id: i64) -> ZetacoreResult<Vec<CrossChainTx>>;

    /// Fetches the current observer set.
    async fn get_observer_list(&self) -> ZetacoreResult<Vec<String>>;

    /// Fetches the params of all chains.
    async fn get_chain_params(&self) -> ZetacoreResult<Vec<ChainParams>>;

    /// Fetches the crosschain feature flags.
    async fn get_crosschain_flags(&self) -> ZetacoreResult<CrosschainFlags>;

    /// Fetches the current TSS public key.
    async fn get_tss_pubkey(&self) -> ZetacoreResult<PublicKey>;

    /// Fetches the height of the consensus chain.
    async fn get_block_height(&self) -> ZetacoreResult<i64>;
}
