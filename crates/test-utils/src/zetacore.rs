//! An in-memory consensus chain.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bitcoin::PublicKey;
use parking_lot::{Mutex, MutexGuard};
use zeta_btc_params::prelude::{ChainParams, CrosschainFlags};
use zetacore_client::{
    types::{
        CrossChainTx, InboundTracker, MsgAddBlockHeader, MsgVoteGasPrice, MsgVoteInbound,
        MsgVoteOutbound, OutboundTracker, PendingNonces, TxHashEntry, VoteResponse,
    },
    ZetacoreClient, ZetacoreError, ZetacoreResult,
};

/// What the mock consensus chain knows and what it was sent.
#[derive(Debug, Default)]
pub struct MockCore {
    /// Cctxs by outbound nonce.
    pub cctxs: BTreeMap<u64, CrossChainTx>,

    /// Outbound trackers by nonce.
    pub outbound_trackers: BTreeMap<u64, OutboundTracker>,

    /// Inbound trackers.
    pub inbound_trackers: Vec<InboundTracker>,

    /// Pending nonce range.
    pub pending_nonces: PendingNonces,

    /// Cctxs waiting for an outbound.
    pub pending_cctxs: Vec<CrossChainTx>,

    /// Observer set.
    pub observers: Vec<String>,

    /// Chain params of all chains.
    pub chain_params: Vec<ChainParams>,

    /// Crosschain flags.
    pub flags: CrosschainFlags,

    /// TSS public key; `None` makes the query fail.
    pub tss_pubkey: Option<PublicKey>,

    /// Consensus chain height.
    pub height: i64,

    /// Whether votes and tracker updates are rejected.
    pub reject_writes: bool,

    /// Every inbound vote received.
    pub inbound_votes: Vec<MsgVoteInbound>,

    /// Every outbound vote received.
    pub outbound_votes: Vec<MsgVoteOutbound>,

    /// Every gas price report received.
    pub gas_prices: Vec<MsgVoteGasPrice>,

    /// Every block header received.
    pub block_headers: Vec<MsgAddBlockHeader>,
}

/// A [`ZetacoreClient`] backed by a [`MockCore`].
#[derive(Debug, Default)]
pub struct MockZetacore {
    core: Mutex<MockCore>,
}

impl MockZetacore {
    /// Creates an empty consensus chain with everything enabled.
    pub fn new() -> Self {
        let core = MockCore {
            flags: CrosschainFlags {
                is_inbound_enabled: true,
                is_outbound_enabled: true,
                header_verification_chains: vec![],
            },
            ..Default::default()
        };

        Self {
            core: Mutex::new(core),
        }
    }

    /// Locks the consensus chain for inspection or setup.
    pub fn core(&self) -> MutexGuard<'_, MockCore> {
        self.core.lock()
    }

    fn write<T>(&self, apply: impl FnOnce(&mut MockCore) -> T) -> ZetacoreResult<T> {
        let mut core = self.core.lock();
        if core.reject_writes {
            return Err(ZetacoreError::Rejected("writes disabled".to_string()));
        }

        Ok(apply(&mut core))
    }
}

#[async_trait]
impl ZetacoreClient for MockZetacore {
    async fn post_vote_inbound(&self, msg: MsgVoteInbound) -> ZetacoreResult<VoteResponse> {
        self.write(|core| {
            let ballot = format!("inbound-{}", msg.inbound_hash);
            core.inbound_votes.push(msg);

            VoteResponse {
                zeta_tx_hash: format!("0x{:064x}", core.inbound_votes.len()),
                ballot,
            }
        })
    }

    async fn post_vote_outbound(&self, msg: MsgVoteOutbound) -> ZetacoreResult<VoteResponse> {
        self.write(|core| {
            let ballot = format!("outbound-{}", msg.outbound_hash);
            core.outbound_votes.push(msg);

            VoteResponse {
                zeta_tx_hash: format!("0x{:064x}", core.outbound_votes.len()),
                ballot,
            }
        })
    }

    async fn post_gas_price(&self, msg: MsgVoteGasPrice) -> ZetacoreResult<String> {
        self.write(|core| {
            core.gas_prices.push(msg);
            format!("0x{:064x}", core.gas_prices.len())
        })
    }

    async fn post_block_header(&self, msg: MsgAddBlockHeader) -> ZetacoreResult<String> {
        self.write(|core| {
            core.block_headers.push(msg);
            format!("0x{:064x}", core.block_headers.len())
        })
    }

    async fn add_outbound_tracker(
        &self,
        chain_id: i64,
        nonce: u64,
        tx_hash: String,
    ) -> ZetacoreResult<String> {
        self.write(|core| {
            let tracker = core
                .outbound_trackers
                .entry(nonce)
                .or_insert_with(|| OutboundTracker {
                    index: format!("{chain_id}-{nonce}"),
                    chain_id,
                    nonce,
                    hash_list: vec![],
                });
            if !tracker.hash_list.iter().any(|entry| entry.tx_hash == tx_hash) {
                tracker.hash_list.push(TxHashEntry {
                    tx_hash,
                    tx_signer: String::new(),
                });
            }

            format!("0x{nonce:064x}")
        })
    }

    async fn get_cctx_by_nonce(&self, _chain_id: i64, nonce: u64) -> ZetacoreResult<CrossChainTx> {
        self.core
            .lock()
            .cctxs
            .get(&nonce)
            .cloned()
            .ok_or_else(|| ZetacoreError::NotFound(format!("cctx with nonce {nonce}")))
    }

    async fn get_outbound_trackers(&self, _chain_id: i64) -> ZetacoreResult<Vec<OutboundTracker>> {
        Ok(self.core.lock().outbound_trackers.values().cloned().collect())
    }

    async fn get_inbound_trackers(&self, _chain_id: i64) -> ZetacoreResult<Vec<InboundTracker>> {
        Ok(self.core.lock().inbound_trackers.clone())
    }

    async fn get_pending_nonces(&self, _chain_id: i64) -> ZetacoreResult<PendingNonces> {
        Ok(self.core.lock().pending_nonces.clone())
    }

    async fn list_pending_cctx(&self, _chain_id: i64) -> ZetacoreResult<Vec<CrossChainTx>> {
        Ok(self.core.lock().pending_cctxs.clone())
    }

    async fn get_observer_list(&self) -> ZetacoreResult<Vec<String>> {
        Ok(self.core.lock().observers.clone())
    }

    async fn get_chain_params(&self) -> ZetacoreResult<Vec<ChainParams>> {
        Ok(self.core.lock().chain_params.clone())
    }

    async fn get_crosschain_flags(&self) -> ZetacoreResult<CrosschainFlags> {
        Ok(self.core.lock().flags.clone())
    }

    async fn get_tss_pubkey(&self) -> ZetacoreResult<PublicKey> {
        self.core
            .lock()
            .tss_pubkey
            .ok_or_else(|| ZetacoreError::NotFound("tss".to_string()))
    }

    async fn get_block_height(&self) -> ZetacoreResult<i64> {
        Ok(self.core.lock().height)
    }
}
