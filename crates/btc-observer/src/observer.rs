//! The chain observer of one bitcoin chain and one TSS key.

use std::sync::Arc;

use bitcoin::{secp256k1::PublicKey, Address};
use tracing::{info, warn};
use zeta_btc_db::BtcObserverDb;
use zeta_btc_params::{
    constants::{BTC_BLOCKS_PER_DAY, MAX_HEIGHT_DIFF},
    prelude::{BtcChain, ChainParams, ComplianceConfig, FeeConfig},
};
use zeta_btc_primitives::types::OutboundKey;
use zeta_btc_rpc::BitcoinRpc;
use zeta_btc_state::{IncludeOutcome, ObserverState, StateHandle};
use zeta_tss::{p2wpkh_address, pubkey_hex};
use zetacore_client::{CoreContext, ZetacoreClient};

use crate::{block_cache::BlockCache, errors::ObserverError};

/// Static parameters of an observer, computed once at startup.
#[derive(Debug, Clone)]
pub struct ObserverParams {
    /// The observed chain.
    pub chain: BtcChain,

    /// The fee model.
    pub fee: FeeConfig,

    /// Addresses that are never paid nor credited.
    pub compliance: ComplianceConfig,

    /// Chain id of the consensus chain, credited by inbound votes.
    pub zeta_chain_id: i64,
}

/// Watches a bitcoin chain on behalf of the TSS: deposits to the TSS address, withdrawals paid by
/// it, its spendable outputs and the network fee rate.
///
/// Mutable state lives behind the [`StateHandle`]; the observer itself is shared read-only
/// between the periodic tasks and the signer.
#[derive(Debug)]
pub struct BtcObserver {
    params: ObserverParams,
    tss_pubkey: PublicKey,
    tss_pubkey_hex: String,
    tss_address: Address,
    rpc: Arc<dyn BitcoinRpc>,
    zetacore: Arc<dyn ZetacoreClient>,
    db: Arc<dyn BtcObserverDb>,
    context: CoreContext,
    state: StateHandle,
    block_cache: BlockCache,
}

impl BtcObserver {
    /// Creates an observer on top of an already loaded `state`.
    pub fn new(
        params: ObserverParams,
        tss_pubkey: PublicKey,
        rpc: Arc<dyn BitcoinRpc>,
        zetacore: Arc<dyn ZetacoreClient>,
        db: Arc<dyn BtcObserverDb>,
        context: CoreContext,
        state: StateHandle,
    ) -> Self {
        let tss_address = p2wpkh_address(&tss_pubkey, params.chain.network());

        Self {
            tss_pubkey_hex: pubkey_hex(&tss_pubkey),
            tss_address,
            params,
            tss_pubkey,
            rpc,
            zetacore,
            db,
            context,
            state,
            block_cache: BlockCache::new(BTC_BLOCKS_PER_DAY),
        }
    }

    /// The observed chain.
    pub fn chain(&self) -> &BtcChain {
        &self.params.chain
    }

    /// Chain id of the observed chain.
    pub fn chain_id(&self) -> i64 {
        self.params.chain.chain_id()
    }

    /// Chain id of the consensus chain, the receiver of inbound votes.
    pub fn zeta_chain_id(&self) -> i64 {
        self.params.zeta_chain_id
    }

    /// Fee model constants.
    pub fn fee_config(&self) -> &FeeConfig {
        &self.params.fee
    }

    /// The restricted address list.
    pub fn compliance(&self) -> &ComplianceConfig {
        &self.params.compliance
    }

    /// The TSS public key.
    pub fn tss_pubkey(&self) -> PublicKey {
        self.tss_pubkey
    }

    /// The compressed TSS public key, hex encoded, as it appears in witnesses.
    pub fn tss_pubkey_hex(&self) -> &str {
        &self.tss_pubkey_hex
    }

    /// The P2WPKH address of the TSS key on the observed network.
    pub fn tss_address(&self) -> &Address {
        &self.tss_address
    }

    /// The bitcoin node.
    pub fn rpc(&self) -> &dyn BitcoinRpc {
        self.rpc.as_ref()
    }

    /// The consensus chain client.
    pub fn zetacore(&self) -> &dyn ZetacoreClient {
        self.zetacore.as_ref()
    }

    /// The local store.
    pub fn db(&self) -> &dyn BtcObserverDb {
        self.db.as_ref()
    }

    /// The latest chain params, flags and TSS key published by the consensus chain.
    pub fn context(&self) -> &CoreContext {
        &self.context
    }

    /// The in-memory observer state.
    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub(crate) fn block_cache(&self) -> &BlockCache {
        &self.block_cache
    }

    /// The persistence key of outbound `nonce`.
    pub fn outbound_key(&self, nonce: u64) -> OutboundKey {
        OutboundKey::new(self.chain_id(), self.tss_address.to_string(), nonce)
    }

    /// The latest chain params published by the consensus chain.
    pub fn chain_params(&self) -> Result<ChainParams, ObserverError> {
        self.context
            .chain_params(self.chain_id())
            .ok_or(ObserverError::MissingChainParams(self.chain_id()))
    }

    /// Makes the node track the TSS address so that `listunspent` and `gettransaction` see its
    /// outputs.
    pub async fn import_tss_address(&self) -> Result<(), ObserverError> {
        self.rpc.import_address(self.tss_address.to_string()).await?;
        info!(tss_address = %self.tss_address, "imported tss address into node wallet");

        Ok(())
    }
}

/// Rebuilds the observer state from the store and the node.
///
/// Only records of `chain` and `tss_address` are restored. Included transactions also restore the
/// pending nonce.
pub async fn load_state(
    chain: &BtcChain,
    tss_address: &Address,
    rpc: &dyn BitcoinRpc,
    db: &dyn BtcObserverDb,
) -> Result<ObserverState, ObserverError> {
    let mut state = ObserverState::default();
    let tss_address = tss_address.to_string();
    let ours =
        |key: &OutboundKey| key.chain_id == chain.chain_id() && key.tss_address == tss_address;

    let broadcasted = db.get_broadcasted_txs().await?;
    let mut restored_broadcasts = 0;
    for (key, txid) in broadcasted.into_iter().filter(|(key, _)| ours(key)) {
        state.save_broadcasted_tx(key.nonce, txid);
        restored_broadcasts += 1;
    }

    let mut included = db.get_included_txs().await?;
    included.retain(|(key, _)| ours(key));
    included.sort_by_key(|(key, _)| key.nonce);
    let restored_inclusions = included.len();
    for (key, result) in included {
        if let IncludeOutcome::Duplicate { existing } = state.set_included_tx(key.nonce, result) {
            warn!(nonce = key.nonce, %existing, "conflicting included txs in store");
        }
    }

    let last_scanned = load_last_scanned(chain, rpc, db).await?;
    state.set_last_scanned(last_scanned);

    info!(
        chain = chain.name(),
        %restored_broadcasts,
        %restored_inclusions,
        pending_nonce = state.pending_nonce(),
        %last_scanned,
        "loaded observer state"
    );

    Ok(state)
}

/// Decides where block scanning resumes.
///
/// The persisted height is used unless it is missing or lags the tip by more than
/// [`MAX_HEIGHT_DIFF`], in which case scanning starts at the tip. Regtest always starts at its
/// bootstrap height.
pub async fn load_last_scanned(
    chain: &BtcChain,
    rpc: &dyn BitcoinRpc,
    db: &dyn BtcObserverDb,
) -> Result<u64, ObserverError> {
    if let Some(height) = chain.bootstrap_scan_height() {
        return Ok(height);
    }

    let count = rpc.get_block_count().await?;
    let tip = u64::try_from(count).map_err(|_| ObserverError::NegativeBlockCount(count))?;

    let last_scanned = match db.get_last_scanned_block().await? {
        None => {
            info!(%tip, "no last scanned block persisted, starting at tip");
            tip
        }
        Some(persisted) if tip.saturating_sub(persisted) > MAX_HEIGHT_DIFF => {
            warn!(%persisted, %tip, "last scanned block is too far behind, starting at tip");
            tip
        }
        Some(persisted) => persisted,
    };

    Ok(last_scanned)
}
