//! A signer wired to mocks.

use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::{Address, Amount, Network, PublicKey, Txid};
use zeta_btc_db::{
    inmemory::BtcObserverInMemory, persistent::errors::StorageError, BtcObserverDb, DbError,
    DbResult,
};
use zeta_btc_observer::{BtcObserver, ObserverParams};
use zeta_btc_params::{
    constants::DEFAULT_ZETA_CHAIN_ID,
    prelude::{BtcChain, ChainParams, ComplianceConfig, FeeConfig},
};
use zeta_btc_primitives::{
    rpc_types::{GetTransactionResult, ListUnspentResult},
    types::OutboundKey,
};
use zeta_btc_state::{ObserverState, StateHandle};
use zeta_btc_test_utils::prelude::*;
use zeta_tss::{LocalTssSigner, TssSigner};
use zetacore_client::{
    types::{CctxStatus, CoinType, CrossChainTx, InboundParams, OutboundParams},
    CoreContextUpdater, CoreSnapshot,
};

use crate::{config::SignerConfig, signer::BtcSigner};

pub(crate) struct SignerHarness {
    pub(crate) rpc: Arc<MockBitcoinRpc>,
    pub(crate) core: Arc<MockZetacore>,
    pub(crate) db: Arc<dyn BtcObserverDb>,
    pub(crate) updater: CoreContextUpdater<MockZetacore>,
    pub(crate) tss: Arc<LocalTssSigner>,
    pub(crate) observer: Arc<BtcObserver>,
    pub(crate) signer: Arc<BtcSigner>,
}

impl SignerHarness {
    pub(crate) async fn regtest() -> Self {
        Self::new(ComplianceConfig::default()).await
    }

    pub(crate) async fn new(compliance: ComplianceConfig) -> Self {
        Self::with_db(compliance, Arc::new(BtcObserverInMemory::default())).await
    }

    pub(crate) async fn with_db(compliance: ComplianceConfig, db: Arc<dyn BtcObserverDb>) -> Self {
        let chain = BtcChain::regtest();
        let rpc = Arc::new(MockBitcoinRpc::new());
        let core = Arc::new(MockZetacore::new());
        let tss = Arc::new(LocalTssSigner::new(generate_secret_key()));
        let tss_pubkey = tss.pubkey();

        {
            let mut core = core.core();
            core.chain_params = vec![ChainParams::with_defaults(chain.chain_id())];
            core.tss_pubkey = Some(PublicKey::new(tss_pubkey));
            core.height = 100;
        }
        rpc.node().block_count = Some(200);

        let (updater, context) = CoreContextUpdater::new(core.clone(), CoreSnapshot::default());
        updater.refresh().await.expect("must refresh core context");

        let observer = BtcObserver::new(
            ObserverParams {
                chain,
                fee: FeeConfig::default(),
                compliance,
                zeta_chain_id: DEFAULT_ZETA_CHAIN_ID,
            },
            tss_pubkey,
            rpc.clone(),
            core.clone(),
            db.clone(),
            context,
            StateHandle::spawn(ObserverState::default()),
        );
        let config = SignerConfig {
            max_broadcast_jitter_ms: 0,
            schedule_tick_ms: 50,
            ..SignerConfig::default()
        };
        let observer = Arc::new(observer);
        let signer = BtcSigner::new(observer.clone(), tss.clone(), config)
            .expect("tss key must match observer");

        Self {
            rpc,
            core,
            db,
            updater,
            tss,
            observer,
            signer: Arc::new(signer),
        }
    }

    /// Publishes whatever the mock consensus chain currently holds.
    pub(crate) async fn refresh(&self) {
        self.updater
            .refresh()
            .await
            .expect("must refresh core context");
    }

    pub(crate) fn tss_address(&self) -> Address {
        self.signer.observer().tss_address().clone()
    }

    /// Makes the node list an output of `sats` held by the TSS.
    pub(crate) fn fund(&self, txid: Txid, vout: u32, sats: u64, confirmations: i64) {
        let tss = self.tss_address();
        self.rpc.node().utxos.push(ListUnspentResult {
            txid,
            vout,
            address: tss.to_string(),
            script_pub_key: hex::encode(tss.script_pubkey().as_bytes()),
            amount: Amount::from_sat(sats).to_btc(),
            confirmations,
            spendable: true,
        });
    }
}

/// A store that reads empty and rejects every write.
#[derive(Debug, Default)]
pub(crate) struct FailingDb;

fn disk_full() -> DbError {
    StorageError::InvalidData("disk full".to_string()).into()
}

#[async_trait]
impl BtcObserverDb for FailingDb {
    async fn get_last_scanned_block(&self) -> DbResult<Option<u64>> {
        Ok(None)
    }

    async fn set_last_scanned_block(&self, _height: u64) -> DbResult<()> {
        Err(disk_full())
    }

    async fn get_broadcasted_txs(&self) -> DbResult<Vec<(OutboundKey, Txid)>> {
        Ok(Vec::new())
    }

    async fn save_broadcasted_tx(&self, _key: &OutboundKey, _txid: Txid) -> DbResult<()> {
        Err(disk_full())
    }

    async fn get_included_txs(&self) -> DbResult<Vec<(OutboundKey, GetTransactionResult)>> {
        Ok(Vec::new())
    }

    async fn save_included_tx(
        &self,
        _key: &OutboundKey,
        _result: &GetTransactionResult,
    ) -> DbResult<()> {
        Err(disk_full())
    }

    async fn delete_included_tx(&self, _key: &OutboundKey) -> DbResult<()> {
        Err(disk_full())
    }
}

/// A regtest receiver.
pub(crate) fn receiver() -> Address {
    generate_p2wpkh_address(Network::Regtest)
}

/// A gas withdrawal of `sats` to `receiver` paid by outbound `nonce`, at 10 sat/vB.
pub(crate) fn withdrawal_cctx(nonce: u64, receiver: &Address, sats: u64) -> CrossChainTx {
    CrossChainTx {
        index: format!("0x{nonce:064x}"),
        inbound_params: InboundParams {
            sender: "0x8aa0e5dc1f6d3a1dd9e6b2b1b64c5e82e6b1bba1".to_string(),
            sender_chain_id: 7001,
            coin_type: CoinType::Gas,
            amount: sats,
            ..Default::default()
        },
        outbound_params: vec![OutboundParams {
            receiver: receiver.to_string(),
            receiver_chain_id: BtcChain::regtest().chain_id(),
            coin_type: CoinType::Gas,
            amount: sats,
            tss_nonce: nonce,
            gas_limit: 254,
            gas_price: "10".to_string(),
            ..Default::default()
        }],
        status: CctxStatus::PendingOutbound,
        ..Default::default()
    }
}
