//! An observer wired to mocks.

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use bitcoin::{secp256k1::SECP256K1, Address, PublicKey, Txid};
use zeta_btc_db::{
    inmemory::BtcObserverInMemory, persistent::errors::StorageError, BtcObserverDb, DbError,
    DbResult,
};
use zeta_btc_params::{
    constants::DEFAULT_ZETA_CHAIN_ID,
    prelude::{BtcChain, ChainParams, ComplianceConfig, FeeConfig},
};
use zeta_btc_primitives::{
    nonce::nonce_mark_amount,
    rpc_types::{GetBlockVerboseTxResult, GetTransactionResult},
    types::OutboundKey,
};
use zeta_btc_state::{ObserverState, StateHandle};
use zeta_btc_test_utils::prelude::*;
use zetacore_client::{
    types::{CctxStatus, CoinType, CrossChainTx, InboundParams, OutboundParams},
    CoreContextUpdater, CoreSnapshot,
};

use crate::observer::{BtcObserver, ObserverParams};

pub(crate) struct Harness {
    pub(crate) rpc: Arc<MockBitcoinRpc>,
    pub(crate) core: Arc<MockZetacore>,
    pub(crate) db: Arc<dyn BtcObserverDb>,
    pub(crate) updater: CoreContextUpdater<MockZetacore>,
    pub(crate) observer: BtcObserver,
}

impl Harness {
    pub(crate) async fn regtest() -> Self {
        Self::new(regtest_params()).await
    }

    /// A regtest observer whose store rejects every write.
    pub(crate) async fn regtest_failing_db() -> Self {
        Self::with_db(regtest_params(), Arc::new(FailingDb)).await
    }

    pub(crate) async fn new(params: ObserverParams) -> Self {
        Self::with_db(params, Arc::new(BtcObserverInMemory::default())).await
    }

    pub(crate) async fn with_db(params: ObserverParams, db: Arc<dyn BtcObserverDb>) -> Self {
        let rpc = Arc::new(MockBitcoinRpc::new());
        let core = Arc::new(MockZetacore::new());
        let tss_key = generate_secret_key();
        let tss_pubkey = tss_key.public_key(SECP256K1);

        {
            let mut core = core.core();
            core.chain_params = vec![ChainParams::with_defaults(params.chain.chain_id())];
            core.tss_pubkey = Some(PublicKey::new(tss_pubkey));
        }

        let (updater, context) = CoreContextUpdater::new(core.clone(), CoreSnapshot::default());
        updater.refresh().await.expect("must refresh core context");

        let state = StateHandle::spawn(ObserverState::default());
        let observer = BtcObserver::new(
            params,
            tss_pubkey,
            rpc.clone(),
            core.clone(),
            db.clone(),
            context,
            state,
        );

        Self {
            rpc,
            core,
            db,
            updater,
            observer,
        }
    }

    /// Publishes whatever the mock consensus chain currently holds.
    pub(crate) async fn refresh(&self) {
        self.updater
            .refresh()
            .await
            .expect("must refresh core context");
    }

    /// A witness as the TSS produces it: a placeholder signature and the TSS pubkey.
    pub(crate) fn tss_witness(&self) -> Vec<String> {
        vec![
            "3044022000".to_string(),
            self.observer.tss_pubkey_hex().to_string(),
        ]
    }
}

fn regtest_params() -> ObserverParams {
    ObserverParams {
        chain: BtcChain::regtest(),
        fee: FeeConfig::default(),
        compliance: ComplianceConfig::default(),
        zeta_chain_id: DEFAULT_ZETA_CHAIN_ID,
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

/// A gas withdrawal of `sats` to `receiver` paid by outbound `nonce`.
pub(crate) fn withdrawal_cctx(chain_id: i64, nonce: u64, receiver: &str, sats: u64) -> CrossChainTx {
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
            receiver_chain_id: chain_id,
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

impl Harness {
    /// Makes the node know a well-formed outbound paying `cctx` with the given confirmations.
    ///
    /// The outbound spends `prev_txid:0` as its nonce-mark when given.
    pub(crate) fn stage_outbound(
        &self,
        cctx: &CrossChainTx,
        prev_txid: Option<Txid>,
        confirmations: i64,
    ) -> Txid {
        let params = cctx
            .current_outbound_params()
            .expect("cctx must have outbound params");
        let tss = self.observer.tss_address().clone();
        let receiver = Address::from_str(&params.receiver)
            .expect("receiver must parse")
            .assume_checked();

        let mut vin = vec![p2wpkh_vin(generate_txid(), 1, self.tss_witness())];
        if let Some(prev_txid) = prev_txid {
            vin.insert(0, p2wpkh_vin(prev_txid, 0, self.tss_witness()));
        }
        let vout = vec![
            p2wpkh_vout(0, &tss, nonce_mark_amount(params.tss_nonce).to_sat()),
            p2wpkh_vout(1, &receiver, params.amount),
            p2wpkh_vout(2, &tss, 12_345),
        ];

        let txid = generate_txid();
        let tx = raw_tx(txid, vin, vout);
        let result = generate_tx_result(txid, confirmations);

        let mut node = self.rpc.node();
        match result.blockhash {
            Some(hash) => {
                node.blocks.insert(
                    hash,
                    GetBlockVerboseTxResult {
                        hash,
                        tx: vec![coinbase_tx(generate_txid()), tx],
                        ..Default::default()
                    },
                );
            }
            None => {
                node.verbose_txs.insert(txid, tx);
            }
        }
        node.wallet_txs.insert(txid, result);

        txid
    }
}
