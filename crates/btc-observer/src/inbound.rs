//! Scanning of blocks for deposits to the TSS address.

use std::sync::Arc;

use bitcoin::{consensus::encode::serialize_hex, hashes::Hash, Address, Amount, Txid};
use tracing::{debug, error, info, warn};
use zeta_btc_primitives::{
    errors::ScriptError,
    fee::calc_depositor_fee,
    memo::decode_op_return_memo,
    rpc_types::{TxRawResult, Vin},
    scripts::{decode_script_p2wpkh, decode_sender_from_script},
    types::{get_satoshis, InboundEvent},
};
use zetacore_client::types::{CoinType, MsgAddBlockHeader, MsgVoteInbound, VoteResponse};

use crate::{
    block_cache::BlockAndHeader, compliance::is_event_restricted, errors::ObserverError,
    observer::BtcObserver,
};

/// Hex length of a P2WPKH locking script.
const P2WPKH_SCRIPT_HEX_LEN: usize = 44;

/// Hex prefix of a P2WPKH locking script: witness v0 and a 20-byte push.
const P2WPKH_SCRIPT_HEX_PREFIX: &str = "0014";

/// Length of the EVM address leading a deposit memo.
const MEMO_RECEIVER_LEN: usize = 20;

/// Returns whether block `height` has `confirmation_count` confirmations at `tip`.
pub fn is_block_confirmed(height: u64, tip: u64, confirmation_count: u64) -> bool {
    height + confirmation_count <= tip + 1
}

impl BtcObserver {
    /// Scans the block after the last scanned one for deposits and votes them.
    ///
    /// The scan cursor only moves once every deposit of the block has been voted, so a failed
    /// vote makes the block be scanned again on the next tick.
    pub async fn observe_inbound(&self) -> Result<(), ObserverError> {
        let flags = self.context().flags();
        if !flags.is_inbound_enabled {
            debug!("inbound observation is disabled");
            return Ok(());
        }

        let count = self.rpc().get_block_count().await?;
        if count < 0 {
            return Err(ObserverError::NegativeBlockCount(count));
        }
        if count == 0 {
            return Err(ObserverError::NodeNotEnabled);
        }
        let tip = count as u64;
        self.state().set_last_tip(tip).await?;

        let height = self.state().last_scanned().await? + 1;
        let confirmation_count = self.chain_params()?.confirmation_count;
        if !is_block_confirmed(height, tip, confirmation_count) {
            debug!(%height, %tip, "next block is not confirmed yet");
            return Ok(());
        }

        let block = self.get_block_by_number_cached(height).await?;
        if flags.is_header_verification_enabled(self.chain_id()) {
            self.relay_block_header(height, &block).await;
        }

        if block.block.tx.len() > 1 {
            let depositor_fee = calc_depositor_fee(&block.block, self.chain(), self.fee_config());
            let events = self
                .filter_and_parse_incoming_txs(&block.block.tx, height, depositor_fee)
                .await?;

            for event in &events {
                if let Err(err) = self.vote_inbound(event).await {
                    error!(%height, txid = %event.tx_hash, %err, "could not post inbound vote, block will be rescanned");
                    return Ok(());
                }
            }
        }

        self.state().set_last_scanned(height).await?;
        if let Err(err) = self.db().set_last_scanned_block(height).await {
            error!(%height, %err, "could not persist last scanned block");
        }

        Ok(())
    }

    /// Returns the block at `height` with its raw header, from the cache or the node.
    pub async fn get_block_by_number_cached(
        &self,
        height: u64,
    ) -> Result<Arc<BlockAndHeader>, ObserverError> {
        if let Some(block) = self.block_cache().get(height) {
            return Ok(block);
        }

        let hash = self.rpc().get_block_hash(height).await?;
        let header = self.rpc().get_block_header(hash).await?;
        let block = self.rpc().get_block_verbose_tx(hash).await?;

        let block = Arc::new(BlockAndHeader { header, block });
        self.block_cache().insert(height, block.clone());

        Ok(block)
    }

    async fn relay_block_header(&self, height: u64, block: &BlockAndHeader) {
        let hash = block.header.block_hash();
        let msg = MsgAddBlockHeader {
            chain_id: self.chain_id(),
            block_hash: hex::encode(hash.as_byte_array()),
            height: height as i64,
            header: serialize_hex(&block.header),
        };

        match self.zetacore().post_block_header(msg).await {
            Ok(zeta_tx_hash) => debug!(%height, %hash, %zeta_tx_hash, "relayed block header"),
            Err(err) => error!(%height, %hash, %err, "could not relay block header"),
        }
    }

    /// Collects the deposits to the TSS among `txs`, skipping the coinbase.
    ///
    /// Fails if any transaction cannot be inspected, so that the block is scanned again.
    pub async fn filter_and_parse_incoming_txs(
        &self,
        txs: &[TxRawResult],
        block_number: u64,
        depositor_fee: Amount,
    ) -> Result<Vec<InboundEvent>, ObserverError> {
        let mut events = Vec::new();
        for tx in txs.iter().skip(1) {
            if let Some(event) = self.get_btc_event(tx, block_number, depositor_fee).await? {
                info!(
                    txid = %event.tx_hash,
                    %block_number,
                    sender = %event.from_address,
                    value = %event.value,
                    "found inbound deposit"
                );
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Extracts the deposit carried by `tx`, if any.
    ///
    /// A deposit pays the TSS address in its first output, carries a memo in its second one and
    /// is worth more than the depositor fee. Transactions of any other shape are not deposits.
    pub async fn get_btc_event(
        &self,
        tx: &TxRawResult,
        block_number: u64,
        depositor_fee: Amount,
    ) -> Result<Option<InboundEvent>, ObserverError> {
        if tx.vout.len() < 2 {
            return Ok(None);
        }

        let vout0 = &tx.vout[0];
        let script = &vout0.script_pub_key.hex;
        if script.len() != P2WPKH_SCRIPT_HEX_LEN || !script.starts_with(P2WPKH_SCRIPT_HEX_PREFIX) {
            return Ok(None);
        }
        let receiver = decode_script_p2wpkh(script, self.chain().network())?;
        if &receiver != self.tss_address() {
            return Ok(None);
        }

        let amount = get_satoshis(vout0.value).map_err(ScriptError::from)?;
        if amount < depositor_fee {
            warn!(txid = %tx.txid, %amount, %depositor_fee, "deposit does not cover the depositor fee");
            return Ok(None);
        }
        let value = amount - depositor_fee;

        let memo = match decode_op_return_memo(&tx.vout[1].script_pub_key.hex) {
            Ok(Some(memo)) => memo,
            Ok(None) => {
                debug!(txid = %tx.txid, "deposit without memo");
                return Ok(None);
            }
            Err(err) => {
                warn!(txid = %tx.txid, %err, "deposit with invalid memo");
                return Ok(None);
            }
        };

        let Some(vin) = tx.vin.first() else {
            return Err(ObserverError::InvalidData(format!(
                "deposit {} has no inputs",
                tx.txid
            )));
        };
        let Some(sender) = self.sender_by_vin(vin).await? else {
            warn!(txid = %tx.txid, "deposit from an unsupported script type");
            return Ok(None);
        };

        Ok(Some(InboundEvent {
            from_address: sender.to_string(),
            to_address: receiver.to_string(),
            value,
            memo_bytes: memo,
            block_number,
            tx_hash: tx.txid,
        }))
    }

    /// Recovers the address owning the output spent by `vin`.
    async fn sender_by_vin(&self, vin: &Vin) -> Result<Option<Address>, ObserverError> {
        let Some(outpoint) = vin.outpoint() else {
            return Err(ObserverError::InvalidData(
                "deposit input has no previous outpoint".to_string(),
            ));
        };

        let prev = self.rpc().get_raw_transaction(outpoint.txid).await?;
        let Some(output) = prev.output.get(outpoint.vout as usize) else {
            return Err(ObserverError::InvalidData(format!(
                "output {} out of range for tx {} with {} outputs",
                outpoint.vout,
                outpoint.txid,
                prev.output.len()
            )));
        };

        Ok(decode_sender_from_script(&output.script_pubkey, self.chain().network())?)
    }

    /// Builds the inbound vote crediting `event`.
    ///
    /// Returns `None` when the memo names no receiver or a party is restricted.
    pub fn inbound_vote_msg(&self, event: &InboundEvent) -> Option<MsgVoteInbound> {
        if event.memo_bytes.len() < MEMO_RECEIVER_LEN {
            warn!(txid = %event.tx_hash, len = event.memo_bytes.len(), "memo too short to name a receiver");
            return None;
        }
        let receiver = format!("0x{}", hex::encode(&event.memo_bytes[..MEMO_RECEIVER_LEN]));

        if is_event_restricted(self.compliance(), event, &receiver, self.chain_id()) {
            return None;
        }

        Some(MsgVoteInbound {
            sender: event.from_address.clone(),
            sender_chain_id: self.chain_id(),
            tx_origin: event.from_address.clone(),
            receiver,
            receiver_chain_id: self.zeta_chain_id(),
            amount: event.value.to_sat(),
            message: hex::encode(&event.memo_bytes),
            inbound_hash: event.tx_hash.to_string(),
            inbound_block_height: event.block_number,
            gas_limit: 0,
            coin_type: CoinType::Gas,
            asset: String::new(),
            event_index: 0,
        })
    }

    /// Posts the inbound vote of `event`, unless it must not be credited.
    pub async fn vote_inbound(
        &self,
        event: &InboundEvent,
    ) -> Result<Option<VoteResponse>, ObserverError> {
        let Some(msg) = self.inbound_vote_msg(event) else {
            return Ok(None);
        };

        let response = self.zetacore().post_vote_inbound(msg).await?;
        if response.zeta_tx_hash.is_empty() {
            debug!(txid = %event.tx_hash, "inbound vote already finalized");
        } else {
            info!(txid = %event.tx_hash, zeta_tx_hash = %response.zeta_tx_hash, ballot = %response.ballot, "posted inbound vote");
        }

        Ok(Some(response))
    }

    /// Votes the deposits reported by inbound trackers.
    pub async fn process_inbound_trackers(&self) -> Result<(), ObserverError> {
        let trackers = self.zetacore().get_inbound_trackers(self.chain_id()).await?;
        if !trackers.is_empty() {
            info!(count = trackers.len(), "processing inbound trackers");
        }

        for tracker in trackers {
            let txid: Txid = tracker.tx_hash.parse().map_err(|err| {
                ObserverError::InvalidData(format!("inbound tracker hash {}: {err}", tracker.tx_hash))
            })?;
            self.check_receipt_for_btc_tx_hash(txid, true).await?;
        }

        Ok(())
    }

    /// Checks that `txid` is a confirmed deposit to the TSS and optionally votes it.
    pub async fn check_receipt_for_btc_tx_hash(
        &self,
        txid: Txid,
        vote: bool,
    ) -> Result<InboundEvent, ObserverError> {
        let tx = self.rpc().get_raw_transaction_verbose(txid).await?;
        let Some(hash) = tx.blockhash else {
            return Err(ObserverError::InvalidData(format!("deposit {txid} is not mined")));
        };

        let block = self.rpc().get_block_verbose_tx(hash).await?;
        if block.tx.len() <= 1 {
            return Err(ObserverError::InvalidData(format!(
                "block {hash} of deposit {txid} has no transactions besides the coinbase"
            )));
        }
        let height = u64::try_from(block.height)
            .map_err(|_| ObserverError::InvalidData(format!("block {hash} height {}", block.height)))?;

        let tip = self.rpc().get_block_count().await?.max(0) as u64;
        if !is_block_confirmed(height, tip, self.chain_params()?.confirmation_count) {
            return Err(ObserverError::BlockNotConfirmed(height));
        }

        let depositor_fee = calc_depositor_fee(&block, self.chain(), self.fee_config());
        let event = self
            .get_btc_event(&tx, height, depositor_fee)
            .await?
            .ok_or(ObserverError::NoInboundEvent(txid))?;

        if vote {
            self.vote_inbound(&event).await?;
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime, transaction::Version, BlockHash, Network, Transaction, TxOut,
    };
    use zeta_btc_db::BtcObserverDb;
    use zeta_btc_params::prelude::{BtcChain, ComplianceConfig, CrosschainFlags, FeeConfig};
    use zeta_btc_primitives::rpc_types::GetBlockVerboseTxResult;
    use zeta_btc_test_utils::prelude::*;
    use zetacore_client::types::InboundTracker;

    use super::*;
    use crate::{fixtures::Harness, observer::ObserverParams};

    const RECEIVER: [u8; 20] = [0x67; 20];

    /// Makes the node know a transaction whose first output is held by `sender`.
    fn fund_sender(harness: &Harness, sender: &Address) -> Txid {
        let prev = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![TxOut {
                value: Amount::from_sat(5_000_000),
                script_pubkey: sender.script_pubkey(),
            }],
        };
        let txid = prev.compute_txid();
        harness.rpc.node().raw_txs.insert(txid, prev);

        txid
    }

    fn deposit_tx(harness: &Harness, sats: u64, memo: &[u8]) -> TxRawResult {
        let sender = generate_p2wpkh_address(Network::Regtest);
        let funding = fund_sender(harness, &sender);

        raw_tx(
            generate_txid(),
            vec![p2wpkh_vin(funding, 0, vec![])],
            vec![
                p2wpkh_vout(0, harness.observer.tss_address(), sats),
                memo_vout(1, memo),
            ],
        )
    }

    fn add_block(harness: &Harness, height: u64, txs: Vec<TxRawResult>) -> BlockHash {
        let hash = generate_block_hash();
        let mut tx = vec![coinbase_tx(generate_txid())];
        tx.extend(txs);

        harness.rpc.add_block(
            GetBlockVerboseTxResult {
                hash,
                height: height as i64,
                tx,
                ..Default::default()
            },
            generate_header(generate_block_hash(), 1_700_000_000),
        );

        hash
    }

    #[test]
    fn test_is_block_confirmed() {
        assert!(is_block_confirmed(101, 101, 1));
        assert!(!is_block_confirmed(101, 101, 2));
        assert!(is_block_confirmed(100, 101, 2));
    }

    #[tokio::test]
    async fn test_get_btc_event_deducts_depositor_fee() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let tx = deposit_tx(&harness, 1_014_000, &RECEIVER);
        let fee = observer.fee_config().default_depositor_fee();

        let event = observer
            .get_btc_event(&tx, 150, fee)
            .await
            .expect("must inspect deposit")
            .expect("must be a deposit");

        assert_eq!(fee, Amount::from_sat(1_360));
        assert_eq!(event.value, Amount::from_sat(1_012_640), "fee must be deducted");
        assert_eq!(event.memo_bytes, RECEIVER.to_vec());
        assert_eq!(event.to_address, observer.tss_address().to_string());
        assert_eq!(event.block_number, 150);
    }

    #[tokio::test]
    async fn test_get_btc_event_ignores_other_shapes() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        let fee = observer.fee_config().default_depositor_fee();

        let mut not_tss = deposit_tx(&harness, 1_014_000, &RECEIVER);
        not_tss.vout[0] = p2wpkh_vout(0, &generate_p2wpkh_address(Network::Regtest), 1_014_000);
        assert!(observer
            .get_btc_event(&not_tss, 1, fee)
            .await
            .is_ok_and(|event| event.is_none()));

        let below_fee = deposit_tx(&harness, 1_000, &RECEIVER);
        assert!(observer
            .get_btc_event(&below_fee, 1, fee)
            .await
            .is_ok_and(|event| event.is_none()));

        let mut no_memo = deposit_tx(&harness, 1_014_000, &RECEIVER);
        no_memo.vout[1] = p2wpkh_vout(1, &generate_p2wpkh_address(Network::Regtest), 1_000);
        assert!(observer
            .get_btc_event(&no_memo, 1, fee)
            .await
            .is_ok_and(|event| event.is_none()));

        let donation = deposit_tx(&harness, 1_014_000, b"I am rich!");
        assert!(
            observer
                .get_btc_event(&donation, 1, fee)
                .await
                .is_ok_and(|event| event.is_none()),
            "donations must not be credited"
        );

        let mut no_inputs = deposit_tx(&harness, 1_014_000, &RECEIVER);
        no_inputs.vin.clear();
        assert!(observer.get_btc_event(&no_inputs, 1, fee).await.is_err());
    }

    #[tokio::test]
    async fn test_observe_inbound_votes_and_advances() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        observer
            .state()
            .set_last_scanned(100)
            .await
            .expect("must set cursor");

        let tx = deposit_tx(&harness, 1_014_000, &RECEIVER);
        let txid = tx.txid;
        add_block(&harness, 101, vec![tx]);

        observer.observe_inbound().await.expect("must observe");
        assert!(
            harness.core.core().inbound_votes.is_empty(),
            "block with one confirmation must not be scanned"
        );

        add_block(&harness, 102, vec![]);
        observer.observe_inbound().await.expect("must observe");

        let votes = harness.core.core().inbound_votes.clone();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].inbound_hash, txid.to_string());
        assert_eq!(votes[0].amount, 1_012_640);
        assert_eq!(votes[0].receiver, format!("0x{}", hex::encode(RECEIVER)));
        assert_eq!(votes[0].receiver_chain_id, 7000);
        assert_eq!(votes[0].inbound_block_height, 101);
        assert_eq!(votes[0].message, hex::encode(RECEIVER));

        assert!(observer.state().last_scanned().await.is_ok_and(|h| h == 101));
        assert!(harness
            .db
            .get_last_scanned_block()
            .await
            .is_ok_and(|h| h == Some(101)));
    }

    #[tokio::test]
    async fn test_observe_inbound_rescans_on_vote_failure() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        observer
            .state()
            .set_last_scanned(100)
            .await
            .expect("must set cursor");
        add_block(&harness, 101, vec![deposit_tx(&harness, 1_014_000, &RECEIVER)]);
        add_block(&harness, 102, vec![]);

        harness.core.core().reject_writes = true;
        observer.observe_inbound().await.expect("must observe");
        assert!(
            observer.state().last_scanned().await.is_ok_and(|h| h == 100),
            "cursor must not move past an unvoted deposit"
        );

        harness.core.core().reject_writes = false;
        observer.observe_inbound().await.expect("must observe");
        assert!(observer.state().last_scanned().await.is_ok_and(|h| h == 101));
        assert_eq!(harness.core.core().inbound_votes.len(), 1);
    }

    #[tokio::test]
    async fn test_observe_inbound_rejects_bad_tips() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;

        harness.rpc.node().block_count = Some(0);
        assert!(matches!(
            observer.observe_inbound().await,
            Err(ObserverError::NodeNotEnabled)
        ));

        harness.rpc.node().block_count = Some(-1);
        assert!(matches!(
            observer.observe_inbound().await,
            Err(ObserverError::NegativeBlockCount(-1))
        ));

        observer
            .state()
            .set_last_scanned(10)
            .await
            .expect("must set cursor");
        harness.rpc.node().block_count = Some(10);
        observer.observe_inbound().await.expect("must observe");
        harness.rpc.node().block_count = Some(9);
        assert!(
            observer.observe_inbound().await.is_err(),
            "decreasing tip must be reported"
        );
    }

    #[tokio::test]
    async fn test_observe_inbound_disabled_and_header_relay() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;
        observer
            .state()
            .set_last_scanned(100)
            .await
            .expect("must set cursor");
        add_block(&harness, 101, vec![]);
        add_block(&harness, 102, vec![]);

        harness.core.core().flags = CrosschainFlags {
            is_inbound_enabled: false,
            is_outbound_enabled: true,
            header_verification_chains: vec![18444],
        };
        harness.refresh().await;
        observer.observe_inbound().await.expect("must observe");
        assert!(observer.state().last_scanned().await.is_ok_and(|h| h == 100));

        harness.core.core().flags.is_inbound_enabled = true;
        harness.refresh().await;
        observer.observe_inbound().await.expect("must observe");

        let headers = harness.core.core().block_headers.clone();
        assert_eq!(headers.len(), 1, "header must be relayed without deposits");
        assert_eq!(headers[0].height, 101);
        assert_eq!(headers[0].header.len(), 160, "header must be 80 serialized bytes");
        assert!(observer.state().last_scanned().await.is_ok_and(|h| h == 101));
    }

    #[tokio::test]
    async fn test_restricted_deposit_is_not_voted() {
        let restricted = generate_p2wpkh_address(Network::Regtest);
        let harness = Harness::new(ObserverParams {
            chain: BtcChain::regtest(),
            fee: FeeConfig::default(),
            compliance: ComplianceConfig::new([restricted.to_string()]),
            zeta_chain_id: 7000,
        })
        .await;
        let observer = &harness.observer;

        let funding = fund_sender(&harness, &restricted);
        let tx = raw_tx(
            generate_txid(),
            vec![p2wpkh_vin(funding, 0, vec![])],
            vec![
                p2wpkh_vout(0, observer.tss_address(), 1_014_000),
                memo_vout(1, &RECEIVER),
            ],
        );
        let event = observer
            .get_btc_event(&tx, 1, Amount::from_sat(1_360))
            .await
            .expect("must inspect")
            .expect("must be a deposit");

        assert!(observer.vote_inbound(&event).await.is_ok_and(|r| r.is_none()));
        assert!(harness.core.core().inbound_votes.is_empty());
    }

    #[tokio::test]
    async fn test_check_receipt_for_btc_tx_hash() {
        let harness = Harness::regtest().await;
        let observer = &harness.observer;

        let mut tx = deposit_tx(&harness, 1_014_000, &RECEIVER);
        let txid = tx.txid;
        let hash = add_block(&harness, 50, vec![tx.clone()]);
        tx.blockhash = Some(hash);
        harness.rpc.node().verbose_txs.insert(txid, tx);

        harness.rpc.node().block_count = Some(50);
        assert!(matches!(
            observer.check_receipt_for_btc_tx_hash(txid, true).await,
            Err(ObserverError::BlockNotConfirmed(50))
        ));

        harness.rpc.node().block_count = Some(51);
        harness.core.core().inbound_trackers.push(InboundTracker {
            chain_id: 18444,
            tx_hash: txid.to_string(),
            coin_type: CoinType::Gas,
        });
        observer
            .process_inbound_trackers()
            .await
            .expect("must process trackers");

        let votes = harness.core.core().inbound_votes.clone();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].inbound_block_height, 50);
    }
}
