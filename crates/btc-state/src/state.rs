//! The observer state and its transitions.

use std::collections::{BTreeMap, HashSet};

use bitcoin::Txid;
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::Utxo};

use crate::errors::StateError;

/// What [`ObserverState::set_included_tx`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeOutcome {
    /// First inclusion recorded for the nonce.
    New,

    /// The same transaction was seen again; its result was refreshed.
    Refreshed,

    /// A different transaction was already recorded for the nonce. Both are dropped.
    Duplicate {
        /// The transaction recorded before.
        existing: Txid,
    },
}

/// All mutable observer state for one chain and one TSS address.
#[derive(Debug, Clone, Default)]
pub struct ObserverState {
    utxos: Vec<Utxo>,
    included_txs: BTreeMap<u64, GetTransactionResult>,
    included_hashes: HashSet<Txid>,
    broadcasted_txs: BTreeMap<u64, Txid>,
    pending_nonce: u64,
    last_tip: u64,
    last_scanned: u64,
}

impl ObserverState {
    /// The spendable outputs, sorted by ascending amount.
    pub fn utxos(&self) -> &[Utxo] {
        &self.utxos
    }

    /// Replaces the spendable outputs.
    pub fn set_utxos(&mut self, utxos: Vec<Utxo>) {
        self.utxos = utxos;
    }

    /// Adds `utxo` at its sorted position unless an output with the same outpoint is present.
    ///
    /// Returns whether it was added.
    pub fn add_utxo(&mut self, utxo: Utxo) -> bool {
        if self.utxos.iter().any(|u| u.outpoint() == utxo.outpoint()) {
            return false;
        }

        let key = |u: &Utxo| (u.amount, u.txid, u.vout);
        let at = self.utxos.partition_point(|u| key(u) < key(&utxo));
        self.utxos.insert(at, utxo);

        true
    }

    /// The included transaction of outbound `nonce`, if known.
    pub fn included_tx(&self, nonce: u64) -> Option<&GetTransactionResult> {
        self.included_txs.get(&nonce)
    }

    /// Records `result` as the transaction paying outbound `nonce`.
    pub fn set_included_tx(&mut self, nonce: u64, result: GetTransactionResult) -> IncludeOutcome {
        let txid = result.txid;

        match self.included_txs.get(&nonce).map(|existing| existing.txid) {
            None => {
                self.included_hashes.insert(txid);
                self.included_txs.insert(nonce, result);
                if nonce >= self.pending_nonce {
                    self.pending_nonce = nonce + 1;
                }

                IncludeOutcome::New
            }
            Some(existing) if existing == txid => {
                self.included_txs.insert(nonce, result);

                IncludeOutcome::Refreshed
            }
            Some(existing) => {
                self.included_txs.remove(&nonce);
                self.included_hashes.remove(&existing);

                IncludeOutcome::Duplicate { existing }
            }
        }
    }

    /// Forgets the included transaction of outbound `nonce`.
    pub fn remove_included_tx(&mut self, nonce: u64) -> Option<GetTransactionResult> {
        let removed = self.included_txs.remove(&nonce)?;
        self.included_hashes.remove(&removed.txid);

        Some(removed)
    }

    /// The transaction this node broadcast for outbound `nonce`, if any.
    pub fn broadcasted_tx(&self, nonce: u64) -> Option<Txid> {
        self.broadcasted_txs.get(&nonce).copied()
    }

    /// Records the transaction this node broadcast for outbound `nonce`.
    pub fn save_broadcasted_tx(&mut self, nonce: u64, txid: Txid) {
        self.broadcasted_txs.insert(nonce, txid);
    }

    /// Returns whether `txid` was signed by the TSS: included or broadcast by this node.
    pub fn is_tss_transaction(&self, txid: &Txid) -> bool {
        self.included_hashes.contains(txid) || self.broadcasted_txs.values().any(|t| t == txid)
    }

    /// The lowest outbound nonce not known to be included.
    pub fn pending_nonce(&self) -> u64 {
        self.pending_nonce
    }

    /// Raises the pending nonce to `nonce`. Lower values are ignored.
    pub fn raise_pending_nonce(&mut self, nonce: u64) -> u64 {
        self.pending_nonce = self.pending_nonce.max(nonce);
        self.pending_nonce
    }

    /// The highest tip observed.
    pub fn last_tip(&self) -> u64 {
        self.last_tip
    }

    /// Records a newly observed tip, which must not be lower than the last one.
    pub fn set_last_tip(&mut self, tip: u64) -> Result<(), StateError> {
        if tip < self.last_tip {
            return Err(StateError::TipDecreased {
                last: self.last_tip,
                new: tip,
            });
        }

        self.last_tip = tip;
        Ok(())
    }

    /// The last block scanned for deposits.
    pub fn last_scanned(&self) -> u64 {
        self.last_scanned
    }

    /// Records the last block scanned for deposits.
    pub fn set_last_scanned(&mut self, height: u64) {
        self.last_scanned = height;
    }
}
