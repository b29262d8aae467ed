//! Actor owning the [`ObserverState`].

use bitcoin::Txid;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::Utxo};

use crate::{
    errors::StateError,
    state::{IncludeOutcome, ObserverState},
};

/// Message types that can be sent to a [`StateActor`].
#[derive(Debug)]
enum StateMessage {
    GetUtxos {
        respond_to: oneshot::Sender<Vec<Utxo>>,
    },

    SetUtxos {
        utxos: Vec<Utxo>,
        respond_to: oneshot::Sender<()>,
    },

    AddUtxo {
        utxo: Utxo,
        respond_to: oneshot::Sender<bool>,
    },

    GetIncludedTx {
        nonce: u64,
        respond_to: oneshot::Sender<Option<GetTransactionResult>>,
    },

    SetIncludedTx {
        nonce: u64,
        result: GetTransactionResult,
        respond_to: oneshot::Sender<IncludeOutcome>,
    },

    RemoveIncludedTx {
        nonce: u64,
        respond_to: oneshot::Sender<Option<GetTransactionResult>>,
    },

    GetBroadcastedTx {
        nonce: u64,
        respond_to: oneshot::Sender<Option<Txid>>,
    },

    SaveBroadcastedTx {
        nonce: u64,
        txid: Txid,
        respond_to: oneshot::Sender<()>,
    },

    IsTssTransaction {
        txid: Txid,
        respond_to: oneshot::Sender<bool>,
    },

    GetPendingNonce {
        respond_to: oneshot::Sender<u64>,
    },

    RaisePendingNonce {
        nonce: u64,
        respond_to: oneshot::Sender<u64>,
    },

    GetLastTip {
        respond_to: oneshot::Sender<u64>,
    },

    SetLastTip {
        tip: u64,
        respond_to: oneshot::Sender<Result<(), StateError>>,
    },

    GetLastScanned {
        respond_to: oneshot::Sender<u64>,
    },

    SetLastScanned {
        height: u64,
        respond_to: oneshot::Sender<()>,
    },
}

/// The task that owns the [`ObserverState`]. Runs until every [`StateHandle`] is dropped.
#[derive(Debug)]
pub struct StateActor {
    state: ObserverState,
    receiver: mpsc::UnboundedReceiver<StateMessage>,
}

impl StateActor {
    /// Creates the actor around `state` and the first handle to it.
    pub fn new(state: ObserverState) -> (Self, StateHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (Self { state, receiver }, StateHandle { sender })
    }

    /// Serves requests until all handles are gone.
    pub async fn run(mut self) {
        info!("observer state actor started");

        while let Some(message) = self.receiver.recv().await {
            self.handle(message);
        }

        info!("observer state actor terminated");
    }

    fn handle(&mut self, message: StateMessage) {
        let state = &mut self.state;

        // a dropped receiver means the caller gave up on the answer
        match message {
            StateMessage::GetUtxos { respond_to } => {
                let _ = respond_to.send(state.utxos().to_vec());
            }
            StateMessage::SetUtxos { utxos, respond_to } => {
                debug!(count = utxos.len(), "replacing utxo set");
                state.set_utxos(utxos);
                let _ = respond_to.send(());
            }
            StateMessage::AddUtxo { utxo, respond_to } => {
                let _ = respond_to.send(state.add_utxo(utxo));
            }
            StateMessage::GetIncludedTx { nonce, respond_to } => {
                let _ = respond_to.send(state.included_tx(nonce).cloned());
            }
            StateMessage::SetIncludedTx {
                nonce,
                result,
                respond_to,
            } => {
                let _ = respond_to.send(state.set_included_tx(nonce, result));
            }
            StateMessage::RemoveIncludedTx { nonce, respond_to } => {
                let _ = respond_to.send(state.remove_included_tx(nonce));
            }
            StateMessage::GetBroadcastedTx { nonce, respond_to } => {
                let _ = respond_to.send(state.broadcasted_tx(nonce));
            }
            StateMessage::SaveBroadcastedTx {
                nonce,
                txid,
                respond_to,
            } => {
                state.save_broadcasted_tx(nonce, txid);
                let _ = respond_to.send(());
            }
            StateMessage::IsTssTransaction { txid, respond_to } => {
                let _ = respond_to.send(state.is_tss_transaction(&txid));
            }
            StateMessage::GetPendingNonce { respond_to } => {
                let _ = respond_to.send(state.pending_nonce());
            }
            StateMessage::RaisePendingNonce { nonce, respond_to } => {
                let _ = respond_to.send(state.raise_pending_nonce(nonce));
            }
            StateMessage::GetLastTip { respond_to } => {
                let _ = respond_to.send(state.last_tip());
            }
            StateMessage::SetLastTip { tip, respond_to } => {
                let _ = respond_to.send(state.set_last_tip(tip));
            }
            StateMessage::GetLastScanned { respond_to } => {
                let _ = respond_to.send(state.last_scanned());
            }
            StateMessage::SetLastScanned { height, respond_to } => {
                state.set_last_scanned(height);
                let _ = respond_to.send(());
            }
        }
    }
}

/// Cloneable handle to the [`StateActor`].
#[derive(Debug, Clone)]
pub struct StateHandle {
    sender: mpsc::UnboundedSender<StateMessage>,
}

impl StateHandle {
    /// Spawns an actor around `state` on the current runtime and returns a handle to it.
    pub fn spawn(state: ObserverState) -> Self {
        let (actor, handle) = StateActor::new(state);
        tokio::spawn(actor.run());

        handle
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> StateMessage,
    ) -> Result<T, StateError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(make(sender))
            .map_err(|_| StateError::Closed)?;

        receiver.await.map_err(|_| StateError::Closed)
    }

    /// The spendable outputs, sorted by ascending amount.
    pub async fn utxos(&self) -> Result<Vec<Utxo>, StateError> {
        self.call(|respond_to| StateMessage::GetUtxos { respond_to })
            .await
    }

    /// Replaces the spendable outputs.
    pub async fn set_utxos(&self, utxos: Vec<Utxo>) -> Result<(), StateError> {
        self.call(|respond_to| StateMessage::SetUtxos { utxos, respond_to })
            .await
    }

    /// Adds a single output to the set, keeping it sorted. Returns whether it was added.
    pub async fn add_utxo(&self, utxo: Utxo) -> Result<bool, StateError> {
        self.call(|respond_to| StateMessage::AddUtxo { utxo, respond_to })
            .await
    }

    /// The included transaction of outbound `nonce`, if known.
    pub async fn included_tx(&self, nonce: u64) -> Result<Option<GetTransactionResult>, StateError> {
        self.call(|respond_to| StateMessage::GetIncludedTx { nonce, respond_to })
            .await
    }

    /// Records `result` as the transaction paying outbound `nonce`.
    pub async fn set_included_tx(
        &self,
        nonce: u64,
        result: GetTransactionResult,
    ) -> Result<IncludeOutcome, StateError> {
        self.call(|respond_to| StateMessage::SetIncludedTx {
            nonce,
            result,
            respond_to,
        })
        .await
    }

    /// Forgets the included transaction of outbound `nonce`.
    pub async fn remove_included_tx(
        &self,
        nonce: u64,
    ) -> Result<Option<GetTransactionResult>, StateError> {
        self.call(|respond_to| StateMessage::RemoveIncludedTx { nonce, respond_to })
            .await
    }

    /// The transaction this node broadcast for outbound `nonce`, if any.
    pub async fn broadcasted_tx(&self, nonce: u64) -> Result<Option<Txid>, StateError> {
        self.call(|respond_to| StateMessage::GetBroadcastedTx { nonce, respond_to })
            .await
    }

    /// Records the transaction this node broadcast for outbound `nonce`.
    pub async fn save_broadcasted_tx(&self, nonce: u64, txid: Txid) -> Result<(), StateError> {
        self.call(|respond_to| StateMessage::SaveBroadcastedTx {
            nonce,
            txid,
            respond_to,
        })
        .await
    }

    /// Returns whether `txid` was included or broadcast by this node.
    pub async fn is_tss_transaction(&self, txid: Txid) -> Result<bool, StateError> {
        self.call(|respond_to| StateMessage::IsTssTransaction { txid, respond_to })
            .await
    }

    /// The lowest outbound nonce not known to be included.
    pub async fn pending_nonce(&self) -> Result<u64, StateError> {
        self.call(|respond_to| StateMessage::GetPendingNonce { respond_to })
            .await
    }

    /// Raises the pending nonce to `nonce` and returns the resulting value.
    pub async fn raise_pending_nonce(&self, nonce: u64) -> Result<u64, StateError> {
        self.call(|respond_to| StateMessage::RaisePendingNonce { nonce, respond_to })
            .await
    }

    /// The highest tip observed.
    pub async fn last_tip(&self) -> Result<u64, StateError> {
        self.call(|respond_to| StateMessage::GetLastTip { respond_to })
            .await
    }

    /// Records a newly observed tip. Fails if it is lower than the last one.
    pub async fn set_last_tip(&self, tip: u64) -> Result<(), StateError> {
        self.call(|respond_to| StateMessage::SetLastTip { tip, respond_to })
            .await?
    }

    /// The last block scanned for deposits.
    pub async fn last_scanned(&self) -> Result<u64, StateError> {
        self.call(|respond_to| StateMessage::GetLastScanned { respond_to })
            .await
    }

    /// Records the last block scanned for deposits.
    pub async fn set_last_scanned(&self, height: u64) -> Result<(), StateError> {
        self.call(|respond_to| StateMessage::SetLastScanned { height, respond_to })
            .await
    }
}
