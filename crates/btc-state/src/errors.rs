//! Errors returned by the state owner and the selector.

use bitcoin::Amount;
use thiserror::Error;

/// Errors returned by [`StateHandle`](crate::StateHandle) calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// The state actor is no longer running.
    #[error("state actor has shut down")]
    Closed,

    /// The node reported a tip lower than one already observed.
    #[error("tip decreased from {last} to {new}")]
    TipDecreased {
        /// The highest tip observed so far.
        last: u64,

        /// The newly reported tip.
        new: u64,
    },
}

/// Errors returned by [`select_utxos`](crate::select_utxos).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The output created by the previous withdrawal is not spendable yet.
    #[error("cannot find nonce-mark utxo with nonce {nonce}")]
    NonceMarkNotFound {
        /// The nonce of the withdrawal that created the missing output.
        nonce: u64,
    },

    /// The reserve cannot cover the requested amount.
    #[error("not enough btc in reserve - available : {} , tx amount : {}", available.to_btc(), requested.to_btc())]
    InsufficientFunds {
        /// The best total the selector could gather.
        available: Amount,

        /// The requested amount.
        requested: Amount,
    },
}
