//! Errors for the observer parameters.

use thiserror::Error;

/// Error while creating or validating parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParamsError {
    /// The chain id does not belong to any known bitcoin network.
    #[error("unknown bitcoin chain id {0}")]
    UnknownChainId(i64),

    /// The chain id and the network do not describe the same chain.
    #[error("chain id {chain_id} does not match network {network}")]
    NetworkMismatch {
        /// The offending chain id.
        chain_id: i64,

        /// The network it was paired with.
        network: bitcoin::Network,
    },

    /// Some field in the chain params is out of range.
    #[error("invalid chain params: {0}")]
    InvalidChainParams(String),
}
