//! Errors returned by bitcoin RPC clients.

use bitcoind_async_client::error::ClientError as BitcoindError;
use thiserror::Error;

/// Errors returned by a [`BitcoinRpc`](crate::BitcoinRpc) call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never reached the node or the response never came back.
    #[error("transport: {0}")]
    Transport(String),

    /// The node answered with an unexpected HTTP status and no JSON-RPC body.
    #[error("http status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,

        /// The response body.
        body: String,
    },

    /// The node rejected the call.
    #[error("rpc error {code}: {message}")]
    Server {
        /// The JSON-RPC error code.
        code: i64,

        /// The error message.
        message: String,
    },

    /// A typed call through the bitcoind client failed, after its own retries.
    #[error("bitcoind: {0}")]
    Bitcoind(#[from] BitcoindError),

    /// The response could not be decoded.
    #[error("parse: {0}")]
    Parse(String),

    /// The failover proxy was built without any endpoint.
    #[error("no rpc endpoint configured")]
    NoEndpoints,
}

impl ClientError {
    /// Returns whether the call may succeed if simply retried against the same node.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result of a [`BitcoinRpc`](crate::BitcoinRpc) call.
pub type ClientResult<T> = Result<T, ClientError>;
