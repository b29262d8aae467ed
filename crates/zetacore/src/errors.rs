//! Errors returned by the consensus chain client.

use thiserror::Error;

/// Errors returned by a [`ZetacoreClient`](crate::ZetacoreClient) call.
#[derive(Debug, Clone, Error)]
pub enum ZetacoreError {
    /// The request never reached the endpoint or the response never came back.
    #[error("transport: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("http status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,

        /// The response body.
        body: String,
    },

    /// The response could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// The queried record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The broadcaster refused the message.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ZetacoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ZetacoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result of a [`ZetacoreClient`](crate::ZetacoreClient) call.
pub type ZetacoreResult<T> = Result<T, ZetacoreError>;
