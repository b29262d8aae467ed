//! Errors returned by a TSS signer.

use thiserror::Error;

/// Errors returned by [`TssSigner`](crate::TssSigner) calls.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TssError {
    /// The keysign ceremony failed or timed out.
    #[error("keysign failed: {0}")]
    Keysign(String),

    /// The signer returned a different number of signatures than digests requested.
    #[error("expected {expected} signatures, got {actual}")]
    SignatureCount {
        /// Number of digests requested.
        expected: usize,

        /// Number of signatures returned.
        actual: usize,
    },

    /// A returned signature is not a valid secp256k1 signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}
