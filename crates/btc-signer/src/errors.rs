//! Error types for the withdrawal signer.

use thiserror::Error;
use zeta_btc_db::DbError;
use zeta_btc_observer::ObserverError;
use zeta_btc_primitives::errors::{FeeError, ScriptError};
use zeta_btc_rpc::ClientError;
use zeta_btc_state::{SelectionError, StateError};
use zeta_tss::TssError;
use zetacore_client::{types::CoinType, ZetacoreError};

/// Errors raised while building, signing or broadcasting a withdrawal.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Errors from the chain observer.
    #[error("observer: {0}")]
    Observer(#[from] ObserverError),

    /// No subset of the UTXO set can pay for the withdrawal.
    #[error("utxo selection: {0}")]
    Selection(#[from] SelectionError),

    /// Errors from the bitcoin node.
    #[error("bitcoin rpc: {0}")]
    Rpc(#[from] ClientError),

    /// Errors from the consensus chain.
    #[error("zetacore: {0}")]
    Zetacore(#[from] ZetacoreError),

    /// Errors from the threshold signer.
    #[error("tss: {0}")]
    Tss(#[from] TssError),

    /// Errors from the fee engine.
    #[error("fee: {0}")]
    Fee(#[from] FeeError),

    /// The receiver address cannot be paid.
    #[error("script: {0}")]
    Script(#[from] ScriptError),

    /// Errors from the state owner.
    #[error("state: {0}")]
    State(#[from] StateError),

    /// Errors from the local store.
    #[error("database: {0}")]
    Db(#[from] DbError),

    /// The signature digest of an input could not be computed.
    #[error("sighash of input {index}: {reason}")]
    Sighash {
        /// Input index.
        index: usize,

        /// Why the digest could not be computed.
        reason: String,
    },

    /// The selected inputs do not cover the payment, the fees and the nonce-mark.
    #[error("remainder value is negative: {0}")]
    NegativeRemainder(i64),

    /// The gas price of the outbound is not a non-negative integer, or overflows.
    #[error("cannot convert gas price {0}")]
    InvalidGasPrice(String),

    /// The fee of the withdrawal overflows.
    #[error("fee of {size} vB at {gas_price} sat/vB overflows")]
    FeeOverflow {
        /// Size of the withdrawal.
        size: u64,

        /// Fee rate.
        gas_price: u64,
    },

    /// Only the gas coin of the chain can be withdrawn.
    #[error("can only send btc to a btc network, got {0:?}")]
    UnsupportedCoin(CoinType),

    /// The cctx has no outbound leg.
    #[error("cctx {0} has no outbound params")]
    MissingOutboundParams(String),

    /// The threshold signer returned the wrong number of signatures.
    #[error("expected {expected} signatures, got {actual}")]
    SignatureCount {
        /// Number of digests sent.
        expected: usize,

        /// Number of signatures returned.
        actual: usize,
    },

    /// Every broadcast attempt failed.
    #[error("broadcast failed after {attempts} attempts: {source}")]
    BroadcastFailed {
        /// Number of attempts made.
        attempts: usize,

        /// The error of the last attempt.
        source: ClientError,
    },

    /// A pending cctx targets another chain.
    #[error("cctx {index} targets chain {actual}, expected {expected}")]
    ChainMismatch {
        /// The cctx.
        index: String,

        /// The chain this signer serves.
        expected: i64,

        /// The chain the cctx targets.
        actual: i64,
    },

    /// The threshold signer holds another key than the observed TSS address.
    #[error("tss signer pubkey {actual} does not match observer tss pubkey {expected}")]
    TssKeyMismatch {
        /// The observer's TSS public key, hex encoded.
        expected: String,

        /// The signer's public key, hex encoded.
        actual: String,
    },

    /// The consensus chain reported a negative height.
    #[error("zeta height {0} is negative")]
    NegativeZetaHeight(i64),
}
