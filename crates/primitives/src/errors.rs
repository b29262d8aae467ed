//! Error types for the codec and the fee engine.

use bitcoin::Amount;
use thiserror::Error;

/// Errors raised while decoding an output script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script is not valid hex.
    #[error("error decoding script {0}")]
    InvalidHex(String),

    /// The script has the wrong length for the expected type.
    #[error("invalid {kind} script length: {len}")]
    InvalidLength {
        /// The expected script type.
        kind: &'static str,

        /// The actual length of the script.
        len: usize,
    },

    /// The script has the right length but does not match the expected template.
    #[error("invalid {kind} script: {script}")]
    InvalidTemplate {
        /// The expected script type.
        kind: &'static str,

        /// The script, in hex.
        script: String,
    },

    /// The address could not be derived from a well-formed script.
    #[error("error getting address from {kind} script: {reason}")]
    Address {
        /// The expected script type.
        kind: &'static str,

        /// The reason the address could not be derived.
        reason: String,
    },

    /// The address type is not one of the supported output types.
    #[error("unsupported address type: {0}")]
    UnsupportedAddress(String),

    /// The amount could not be converted to satoshis.
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),
}

/// Errors raised while decoding an OP_RETURN memo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError {
    /// The push-length byte is not valid hex.
    #[error("error decoding memo size: {0}")]
    InvalidSize(String),

    /// The push-length byte does not match the number of remaining bytes.
    #[error("memo size mismatch: {declared} != {actual}")]
    SizeMismatch {
        /// The length declared in the script.
        declared: usize,

        /// The number of bytes actually following.
        actual: usize,
    },

    /// The memo is not valid hex.
    #[error("error hex decoding memo: {0}")]
    InvalidHex(String),

    /// The memo is the donation message; the deposit must not be credited.
    #[error("donation tx")]
    Donation,
}

/// Errors raised when converting a BTC value into satoshis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// NaN or infinite.
    #[error("invalid bitcoin amount")]
    NotFinite,

    /// Above the 21 million BTC supply cap.
    #[error("exceeded max bitcoin amount")]
    TooLarge,

    /// Negative.
    #[error("cannot be less than zero")]
    Negative,
}

/// Errors raised by the fee engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    /// The block has no transaction at all.
    #[error("block has no transactions")]
    NoTransactions,

    /// The block weight is below the witness scale factor.
    #[error("block weight {0} too small")]
    WeightTooSmall(u64),

    /// The block is lighter than its own coinbase.
    #[error("block weight {block} less than coinbase tx weight {coinbase}")]
    WeightBelowCoinbase {
        /// Weight of the block.
        block: u64,

        /// Weight of the coinbase transaction.
        coinbase: u64,
    },

    /// The block height is outside `(0, i32::MAX]`.
    #[error("invalid block height {0}")]
    InvalidHeight(i64),

    /// The first transaction could not be decoded.
    #[error("failed to decode coinbase tx {0}")]
    CoinbaseDecode(String),

    /// The first transaction is not a coinbase.
    #[error("first tx {0} is not coinbase tx")]
    NotCoinbase(String),

    /// The coinbase pays out less than the block subsidy.
    #[error("miner earned {earned}, less than subsidy {subsidy}")]
    BelowSubsidy {
        /// Sum of the coinbase outputs.
        earned: Amount,

        /// Block subsidy at this height.
        subsidy: Amount,
    },

    /// The non-coinbase transactions weigh nothing.
    #[error("non-coinbase transactions have zero virtual size")]
    ZeroVirtualSize,

    /// The output size of an address type is unknown.
    #[error(transparent)]
    Script(#[from] ScriptError),
}
