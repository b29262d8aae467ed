//! The bitcoin withdrawal signer.
//!
//! A [`BtcSigner`] pays out the pending outbounds of one bitcoin chain. Every withdrawal spends
//! the nonce-mark of the previous one, pays the receiver and returns the change to the TSS, and is
//! signed in a single threshold ceremony. The scheduler started by [`spawn_scheduler`] decides
//! which outbounds get a keysign at each consensus height.

pub mod config;
pub mod errors;
pub mod outputs;
pub mod process;
pub mod scheduler;
pub mod sign;
pub mod signer;

#[cfg(test)]
mod fixtures;

pub use config::SignerConfig;
pub use errors::SignerError;
pub use outputs::{add_withdraw_tx_outputs, WithdrawOutputs};
pub use scheduler::{run_scheduler, spawn_scheduler};
pub use sign::{witness_sighashes, WithdrawRequest};
pub use signer::BtcSigner;
