//! This crate contains the parameters that dictate the behavior of the bitcoin observer and signer.
//!
//! Some of these are consensus-relevant (they must be the same across all observers for their
//! votes to agree, e.g. the fee constants), while others are only operational (polling intervals,
//! compliance lists).

pub mod chain;
pub mod chain_params;
pub mod compliance;
pub mod constants;
pub mod errors;
pub mod fee;
pub mod prelude;

mod default;
