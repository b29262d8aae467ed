//! This crate contains the types and pure functions shared by the bitcoin observer and signer.
//!
//! Nothing in here performs I/O. The RPC data model lives here so that the fee engine and the
//! structural validators can be exercised against fixtures without a node.

pub mod errors;
pub mod fee;
pub mod memo;
pub mod nonce;
pub mod rpc_types;
pub mod scripts;
pub mod types;
