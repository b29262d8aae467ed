//! This crate provides test-utilities shared by the observer, the signer and the storage layer.
//!
//! Generators produce random but well-formed chain values. The mocks implement the node and
//! consensus chain interfaces on top of plain in-memory maps that tests fill up front and inspect
//! afterwards.

pub mod bitcoin;
pub mod bitcoin_rpc;
pub mod prelude;
pub mod tx;
pub mod zetacore;
