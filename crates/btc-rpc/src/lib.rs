//! Access to bitcoin nodes over JSON-RPC.
//!
//! [`BitcoinRpc`] is the interface the observer and the signer use. [`BitcoinClient`] implements it
//! against a single node and [`RpcFailover`] implements it on top of an ordered list of endpoints,
//! moving to the next endpoint whenever a call fails.

pub mod client;
pub mod error;
pub mod failover;
pub mod traits;

pub use client::BitcoinClient;
pub use error::{ClientError, ClientResult};
pub use failover::RpcFailover;
pub use traits::BitcoinRpc;
