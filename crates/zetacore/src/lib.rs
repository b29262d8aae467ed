//! Access to the consensus chain.
//!
//! The observer and the signer never talk to the consensus chain directly: they go through the
//! [`ZetacoreClient`] interface for queries and votes, and read chain params and feature flags
//! from the [`CoreContext`] snapshot, which a single [`CoreContextUpdater`] keeps fresh.

pub mod client;
pub mod context;
pub mod errors;
pub mod http;
pub mod types;

pub use client::ZetacoreClient;
pub use context::{CoreContext, CoreContextUpdater, CoreSnapshot};
pub use errors::{ZetacoreError, ZetacoreResult};
pub use http::{HttpZetacoreClient, ZetacoreConfig};
