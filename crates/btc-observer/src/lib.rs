//! The bitcoin chain observer.
//!
//! A [`BtcObserver`] watches one bitcoin chain for one TSS key. It votes deposits to the TSS
//! address, tracks which transactions paid the outbounds signed by the TSS, keeps the TSS UTXO
//! set fresh and reports the network fee rate. Each concern runs as a periodic task of the
//! supervised set started by [`spawn_observer_tasks`].

pub mod block_cache;
pub mod compliance;
pub mod errors;
pub mod gas;
pub mod inbound;
pub mod observer;
pub mod outbound;
pub mod rpc_status;
pub mod tasks;
pub mod utxos;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use errors::{ObserverError, ValidationError};
pub use observer::{load_state, BtcObserver, ObserverParams};
pub use outbound::OutboundStatus;
pub use tasks::{spawn_observer_tasks, ObserverTask};
