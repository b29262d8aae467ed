//! Local persisted state of the bitcoin observer.
//!
//! The store is a cache in front of the node and the consensus chain: it lets a restarted observer
//! resume scanning where it left off and remember which withdrawals it broadcast or found on
//! chain. [`BtcObserverDb`] is implemented by [`persistent::sqlite::SqliteDb`] and by
//! [`inmemory::BtcObserverInMemory`].

pub mod errors;
pub mod inmemory;
pub mod observer;
pub mod persistent;

pub use errors::{DbError, DbResult};
pub use observer::BtcObserverDb;
