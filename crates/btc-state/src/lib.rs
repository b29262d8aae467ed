//! The in-memory state of the bitcoin observer and the UTXO selector.
//!
//! All mutable observer state lives in [`ObserverState`], owned by a single actor task and reached
//! through the cloneable [`StateHandle`]. The selector is a pure function over a snapshot of the
//! UTXO set.

pub mod actor;
pub mod errors;
pub mod selector;
pub mod state;

pub use actor::{StateActor, StateHandle};
pub use errors::{SelectionError, StateError};
pub use selector::{select_utxos, Selection, SelectionRequest};
pub use state::{IncludeOutcome, ObserverState};
