use thiserror::Error;

use crate::persistent::errors::StorageError;

/// Errors returned by a [`BtcObserverDb`](crate::BtcObserverDb).
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Storage(#[from] StorageError),
}

pub type DbResult<T> = Result<T, DbError>;
