//! Persistent database errors.

use thiserror::Error;

/// Errors that can occur when interacting with the database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An error occurred when interacting with the SQLite database.
    #[error("sqlite: {0}")]
    Driver(#[from] sqlx::Error),

    /// An error occurred while running the migrations.
    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded.
    #[error("data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Returns whether the database was busy or locked by another connection, in which case the
    /// operation may succeed if retried.
    pub fn is_busy(&self) -> bool {
        // SQLITE_BUSY and SQLITE_LOCKED, possibly extended
        const BUSY_CODES: [i64; 2] = [5, 6];

        match self {
            Self::Driver(sqlx::Error::Database(err)) => err
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                .is_some_and(|code| BUSY_CODES.contains(&(code & 0xff))),
            Self::Driver(sqlx::Error::PoolTimedOut) => true,
            _ => false,
        }
    }
}
