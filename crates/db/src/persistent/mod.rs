//! SQLite implementation of the persistent storage layer.

pub mod config;
pub mod constants;
pub mod errors;
pub mod sqlite;
