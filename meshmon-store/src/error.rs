//! Store errors

use thiserror::Error;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database path: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),
}
