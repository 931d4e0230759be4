//! Error types for the SQLite backend

use statex_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SqliteError> for StoreError {
    fn from(err: SqliteError) -> Self {
        match err {
            // callers see the engine's message verbatim
            SqliteError::Rusqlite(e) => StoreError::operation_failed(e),
            other => StoreError::operation_failed(other),
        }
    }
}

/// Opening the database failed on every permitted attempt.
#[derive(Debug, Error)]
#[error("unable to open database {path} after {attempts} attempts: {source}")]
pub struct SupplierError {
    pub path: String,
    pub attempts: u32,
    #[source]
    pub source: SqliteError,
}
