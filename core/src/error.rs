use serde::Serialize;
use thiserror::Error;

/// Errors delivered to callers of the store.
///
/// Every fallible operation resolves to exactly one of these or to its value, never both.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A supplied pair had a missing key
    #[error("Invalid key")]
    InvalidKey,
    /// A supplied pair had a missing value or was not a two-element pair
    #[error("Invalid Value")]
    InvalidValue,
    /// The database could not be opened, or the module is shutting down
    #[error("Database Error")]
    DatabaseUnavailable,
    /// The engine failed while running a query, a transaction or a merge
    #[error("{0}")]
    OperationFailed(String),
}

impl StoreError {
    pub fn operation_failed(err: impl std::fmt::Display) -> Self { StoreError::OperationFailed(err.to_string()) }

    /// The error object handed back across the transport boundary.
    pub fn to_payload(&self) -> ErrorPayload { ErrorPayload { message: self.to_string(), key: None } }

    pub fn to_payload_for_key(&self, key: impl Into<String>) -> ErrorPayload {
        ErrorPayload { message: self.to_string(), key: Some(key.into()) }
    }
}

/// Serializable error object, `{"message": ..., "key": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ErrorPayload {
    pub fn to_json(&self) -> serde_json::Value { serde_json::json!(self) }
}

/// The worker behind a [`crate::queue::SerialQueue`] is gone.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("serial queue worker has stopped")]
pub struct QueueClosed;

impl From<QueueClosed> for StoreError {
    fn from(_: QueueClosed) -> Self { StoreError::DatabaseUnavailable }
}
