//! Error types for all rowhouse operations.

use std::time::Duration;

use thiserror::Error;

use crate::types::AttrType;

/// Top-level error type for rowhouse operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    /// Whether the operation is safe to retry. Retrying is always a caller
    /// decision; nothing in the client retries internally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Codec and write-validation failures. Not retriable without fixing the
/// caller's data.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    #[error("type mismatch for attribute '{name}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: AttrType,
        actual: AttrType,
    },

    #[error("key attribute '{0}' must be a non-empty string")]
    EmptyKey(String),

    #[error("entity exceeds maximum size of {max} bytes (got {actual})")]
    EntityTooLarge { max: usize, actual: usize },

    #[error("record cannot be mapped to an attribute set: {0}")]
    InvalidRecord(String),
}

/// Batch validation and execution failures. Structural; never retried.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch for partition '{expected}' contains an operation for partition '{found}'")]
    MixedPartitionKeys { expected: String, found: String },

    #[error("batch exceeds maximum of {max} operations (got {actual})")]
    TooManyOperations { max: usize, actual: usize },

    #[error("batch operation {index} failed: {source}")]
    OperationFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },
}

/// Absence of a table-level object. Entity absence is reported as
/// `Option`/`bool`, never as an error.
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("table not found: {0}")]
    TableNotFound(String),
}

/// A backend call exceeded its configured bound. Transient; safe to retry
/// with backoff.
#[derive(Debug, Error)]
#[error("{op} timed out after {elapsed:?} on table '{table}'")]
pub struct TimeoutError {
    pub op: &'static str,
    pub table: String,
    pub elapsed: Duration,
}

/// An opaque failure surfaced from the backend, propagated unchanged with
/// enough context for the caller to decide on retry.
#[derive(Debug, Error)]
#[error("backend {op} failed on table '{table}': {source}")]
pub struct BackendError {
    pub op: &'static str,
    pub table: String,
    pub key: Option<(String, String)>,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

pub type Result<T> = std::result::Result<T, Error>;
