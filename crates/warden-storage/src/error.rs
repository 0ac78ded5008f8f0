//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Resource not found.
    #[error("resource not found: {kind}:{id}")]
    ResourceNotFound { kind: String, id: String },

    /// Resource already exists.
    #[error("resource already exists: {kind}:{id}")]
    ResourceAlreadyExists { kind: String, id: String },

    /// The resource row changed since it was read.
    #[error("version conflict on {kind}:{id} (expected {expected}, found {found})")]
    VersionConflict {
        kind: String,
        id: String,
        expected: u64,
        found: u64,
    },

    /// A single write carried more tuples than the backend accepts.
    #[error("too many tuples in one write: {count} (max: {max})")]
    TooManyTuples { count: usize, max: usize },

    /// Transaction error.
    #[error("transaction error: {message}")]
    TransactionError { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Serialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
