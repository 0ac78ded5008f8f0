//! Domain error types for authorization operations.

use thiserror::Error;

/// Domain-specific errors for authorization operations.
///
/// `NotFound` is returned both for absent objects and for objects the caller
/// may not see, so callers cannot learn whether it exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The credential could not be mapped to a subject.
    ///
    /// The reason is kept for logs; the display text never varies.
    #[error("could not identify authenticated user")]
    Authentication { reason: String },

    /// Object is absent or invisible to the caller.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// The caller knows the object exists but may not perform the action.
    #[error("you are not authorized to perform this action: {action}")]
    NotAuthorized { action: String },

    /// A resource committed but its tuples could not be written.
    #[error("authorization state inconsistent for {object}: {message}")]
    Consistency { object: String, message: String },

    /// Malformed input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Lost an optimistic-concurrency race; nothing was committed.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The data store rejected the operation; nothing was committed.
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn not_authorized(action: impl Into<String>) -> Self {
        Self::NotAuthorized {
            action: action.into(),
        }
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
