//! Data types for batch check operations.

use warden_domain::checker::GrantPath;
use warden_domain::identity::Subject;

/// Maximum number of checks per batch.
pub const MAX_BATCH_SIZE: usize = 50;

/// A single check within a batch request.
#[derive(Debug, Clone)]
pub struct BatchCheckItem {
    /// The relation to check (e.g., "viewer").
    pub relation: String,
    /// The object in "kind:id" format (e.g., "control:c1").
    pub object: String,
}

impl BatchCheckItem {
    pub fn new(relation: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            object: object.into(),
        }
    }
}

/// Request for batch permission checks.
#[derive(Debug, Clone)]
pub struct BatchCheckRequest {
    /// The caller every check is evaluated for.
    pub subject: Subject,
    /// The list of checks to perform.
    pub checks: Vec<BatchCheckItem>,
}

impl BatchCheckRequest {
    /// Creates a new batch check request.
    pub fn new(subject: Subject, checks: Vec<BatchCheckItem>) -> Self {
        Self { subject, checks }
    }
}

/// Result of a single check within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCheckItemResult {
    /// Whether the check is allowed.
    pub allowed: bool,
    /// The rule that granted it.
    pub grant: Option<GrantPath>,
}

/// Response from a batch check operation.
#[derive(Debug, Clone)]
pub struct BatchCheckResponse {
    /// Results for each check, in the same order as the request.
    pub results: Vec<BatchCheckItemResult>,
}

/// Errors that can occur during batch check operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchCheckError {
    /// The batch request is empty.
    #[error("batch request cannot be empty")]
    EmptyBatch,

    /// The batch request exceeds the maximum allowed size.
    #[error("batch size {size} exceeds maximum allowed {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A check item has invalid format.
    #[error("invalid check at index {index}: {message}")]
    InvalidCheck { index: usize, message: String },
}

/// Result type for batch check operations.
pub type BatchCheckResult<T> = Result<T, BatchCheckError>;
