//! Batch check handler with intra-batch deduplication.
//!
//! A batch carries up to [`MAX_BATCH_SIZE`] `(relation, object)` checks for
//! a single subject. Identical checks execute once; results come back in
//! request order.

mod handler;
mod types;

pub use handler::BatchCheckHandler;
pub use types::{
    BatchCheckError, BatchCheckItem, BatchCheckItemResult, BatchCheckRequest, BatchCheckResponse,
    BatchCheckResult, MAX_BATCH_SIZE,
};
