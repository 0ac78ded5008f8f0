//! warden-storage: Storage abstraction layer
//!
//! This crate provides the persistence seam for Warden:
//! - DataStore trait for resources, tuples and atomic transactions
//! - In-memory implementation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               warden-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - DataStore trait definition   │
//! │  memory.rs   - In-memory implementation     │
//! │  error.rs    - StorageError                 │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDataStore;
pub use traits::{
    validate_tuple, CommitReceipt, DataStore, ResourceFilter, ResourceWrite, StoredResource,
    StoredTuple, Transaction, TupleFilter, DEFAULT_MAX_TUPLES_PER_WRITE, WILDCARD_ID,
};
