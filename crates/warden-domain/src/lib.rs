//! warden-domain: Core authorization domain logic
//!
//! This crate contains the relationship-based access control core:
//! - Authorization graph types and resource records
//! - Identity resolution from credentials to subjects
//! - Access checker for permission checks
//! - Tuple lifecycle planning for resource mutations
//! - Trust-center document visibility state machine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                warden-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Tuples, kinds, resources     │
//! │  identity/   - Credential -> Subject        │
//! │  checker/    - Allow/deny evaluation        │
//! │  lifecycle/  - Tuple deltas per mutation    │
//! │  visibility/ - Document state machine       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod checker;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod visibility;

// Re-export commonly used types at the crate root
pub use checker::{AccessChecker, CheckRequest, CheckResult, TupleReader};
pub use error::{DomainError, DomainResult};
pub use identity::{IdentityResolver, Subject};
pub use lifecycle::{ResourceEvent, TupleDelta, TupleLifecycleManager};
