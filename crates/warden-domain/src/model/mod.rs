//! Authorization graph types and the business objects that drive them.
//!
//! This module contains:
//! - Core type definitions (ObjectKind, Relation, ObjectRef, Tuple)
//! - Resource records with their group and link edges

mod resource;
mod types;
#[cfg(test)]
mod types_proptest;

pub use resource::{EdgeUpdate, Resource, TrustCenterSettings};
pub use types::*;
