//! Request and result types for access checks.

use crate::identity::Subject;
use crate::model::{ObjectRef, Relation};

/// Request for a permission check.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub subject: Subject,
    pub relation: Relation,
    pub object: ObjectRef,
}

impl CheckRequest {
    pub fn new(subject: Subject, relation: Relation, object: ObjectRef) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }
}

/// The rule that granted a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantPath {
    /// `(*, relation, object)`.
    Wildcard,
    /// A tuple naming the subject. `relation` is the stored relation, which
    /// may be stronger than the one checked.
    Direct { relation: Relation },
    /// A tuple naming a group the subject is a member of.
    Group { group_id: String, relation: Relation },
    /// Organization owner or admin asking for `owner`.
    OrganizationOwner { organization_id: String },
    /// Read access through a linked object.
    LinkedResource { via: ObjectRef },
    /// A visitor looking at their own trust center.
    TrustCenterVisitor,
    /// A visitor reading a protected file after signing the NDA.
    NdaSigned,
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub allowed: bool,
    pub grant: Option<GrantPath>,
}

impl CheckResult {
    pub fn allow(grant: GrantPath) -> Self {
        Self {
            allowed: true,
            grant: Some(grant),
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            grant: None,
        }
    }
}

impl From<Option<GrantPath>> for CheckResult {
    fn from(grant: Option<GrantPath>) -> Self {
        grant.map_or_else(CheckResult::deny, CheckResult::allow)
    }
}
