//! Core type definitions for the authorization graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Subject ID of the "anyone" marker used by wildcard grants.
pub const WILDCARD: &str = "*";

/// Kinds of entity that can appear on either side of a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Organization,
    User,
    Service,
    Group,
    TrustCenter,
    TrustCenterDoc,
    File,
    Control,
    Subcontrol,
    ControlObjective,
    Task,
    Evidence,
    InternalPolicy,
    Procedure,
    Narrative,
    Risk,
    Program,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 17] = [
        ObjectKind::Organization,
        ObjectKind::User,
        ObjectKind::Service,
        ObjectKind::Group,
        ObjectKind::TrustCenter,
        ObjectKind::TrustCenterDoc,
        ObjectKind::File,
        ObjectKind::Control,
        ObjectKind::Subcontrol,
        ObjectKind::ControlObjective,
        ObjectKind::Task,
        ObjectKind::Evidence,
        ObjectKind::InternalPolicy,
        ObjectKind::Procedure,
        ObjectKind::Narrative,
        ObjectKind::Risk,
        ObjectKind::Program,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Organization => "organization",
            ObjectKind::User => "user",
            ObjectKind::Service => "service",
            ObjectKind::Group => "group",
            ObjectKind::TrustCenter => "trust_center",
            ObjectKind::TrustCenterDoc => "trust_center_doc",
            ObjectKind::File => "file",
            ObjectKind::Control => "control",
            ObjectKind::Subcontrol => "subcontrol",
            ObjectKind::ControlObjective => "control_objective",
            ObjectKind::Task => "task",
            ObjectKind::Evidence => "evidence",
            ObjectKind::InternalPolicy => "internal_policy",
            ObjectKind::Procedure => "procedure",
            ObjectKind::Narrative => "narrative",
            ObjectKind::Risk => "risk",
            ObjectKind::Program => "program",
        }
    }

    /// Kinds an anonymous trust-center visitor may ever be granted access to.
    pub fn is_trust_center_scoped(&self) -> bool {
        matches!(
            self,
            ObjectKind::TrustCenter | ObjectKind::TrustCenterDoc | ObjectKind::File
        )
    }

    /// Kinds that are owned by an organization and carry an owner tuple.
    pub fn is_organization_owned(&self) -> bool {
        !matches!(
            self,
            ObjectKind::Organization | ObjectKind::User | ObjectKind::Service
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown object kind: {s}")))
    }
}

/// Relation vocabulary of the authorization graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Owner,
    Admin,
    Editor,
    Viewer,
    Blocked,
    Member,
    AssociatedWith,
    NdaSigned,
}

impl Relation {
    pub const ALL: [Relation; 8] = [
        Relation::Owner,
        Relation::Admin,
        Relation::Editor,
        Relation::Viewer,
        Relation::Blocked,
        Relation::Member,
        Relation::AssociatedWith,
        Relation::NdaSigned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Owner => "owner",
            Relation::Admin => "admin",
            Relation::Editor => "editor",
            Relation::Viewer => "viewer",
            Relation::Blocked => "blocked",
            Relation::Member => "member",
            Relation::AssociatedWith => "associated_with",
            Relation::NdaSigned => "nda_signed",
        }
    }

    /// Stored relations that satisfy a check for `self`.
    ///
    /// Stronger relations imply weaker ones: an `owner` tuple satisfies an
    /// `editor` check, an `editor` tuple satisfies a `viewer` check.
    pub fn satisfied_by(&self) -> &'static [Relation] {
        match self {
            Relation::Viewer => &[Relation::Viewer, Relation::Editor, Relation::Owner],
            Relation::Editor => &[Relation::Editor, Relation::Owner],
            Relation::Member => &[Relation::Member, Relation::Admin, Relation::Owner],
            Relation::Admin => &[Relation::Admin, Relation::Owner],
            Relation::Owner => &[Relation::Owner],
            Relation::Blocked => &[Relation::Blocked],
            Relation::AssociatedWith => &[Relation::AssociatedWith],
            Relation::NdaSigned => &[Relation::NdaSigned],
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relation::ALL
            .iter()
            .copied()
            .find(|relation| relation.as_str() == s)
            .ok_or_else(|| DomainError::invalid_input(format!("unknown relation: {s}")))
    }
}

/// A `(kind, id)` reference to an entity (e.g., "control:c1").
///
/// Used for both sides of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// The "anyone" subject used for public grants (`user:*`).
    pub fn wildcard() -> Self {
        Self::new(ObjectKind::User, WILDCARD)
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Organization, id)
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Group, id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.id == WILDCARD
    }

    /// Parses an entity from "kind:id" format.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let (kind, id) = value
            .split_once(':')
            .ok_or_else(|| DomainError::invalid_input("object must be in 'kind:id' format"))?;
        if id.is_empty() {
            return Err(DomainError::invalid_input("object id cannot be empty"));
        }
        Ok(Self::new(kind.parse()?, id))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An immutable `(subject, relation, object)` authorization fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple {
    pub subject: ObjectRef,
    pub relation: Relation,
    pub object: ObjectRef,
}

impl Tuple {
    pub fn new(subject: ObjectRef, relation: Relation, object: ObjectRef) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }

    /// Returns true if the entity appears on either side of the tuple.
    pub fn references(&self, entity: &ObjectRef) -> bool {
        &self.subject == entity || &self.object == entity
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.subject)
    }
}
