//! Traits for storage operations needed by the checker and lifecycle manager.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{ObjectKind, ObjectRef, Relation, Tuple};

/// Query over stored tuples. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleQuery {
    pub object: Option<ObjectRef>,
    pub relation: Option<Relation>,
    pub subject: Option<ObjectRef>,
    /// Restricts subjects to one kind when `subject` is unset.
    pub subject_kind: Option<ObjectKind>,
}

impl TupleQuery {
    pub fn for_object(object: &ObjectRef) -> Self {
        Self {
            object: Some(object.clone()),
            ..Default::default()
        }
    }

    pub fn for_subject(subject: &ObjectRef) -> Self {
        Self {
            subject: Some(subject.clone()),
            ..Default::default()
        }
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn with_subject_kind(mut self, kind: ObjectKind) -> Self {
        self.subject_kind = Some(kind);
        self
    }

    /// Returns true if the tuple satisfies every set field.
    pub fn matches(&self, tuple: &Tuple) -> bool {
        self.object.as_ref().map_or(true, |o| o == &tuple.object)
            && self.relation.map_or(true, |r| r == tuple.relation)
            && self.subject.as_ref().map_or(true, |s| s == &tuple.subject)
            && self.subject_kind.map_or(true, |k| k == tuple.subject.kind)
    }
}

/// Trait for tuple storage operations needed by the checker.
#[async_trait]
pub trait TupleReader: Send + Sync {
    /// Reads tuples matching the query.
    async fn read_tuples(&self, query: &TupleQuery) -> DomainResult<Vec<Tuple>>;

    /// Returns true if the exact tuple is stored.
    async fn tuple_exists(&self, tuple: &Tuple) -> DomainResult<bool> {
        let query = TupleQuery {
            object: Some(tuple.object.clone()),
            relation: Some(tuple.relation),
            subject: Some(tuple.subject.clone()),
            subject_kind: None,
        };
        Ok(!self.read_tuples(&query).await?.is_empty())
    }
}
