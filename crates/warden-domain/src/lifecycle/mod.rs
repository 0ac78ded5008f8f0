//! Tuple lifecycle manager.
//!
//! Computes the tuple deltas that keep the authorization graph consistent
//! with a resource mutation. Every resource has a desired tuple set derived
//! from its state; creates write it, updates write and delete the difference
//! between the before and after images, deletes remove the desired set plus
//! every stored tuple that still references the resource.
//!
//! The manager only plans. Callers stage the delta in the same transaction
//! as the resource write.

mod desired;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::checker::{TupleQuery, TupleReader};
use crate::error::{DomainError, DomainResult};
use crate::model::{ObjectKind, ObjectRef, Relation, Resource, Tuple};

pub use desired::desired_tuples;

/// A resource mutation.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    Created(Resource),
    Updated { before: Resource, after: Resource },
    Deleted(Resource),
}

impl ResourceEvent {
    /// The resource the event is about.
    pub fn object(&self) -> ObjectRef {
        match self {
            ResourceEvent::Created(resource)
            | ResourceEvent::Deleted(resource)
            | ResourceEvent::Updated {
                after: resource, ..
            } => resource.object_ref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceEvent::Created(_) => "created",
            ResourceEvent::Updated { .. } => "updated",
            ResourceEvent::Deleted(_) => "deleted",
        }
    }
}

/// Tuples to write and delete. Deletes are applied first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleDelta {
    pub writes: BTreeSet<Tuple>,
    pub deletes: BTreeSet<Tuple>,
}

impl TupleDelta {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len() + self.deletes.len()
    }

    /// Folds another delta into this one.
    pub fn merge(&mut self, other: TupleDelta) {
        self.writes.extend(other.writes);
        self.deletes.extend(other.deletes);
    }
}

/// Plans tuple deltas for resource events.
pub struct TupleLifecycleManager<T> {
    tuple_reader: Arc<T>,
}

impl<T> TupleLifecycleManager<T>
where
    T: TupleReader + 'static,
{
    pub fn new(tuple_reader: Arc<T>) -> Self {
        Self { tuple_reader }
    }

    /// Computes the delta for an event.
    ///
    /// Fails with `NotAuthorized` before anything is written when a newly
    /// referenced group belongs to another organization.
    pub async fn plan(&self, event: &ResourceEvent) -> DomainResult<TupleDelta> {
        let delta = match event {
            ResourceEvent::Created(resource) => {
                self.verify_groups(resource, resource.referenced_groups())
                    .await?;
                TupleDelta {
                    writes: desired_tuples(resource),
                    deletes: BTreeSet::new(),
                }
            }
            ResourceEvent::Updated { before, after } => {
                if before.kind != after.kind
                    || before.id != after.id
                    || before.organization_id != after.organization_id
                {
                    return Err(DomainError::invalid_input(
                        "a resource cannot change kind, id or organization",
                    ));
                }
                let existing = before.referenced_groups();
                let added = after
                    .referenced_groups()
                    .into_iter()
                    .filter(|group| !existing.contains(group))
                    .collect();
                self.verify_groups(after, added).await?;

                let old = desired_tuples(before);
                let new = desired_tuples(after);
                TupleDelta {
                    writes: new.difference(&old).cloned().collect(),
                    deletes: old.difference(&new).cloned().collect(),
                }
            }
            ResourceEvent::Deleted(resource) => {
                let object = resource.object_ref();
                let mut deletes = desired_tuples(resource);
                deletes.extend(
                    self.tuple_reader
                        .read_tuples(&TupleQuery::for_object(&object))
                        .await?,
                );
                deletes.extend(
                    self.tuple_reader
                        .read_tuples(&TupleQuery::for_subject(&object))
                        .await?,
                );
                TupleDelta {
                    writes: BTreeSet::new(),
                    deletes,
                }
            }
        };

        debug!(
            event = event.name(),
            object = %event.object(),
            writes = delta.writes.len(),
            deletes = delta.deletes.len(),
            "planned tuple delta"
        );
        Ok(delta)
    }

    /// Every group must be owned by the resource's organization.
    async fn verify_groups(&self, resource: &Resource, groups: BTreeSet<&str>) -> DomainResult<()> {
        let organization = ObjectRef::organization(&resource.organization_id);
        for group in groups {
            // A group may name itself.
            if resource.kind == ObjectKind::Group && resource.id == group {
                continue;
            }
            let owner = Tuple::new(organization.clone(), Relation::Owner, ObjectRef::group(group));
            if !self.tuple_reader.tuple_exists(&owner).await? {
                return Err(DomainError::not_authorized(format!(
                    "assign group {group} on {}",
                    resource.object_ref()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
