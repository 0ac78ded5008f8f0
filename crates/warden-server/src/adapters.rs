//! Adapters between storage records and domain types.
//!
//! The domain layer reads tuples through [`TupleReader`]; this module
//! implements it on top of any [`DataStore`] and converts resource rows to
//! and from [`Resource`].

use std::sync::Arc;

use async_trait::async_trait;
use warden_domain::checker::{TupleQuery, TupleReader};
use warden_domain::error::{DomainError, DomainResult};
use warden_domain::model::{ObjectKind, ObjectRef, Relation, Resource, Tuple};
use warden_storage::{DataStore, StorageError, StoredResource, StoredTuple, TupleFilter};

/// Exposes a data store as a domain tuple reader.
pub struct DataStoreTupleReader<S> {
    store: Arc<S>,
}

impl<S: DataStore> DataStoreTupleReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: DataStore> TupleReader for DataStoreTupleReader<S> {
    async fn read_tuples(&self, query: &TupleQuery) -> DomainResult<Vec<Tuple>> {
        let stored = self
            .store
            .read_tuples(&to_filter(query))
            .await
            .map_err(map_storage_error)?;
        stored.iter().map(from_stored).collect()
    }

    async fn tuple_exists(&self, tuple: &Tuple) -> DomainResult<bool> {
        self.store
            .tuple_exists(&to_stored(tuple))
            .await
            .map_err(map_storage_error)
    }
}

fn to_filter(query: &TupleQuery) -> TupleFilter {
    TupleFilter {
        object_type: query.object.as_ref().map(|o| o.kind.to_string()),
        object_id: query.object.as_ref().map(|o| o.id.clone()),
        relation: query.relation.map(|r| r.to_string()),
        subject_type: query
            .subject
            .as_ref()
            .map(|s| s.kind)
            .or(query.subject_kind)
            .map(|k| k.to_string()),
        subject_id: query.subject.as_ref().map(|s| s.id.clone()),
    }
}

/// Converts a domain tuple to its stored form.
pub fn to_stored(tuple: &Tuple) -> StoredTuple {
    StoredTuple::new(
        tuple.subject.kind.as_str(),
        tuple.subject.id.clone(),
        tuple.relation.as_str(),
        tuple.object.kind.as_str(),
        tuple.object.id.clone(),
    )
}

/// Parses a stored tuple. Unknown kinds or relations are storage corruption.
pub fn from_stored(stored: &StoredTuple) -> DomainResult<Tuple> {
    let corrupt = |err: DomainError| DomainError::Storage {
        message: format!("unreadable tuple {stored:?}: {err}"),
    };
    let subject_kind: ObjectKind = stored.subject_type.parse().map_err(corrupt)?;
    let relation: Relation = stored.relation.parse().map_err(corrupt)?;
    let object_kind: ObjectKind = stored.object_type.parse().map_err(corrupt)?;
    Ok(Tuple::new(
        ObjectRef::new(subject_kind, stored.subject_id.clone()),
        relation,
        ObjectRef::new(object_kind, stored.object_id.clone()),
    ))
}

/// Serializes a resource into a row. The row carries the resource's version.
pub fn resource_to_stored(resource: &Resource) -> DomainResult<StoredResource> {
    let data = serde_json::to_value(resource).map_err(|e| DomainError::Storage {
        message: format!("failed to serialize {}: {e}", resource.object_ref()),
    })?;
    let mut stored = StoredResource::new(
        resource.kind.as_str(),
        resource.id.clone(),
        resource.organization_id.clone(),
        data,
    );
    stored.version = resource.version;
    Ok(stored)
}

pub fn resource_from_stored(stored: &StoredResource) -> DomainResult<Resource> {
    let mut resource: Resource =
        serde_json::from_value(stored.data.clone()).map_err(|e| DomainError::Storage {
            message: format!(
                "failed to deserialize {}:{}: {e}",
                stored.kind, stored.id
            ),
        })?;
    resource.version = stored.version;
    Ok(resource)
}

/// Maps storage failures into the domain taxonomy.
pub fn map_storage_error(err: StorageError) -> DomainError {
    match err {
        StorageError::ResourceNotFound { kind, id } => DomainError::not_found(kind, id),
        StorageError::VersionConflict { .. } => DomainError::Conflict {
            message: err.to_string(),
        },
        StorageError::ResourceAlreadyExists { .. } => DomainError::Conflict {
            message: err.to_string(),
        },
        StorageError::InvalidInput { message } => DomainError::InvalidInput { message },
        other => DomainError::Storage {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_storage::MemoryDataStore;

    fn tuple(subject: &str, relation: Relation, object: &str) -> Tuple {
        Tuple::new(
            ObjectRef::parse(subject).unwrap(),
            relation,
            ObjectRef::parse(object).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_reader_applies_query_fields() {
        let store = MemoryDataStore::new_shared();
        let writes = [
            tuple("organization:org1", Relation::Owner, "control:c1"),
            tuple("group:eng", Relation::Editor, "control:c1"),
            tuple("user:alice", Relation::Member, "group:eng"),
        ];
        store
            .write_tuples(writes.iter().map(to_stored).collect(), vec![])
            .await
            .unwrap();
        let reader = DataStoreTupleReader::new(store);

        let object = ObjectRef::parse("control:c1").unwrap();
        let owners = reader
            .read_tuples(
                &TupleQuery::for_object(&object)
                    .with_relation(Relation::Owner)
                    .with_subject_kind(ObjectKind::Organization),
            )
            .await
            .unwrap();
        assert_eq!(owners, vec![writes[0].clone()]);

        let alice = ObjectRef::parse("user:alice").unwrap();
        let memberships = reader
            .read_tuples(&TupleQuery::for_subject(&alice))
            .await
            .unwrap();
        assert_eq!(memberships, vec![writes[2].clone()]);

        assert!(reader.tuple_exists(&writes[1]).await.unwrap());
        assert!(!reader
            .tuple_exists(&tuple("group:eng", Relation::Viewer, "control:c1"))
            .await
            .unwrap());
    }

    #[test]
    fn test_wildcard_subject_survives_conversion() {
        let grant = tuple("user:*", Relation::Viewer, "file:f1");
        let stored = to_stored(&grant);
        assert_eq!(stored.subject_id, "*");
        assert_eq!(from_stored(&stored).unwrap(), grant);
    }

    #[test]
    fn test_unknown_relation_is_a_storage_error() {
        let stored = StoredTuple::new("user", "alice", "approver", "control", "c1");
        assert!(matches!(
            from_stored(&stored),
            Err(DomainError::Storage { .. })
        ));
    }

    #[test]
    fn test_resource_row_keeps_version() {
        let mut resource = Resource::new(ObjectKind::Risk, "r1", "org1");
        resource.version = 4;
        resource.editors.insert("eng".to_string());

        let stored = resource_to_stored(&resource).unwrap();
        assert_eq!(stored.kind, "risk");
        assert_eq!(stored.version, 4);

        let back = resource_from_stored(&stored).unwrap();
        assert_eq!(back, resource);
    }

    #[test]
    fn test_storage_errors_map_to_domain_taxonomy() {
        let not_found = map_storage_error(StorageError::ResourceNotFound {
            kind: "control".to_string(),
            id: "c1".to_string(),
        });
        assert_eq!(not_found, DomainError::not_found("control", "c1"));

        let conflict = map_storage_error(StorageError::VersionConflict {
            kind: "control".to_string(),
            id: "c1".to_string(),
            expected: 1,
            found: 2,
        });
        assert!(matches!(conflict, DomainError::Conflict { .. }));

        let limit = map_storage_error(StorageError::TooManyTuples { count: 101, max: 100 });
        assert!(matches!(limit, DomainError::Storage { .. }));
    }
}
