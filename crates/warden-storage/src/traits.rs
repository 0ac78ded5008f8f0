//! DataStore trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Subject ID used by wildcard ("anyone") tuples.
pub const WILDCARD_ID: &str = "*";

/// Maximum number of tuples accepted in a single write unless configured otherwise.
pub const DEFAULT_MAX_TUPLES_PER_WRITE: usize = 100;

/// Maximum length of a kind, ID or relation string.
const MAX_FIELD_LENGTH: usize = 256;

/// A stored tuple.
///
/// Ordering is by (object, relation, subject) so that sorted reads group
/// tuples of the same object together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoredTuple {
    pub object_type: String,
    pub object_id: String,
    pub relation: String,
    pub subject_type: String,
    pub subject_id: String,
}

impl StoredTuple {
    /// Creates a new stored tuple.
    pub fn new(
        subject_type: impl Into<String>,
        subject_id: impl Into<String>,
        relation: impl Into<String>,
        object_type: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
            relation: relation.into(),
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }

    /// Returns true if the entity appears on either side of the tuple.
    pub fn references(&self, kind: &str, id: &str) -> bool {
        (self.object_type == kind && self.object_id == id)
            || (self.subject_type == kind && self.subject_id == id)
    }
}

/// Filter for reading tuples. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleFilter {
    /// Filter by object type.
    pub object_type: Option<String>,
    /// Filter by object ID.
    pub object_id: Option<String>,
    /// Filter by relation.
    pub relation: Option<String>,
    /// Filter by subject type.
    pub subject_type: Option<String>,
    /// Filter by subject ID.
    pub subject_id: Option<String>,
}

impl TupleFilter {
    /// Matches every tuple whose object is `object_type:object_id`.
    pub fn for_object(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: Some(object_type.into()),
            object_id: Some(object_id.into()),
            ..Default::default()
        }
    }

    /// Matches every tuple whose subject is `subject_type:subject_id`.
    pub fn for_subject(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: Some(subject_type.into()),
            subject_id: Some(subject_id.into()),
            ..Default::default()
        }
    }

    /// Restricts the filter to one relation.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Restricts the filter to one subject type.
    pub fn with_subject_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    /// Returns true if the tuple satisfies every set field.
    pub fn matches(&self, tuple: &StoredTuple) -> bool {
        fn field(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().map_or(true, |e| e == actual)
        }

        field(&self.object_type, &tuple.object_type)
            && field(&self.object_id, &tuple.object_id)
            && field(&self.relation, &tuple.relation)
            && field(&self.subject_type, &tuple.subject_type)
            && field(&self.subject_id, &tuple.subject_id)
    }
}

/// A persisted business object.
///
/// The core only interprets `kind`, `id`, `organization_id` and `version`;
/// the rest of the record is carried as an opaque JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    pub kind: String,
    pub id: String,
    pub organization_id: String,
    /// Row version, starting at 1 and bumped on every update.
    pub version: u64,
    pub data: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoredResource {
    /// Creates a new, not yet persisted resource record.
    pub fn new(
        kind: impl Into<String>,
        id: impl Into<String>,
        organization_id: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            kind: kind.into(),
            id: id.into(),
            organization_id: organization_id.into(),
            version: 0,
            data,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for querying resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Filter by resource kind.
    pub kind: Option<String>,
    /// Filter by owning organization.
    pub organization_id: Option<String>,
}

/// A staged resource mutation.
#[derive(Debug, Clone)]
pub enum ResourceWrite {
    Insert(StoredResource),
    Update {
        resource: StoredResource,
        expected_version: u64,
    },
    Delete {
        kind: String,
        id: String,
    },
}

/// A unit of work applied atomically by [`DataStore::commit`].
///
/// Nothing is visible to readers until the transaction is committed.
/// Dropping a transaction without committing discards it.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    resource_writes: Vec<ResourceWrite>,
    tuple_writes: Vec<StoredTuple>,
    tuple_deletes: Vec<StoredTuple>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the insertion of a new resource.
    pub fn insert_resource(&mut self, resource: StoredResource) {
        self.resource_writes.push(ResourceWrite::Insert(resource));
    }

    /// Stages an update guarded by the version the caller read.
    pub fn update_resource(&mut self, resource: StoredResource, expected_version: u64) {
        self.resource_writes.push(ResourceWrite::Update {
            resource,
            expected_version,
        });
    }

    /// Stages the hard delete of a resource.
    pub fn delete_resource(&mut self, kind: impl Into<String>, id: impl Into<String>) {
        self.resource_writes.push(ResourceWrite::Delete {
            kind: kind.into(),
            id: id.into(),
        });
    }

    /// Stages tuple writes.
    pub fn write_tuples(&mut self, tuples: impl IntoIterator<Item = StoredTuple>) {
        self.tuple_writes.extend(tuples);
    }

    /// Stages tuple deletes.
    pub fn delete_tuples(&mut self, tuples: impl IntoIterator<Item = StoredTuple>) {
        self.tuple_deletes.extend(tuples);
    }

    pub fn resource_writes(&self) -> &[ResourceWrite] {
        &self.resource_writes
    }

    pub fn tuple_writes(&self) -> &[StoredTuple] {
        &self.tuple_writes
    }

    pub fn tuple_deletes(&self) -> &[StoredTuple] {
        &self.tuple_deletes
    }

    /// Returns true if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.resource_writes.is_empty()
            && self.tuple_writes.is_empty()
            && self.tuple_deletes.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<ResourceWrite>, Vec<StoredTuple>, Vec<StoredTuple>) {
        (self.resource_writes, self.tuple_writes, self.tuple_deletes)
    }
}

/// Summary of an applied transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    pub resources_written: usize,
    pub tuples_written: usize,
    pub tuples_deleted: usize,
}

/// Abstract storage interface for business objects and authorization tuples.
///
/// Implementations must be thread-safe (Send + Sync) and must apply a
/// [`Transaction`] all-or-nothing.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // Resource operations

    /// Gets a resource by kind and ID.
    async fn get_resource(&self, kind: &str, id: &str) -> StorageResult<StoredResource>;

    /// Lists resources matching the filter.
    async fn query_resources(&self, filter: &ResourceFilter) -> StorageResult<Vec<StoredResource>>;

    // Tuple operations

    /// Reads tuples matching the filter.
    async fn read_tuples(&self, filter: &TupleFilter) -> StorageResult<Vec<StoredTuple>>;

    /// Returns true if the exact tuple is stored.
    async fn tuple_exists(&self, tuple: &StoredTuple) -> StorageResult<bool> {
        let filter = TupleFilter {
            object_type: Some(tuple.object_type.clone()),
            object_id: Some(tuple.object_id.clone()),
            relation: Some(tuple.relation.clone()),
            subject_type: Some(tuple.subject_type.clone()),
            subject_id: Some(tuple.subject_id.clone()),
        };
        Ok(!self.read_tuples(&filter).await?.is_empty())
    }

    /// Writes and deletes tuples outside of a resource transaction.
    ///
    /// Deletes are applied before writes. Writing a stored tuple or deleting
    /// a missing one is a no-op.
    async fn write_tuples(
        &self,
        writes: Vec<StoredTuple>,
        deletes: Vec<StoredTuple>,
    ) -> StorageResult<()>;

    // Transactions

    /// Applies a transaction atomically.
    async fn commit(&self, transaction: Transaction) -> StorageResult<CommitReceipt>;
}

fn validate_field(name: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{name} cannot be empty"),
        });
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{name} exceeds {MAX_FIELD_LENGTH} characters"),
        });
    }
    Ok(())
}

/// Validates a tuple before it is persisted.
pub fn validate_tuple(tuple: &StoredTuple) -> StorageResult<()> {
    validate_field("object_type", &tuple.object_type)?;
    validate_field("object_id", &tuple.object_id)?;
    validate_field("relation", &tuple.relation)?;
    validate_field("subject_type", &tuple.subject_type)?;
    validate_field("subject_id", &tuple.subject_id)?;

    if tuple.object_id == WILDCARD_ID {
        return Err(StorageError::InvalidInput {
            message: "object_id cannot be a wildcard".to_string(),
        });
    }
    Ok(())
}

/// Validates a resource record before it is persisted.
pub fn validate_resource(resource: &StoredResource) -> StorageResult<()> {
    validate_field("kind", &resource.kind)?;
    validate_field("id", &resource.id)?;
    validate_field("organization_id", &resource.organization_id)?;
    if resource.id == WILDCARD_ID {
        return Err(StorageError::InvalidInput {
            message: "resource id cannot be a wildcard".to_string(),
        });
    }
    Ok(())
}
