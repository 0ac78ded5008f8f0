//! In-memory storage implementation.
//!
//! All state lives behind a single `RwLock` so a committed [`Transaction`]
//! becomes visible to readers in one step.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    validate_resource, validate_tuple, CommitReceipt, DataStore, ResourceFilter, ResourceWrite,
    StoredResource, StoredTuple, Transaction, TupleFilter, DEFAULT_MAX_TUPLES_PER_WRITE,
};

type ResourceKey = (String, String);

#[derive(Debug, Default)]
struct MemoryState {
    resources: HashMap<ResourceKey, StoredResource>,
    tuples: HashSet<StoredTuple>,
}

/// In-memory implementation of DataStore.
///
/// # Performance Characteristics
///
/// - **Write tuple**: O(1) average (HashSet insert)
/// - **Delete tuple**: O(1) average (HashSet remove)
/// - **Read tuples**: O(N) linear scan, results sorted
/// - **Resource lookup**: O(1) (HashMap)
#[derive(Debug)]
pub struct MemoryDataStore {
    state: RwLock<MemoryState>,
    max_tuples_per_write: usize,
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::with_max_tuples_per_write(DEFAULT_MAX_TUPLES_PER_WRITE)
    }
}

impl MemoryDataStore {
    /// Creates a new in-memory data store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory data store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Creates a store that rejects writes carrying more than `max` tuples.
    pub fn with_max_tuples_per_write(max: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            max_tuples_per_write: max,
        }
    }

    /// Returns the total number of stored tuples.
    pub async fn tuple_count(&self) -> usize {
        self.state.read().await.tuples.len()
    }

    /// Validates every tuple. `count` is what is held against the limit.
    fn check_tuple_batch(
        &self,
        writes: &[StoredTuple],
        deletes: &[StoredTuple],
        count: usize,
    ) -> StorageResult<()> {
        if count > self.max_tuples_per_write {
            return Err(StorageError::TooManyTuples {
                count,
                max: self.max_tuples_per_write,
            });
        }
        for tuple in writes.iter().chain(deletes) {
            validate_tuple(tuple)?;
        }
        Ok(())
    }
}

/// Checks staged resource writes against current state without mutating it.
///
/// Tracks the state each key would have after the preceding writes so that
/// a transaction inserting and then updating the same row validates.
fn check_resource_writes(
    resources: &HashMap<ResourceKey, StoredResource>,
    writes: &[ResourceWrite],
) -> StorageResult<()> {
    // Some(version) = present after staged writes, None = absent.
    let mut overlay: HashMap<ResourceKey, Option<u64>> = HashMap::new();
    let current = |overlay: &HashMap<ResourceKey, Option<u64>>, key: &ResourceKey| {
        overlay
            .get(key)
            .copied()
            .unwrap_or_else(|| resources.get(key).map(|r| r.version))
    };

    for write in writes {
        match write {
            ResourceWrite::Insert(resource) => {
                validate_resource(resource)?;
                let key = (resource.kind.clone(), resource.id.clone());
                if current(&overlay, &key).is_some() {
                    return Err(StorageError::ResourceAlreadyExists {
                        kind: resource.kind.clone(),
                        id: resource.id.clone(),
                    });
                }
                overlay.insert(key, Some(1));
            }
            ResourceWrite::Update {
                resource,
                expected_version,
            } => {
                validate_resource(resource)?;
                let key = (resource.kind.clone(), resource.id.clone());
                match current(&overlay, &key) {
                    None => {
                        return Err(StorageError::ResourceNotFound {
                            kind: resource.kind.clone(),
                            id: resource.id.clone(),
                        })
                    }
                    Some(found) if found != *expected_version => {
                        return Err(StorageError::VersionConflict {
                            kind: resource.kind.clone(),
                            id: resource.id.clone(),
                            expected: *expected_version,
                            found,
                        })
                    }
                    Some(found) => {
                        overlay.insert(key, Some(found + 1));
                    }
                }
            }
            ResourceWrite::Delete { kind, id } => {
                let key = (kind.clone(), id.clone());
                if current(&overlay, &key).is_none() {
                    return Err(StorageError::ResourceNotFound {
                        kind: kind.clone(),
                        id: id.clone(),
                    });
                }
                overlay.insert(key, None);
            }
        }
    }
    Ok(())
}

fn apply_resource_write(state: &mut MemoryState, write: ResourceWrite) {
    let now = chrono::Utc::now();
    match write {
        ResourceWrite::Insert(mut resource) => {
            resource.version = 1;
            resource.created_at = now;
            resource.updated_at = now;
            state
                .resources
                .insert((resource.kind.clone(), resource.id.clone()), resource);
        }
        ResourceWrite::Update { mut resource, .. } => {
            let key = (resource.kind.clone(), resource.id.clone());
            if let Some(existing) = state.resources.get(&key) {
                resource.version = existing.version + 1;
                resource.created_at = existing.created_at;
            }
            resource.updated_at = now;
            state.resources.insert(key, resource);
        }
        ResourceWrite::Delete { kind, id } => {
            state.resources.remove(&(kind, id));
        }
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get_resource(&self, kind: &str, id: &str) -> StorageResult<StoredResource> {
        let state = self.state.read().await;
        state
            .resources
            .get(&(kind.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::ResourceNotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            })
    }

    async fn query_resources(&self, filter: &ResourceFilter) -> StorageResult<Vec<StoredResource>> {
        let state = self.state.read().await;
        let mut resources: Vec<StoredResource> = state
            .resources
            .values()
            .filter(|r| filter.kind.as_deref().map_or(true, |k| k == r.kind))
            .filter(|r| {
                filter
                    .organization_id
                    .as_deref()
                    .map_or(true, |o| o == r.organization_id)
            })
            .cloned()
            .collect();
        resources.sort_by(|a, b| (&a.kind, &a.id).cmp(&(&b.kind, &b.id)));
        Ok(resources)
    }

    #[instrument(skip(self))]
    async fn read_tuples(&self, filter: &TupleFilter) -> StorageResult<Vec<StoredTuple>> {
        let state = self.state.read().await;
        let mut tuples: Vec<StoredTuple> = state
            .tuples
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tuples.sort();
        Ok(tuples)
    }

    async fn tuple_exists(&self, tuple: &StoredTuple) -> StorageResult<bool> {
        Ok(self.state.read().await.tuples.contains(tuple))
    }

    #[instrument(skip(self, writes, deletes), fields(writes = writes.len(), deletes = deletes.len()))]
    async fn write_tuples(
        &self,
        writes: Vec<StoredTuple>,
        deletes: Vec<StoredTuple>,
    ) -> StorageResult<()> {
        self.check_tuple_batch(&writes, &deletes, writes.len() + deletes.len())?;

        let mut state = self.state.write().await;
        for tuple in &deletes {
            state.tuples.remove(tuple);
        }
        state.tuples.extend(writes);
        Ok(())
    }

    #[instrument(skip(self, transaction))]
    async fn commit(&self, transaction: Transaction) -> StorageResult<CommitReceipt> {
        let (resource_writes, tuple_writes, tuple_deletes) = transaction.into_parts();
        // Cleanup deletes are uncapped so a resource can always be removed.
        self.check_tuple_batch(&tuple_writes, &tuple_deletes, tuple_writes.len())?;

        let mut state = self.state.write().await;
        // Validate everything before touching state so a failure leaves no trace.
        check_resource_writes(&state.resources, &resource_writes)?;

        let receipt = CommitReceipt {
            resources_written: resource_writes.len(),
            tuples_written: tuple_writes.len(),
            tuples_deleted: tuple_deletes.len(),
        };

        for write in resource_writes {
            apply_resource_write(&mut state, write);
        }
        for tuple in &tuple_deletes {
            state.tuples.remove(tuple);
        }
        state.tuples.extend(tuple_writes);

        debug!(?receipt, "transaction committed");
        Ok(receipt)
    }
}
