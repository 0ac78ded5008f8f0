//! Batch check handler implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument};
use warden_domain::model::{ObjectRef, Relation};
use warden_storage::DataStore;

use super::types::{
    BatchCheckError, BatchCheckItemResult, BatchCheckRequest, BatchCheckResponse,
    BatchCheckResult, MAX_BATCH_SIZE,
};
use crate::authz::Authz;

/// Key for identifying unique checks within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CheckKey {
    relation: Relation,
    object: ObjectRef,
}

/// Handler for batch permission checks.
pub struct BatchCheckHandler<S> {
    authz: Arc<Authz<S>>,
}

impl<S: DataStore> BatchCheckHandler<S> {
    pub fn new(authz: Arc<Authz<S>>) -> Self {
        Self { authz }
    }

    /// Validates the batch request.
    pub fn validate(&self, request: &BatchCheckRequest) -> BatchCheckResult<()> {
        self.parse(request).map(|_| ())
    }

    fn parse(&self, request: &BatchCheckRequest) -> BatchCheckResult<Vec<CheckKey>> {
        if request.checks.is_empty() {
            return Err(BatchCheckError::EmptyBatch);
        }

        if request.checks.len() > MAX_BATCH_SIZE {
            return Err(BatchCheckError::BatchTooLarge {
                size: request.checks.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        request
            .checks
            .iter()
            .enumerate()
            .map(|(index, check)| {
                let invalid = |message: String| BatchCheckError::InvalidCheck { index, message };
                if check.relation.is_empty() {
                    return Err(invalid("relation cannot be empty".to_string()));
                }
                if check.object.is_empty() {
                    return Err(invalid("object cannot be empty".to_string()));
                }
                let relation = check
                    .relation
                    .parse()
                    .map_err(|e: warden_domain::DomainError| invalid(e.to_string()))?;
                let object = ObjectRef::parse(&check.object).map_err(|e| invalid(e.to_string()))?;
                Ok(CheckKey { relation, object })
            })
            .collect()
    }

    /// Executes a batch check, running each distinct check once.
    #[instrument(skip(self, request), fields(subject = %request.subject.subject_ref(), size = request.checks.len()))]
    pub async fn check(&self, request: BatchCheckRequest) -> BatchCheckResult<BatchCheckResponse> {
        let keys = self.parse(&request)?;

        let mut unique_checks: Vec<&CheckKey> = Vec::new();
        let mut key_to_index: HashMap<&CheckKey, usize> = HashMap::new();
        let mut position_to_unique: Vec<usize> = Vec::with_capacity(keys.len());

        for key in &keys {
            let unique_index = *key_to_index.entry(key).or_insert_with(|| {
                let idx = unique_checks.len();
                unique_checks.push(key);
                idx
            });
            position_to_unique.push(unique_index);
        }
        debug!(unique = unique_checks.len(), "deduplicated batch");

        let subject = &request.subject;
        let check_futures = unique_checks.iter().map(|key| async move {
            let result = self
                .authz
                .check_detailed(subject, key.relation, &key.object)
                .await;
            BatchCheckItemResult {
                allowed: result.allowed,
                grant: result.grant,
            }
        });
        let unique_results: Vec<BatchCheckItemResult> = join_all(check_futures).await;

        let results = position_to_unique
            .iter()
            .map(|&idx| unique_results[idx].clone())
            .collect();

        Ok(BatchCheckResponse { results })
    }

    /// Returns `(total, unique)` check counts for a request.
    pub fn dedup_stats(&self, request: &BatchCheckRequest) -> (usize, usize) {
        let seen: HashSet<(&str, &str)> = request
            .checks
            .iter()
            .map(|check| (check.relation.as_str(), check.object.as_str()))
            .collect();
        (request.checks.len(), seen.len())
    }
}
