//! Authorization facade.
//!
//! [`Authz`] binds the access checker and the tuple lifecycle manager to one
//! data store. Mutation coordinators use it in two ways:
//!
//! - In-transaction: [`Authz::stage_event`] plans the tuple delta and stages
//!   it next to the resource write, so both commit or neither does.
//! - Post-commit: `on_resource_*` hooks apply the delta after the resource
//!   row is already committed. A failure there cannot be rolled back and is
//!   reported as [`DomainError::Consistency`].

use std::sync::Arc;

use tracing::{debug, error, instrument};
use warden_domain::checker::{AccessChecker, CheckerConfig, LinkedResourceRules};
use warden_domain::error::{DomainError, DomainResult};
use warden_domain::identity::Subject;
use warden_domain::lifecycle::{ResourceEvent, TupleDelta, TupleLifecycleManager};
use warden_domain::model::{ObjectRef, Relation, Resource, Tuple};
use warden_domain::{CheckRequest, CheckResult};
use warden_storage::{CommitReceipt, DataStore, Transaction};

use crate::adapters::{map_storage_error, to_stored, DataStoreTupleReader};

/// Access checks and tuple bookkeeping over one data store.
pub struct Authz<S> {
    store: Arc<S>,
    checker: AccessChecker<DataStoreTupleReader<S>>,
    lifecycle: TupleLifecycleManager<DataStoreTupleReader<S>>,
}

impl<S: DataStore> Authz<S> {
    pub fn new(store: Arc<S>, config: CheckerConfig) -> Self {
        let reader = Arc::new(DataStoreTupleReader::new(Arc::clone(&store)));
        Self {
            checker: AccessChecker::with_config(Arc::clone(&reader), config),
            lifecycle: TupleLifecycleManager::new(reader),
            store,
        }
    }

    /// Replaces the linked-resource registry.
    pub fn with_rules(mut self, rules: LinkedResourceRules) -> Self {
        self.checker = self.checker.with_rules(rules);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn rules(&self) -> &LinkedResourceRules {
        self.checker.rules()
    }

    /// Returns true if `subject` holds `relation` on `object`.
    pub async fn check(&self, subject: &Subject, relation: Relation, object: &ObjectRef) -> bool {
        self.check_detailed(subject, relation, object).await.allowed
    }

    /// Like [`Authz::check`], also reporting the grant path.
    pub async fn check_detailed(
        &self,
        subject: &Subject,
        relation: Relation,
        object: &ObjectRef,
    ) -> CheckResult {
        let request = CheckRequest::new(subject.clone(), relation, object.clone());
        self.checker.check(&request).await
    }

    /// Plans the tuple delta of a resource event without staging it.
    pub async fn plan(&self, event: &ResourceEvent) -> DomainResult<TupleDelta> {
        self.lifecycle.plan(event).await
    }

    /// Plans the delta for `event` and stages it in `transaction`.
    #[instrument(skip(self, transaction, event), fields(event = event.name(), object = %event.object()))]
    pub async fn stage_event(
        &self,
        transaction: &mut Transaction,
        event: &ResourceEvent,
    ) -> DomainResult<TupleDelta> {
        let delta = self.plan(event).await?;
        stage_delta(transaction, &delta);
        Ok(delta)
    }

    /// Plans several events and stages their merged delta.
    pub async fn stage_events(
        &self,
        transaction: &mut Transaction,
        events: &[ResourceEvent],
    ) -> DomainResult<TupleDelta> {
        let mut delta = TupleDelta::default();
        for event in events {
            delta.merge(self.plan(event).await?);
        }
        // A tuple both written and deleted by the merged events ends up deleted.
        let writes = delta
            .writes
            .difference(&delta.deletes)
            .cloned()
            .collect();
        delta.writes = writes;
        stage_delta(transaction, &delta);
        Ok(delta)
    }

    /// Commits a transaction, mapping storage failures into the domain.
    pub async fn commit(&self, transaction: Transaction) -> DomainResult<CommitReceipt> {
        let receipt = self
            .store
            .commit(transaction)
            .await
            .map_err(map_storage_error)?;
        debug!(
            resources = receipt.resources_written,
            tuples_written = receipt.tuples_written,
            tuples_deleted = receipt.tuples_deleted,
            "transaction committed"
        );
        Ok(receipt)
    }

    /// Post-commit hook for a created resource.
    pub async fn on_resource_created(&self, resource: &Resource) -> DomainResult<TupleDelta> {
        self.apply_committed(ResourceEvent::Created(resource.clone()))
            .await
    }

    /// Post-commit hook for an updated resource.
    pub async fn on_resource_updated(
        &self,
        before: &Resource,
        after: &Resource,
    ) -> DomainResult<TupleDelta> {
        self.apply_committed(ResourceEvent::Updated {
            before: before.clone(),
            after: after.clone(),
        })
        .await
    }

    /// Post-commit hook for a deleted resource.
    pub async fn on_resource_deleted(&self, resource: &Resource) -> DomainResult<TupleDelta> {
        self.apply_committed(ResourceEvent::Deleted(resource.clone()))
            .await
    }

    /// Writes tuples directly.
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    pub async fn write_tuples(&self, tuples: &[Tuple]) -> DomainResult<()> {
        self.store
            .write_tuples(tuples.iter().map(to_stored).collect(), Vec::new())
            .await
            .map_err(map_storage_error)
    }

    /// Deletes tuples directly. Missing tuples are ignored.
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    pub async fn delete_tuples(&self, tuples: &[Tuple]) -> DomainResult<()> {
        self.store
            .write_tuples(Vec::new(), tuples.iter().map(to_stored).collect())
            .await
            .map_err(map_storage_error)
    }

    #[instrument(skip(self, event), fields(event = event.name(), object = %event.object()))]
    async fn apply_committed(&self, event: ResourceEvent) -> DomainResult<TupleDelta> {
        let result = match self.plan(&event).await {
            Ok(delta) => self
                .store
                .write_tuples(
                    delta.writes.iter().map(to_stored).collect(),
                    delta.deletes.iter().map(to_stored).collect(),
                )
                .await
                .map(|()| delta)
                .map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        result.map_err(|message| {
            error!(%message, "resource committed but its tuples were not written");
            DomainError::Consistency {
                object: event.object().to_string(),
                message,
            }
        })
    }
}

fn stage_delta(transaction: &mut Transaction, delta: &TupleDelta) {
    transaction.delete_tuples(delta.deletes.iter().map(to_stored));
    transaction.write_tuples(delta.writes.iter().map(to_stored));
}
