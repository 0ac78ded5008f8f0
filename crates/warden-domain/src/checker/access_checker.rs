//! Access checker for permission checks.
//!
//! Rules are tried in order and the first grant wins:
//!
//! 1. Wildcard tuple `(user:*, relation, object)`.
//! 2. Organization scope gate: an object owned by an organization outside
//!    the caller's credential is denied.
//! 3. Direct tuple naming the caller.
//! 4. Group tuple for a group the caller is a member of, unless that group
//!    is blocked on the object.
//! 5. Organization owner/admin asking for `owner`.
//! 6. Linked resources, read access only, bounded by `max_depth`.
//!
//! Anonymous trust-center visitors only ever take the visitor path.
//!
//! # Architecture Decisions
//!
//! - **Parallel Execution**: group and linked-resource branches are polled
//!   through `FuturesUnordered` and short-circuit on the first grant.
//! - **Fail Closed**: storage errors and timeouts deny and are logged;
//!   `check` never returns an error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::DomainResult;
use crate::identity::Subject;
use crate::model::{ObjectKind, ObjectRef, Relation, Tuple};

use super::config::CheckerConfig;
use super::context::TraversalContext;
use super::rules::LinkedResourceRules;
use super::traits::{TupleQuery, TupleReader};
use super::types::{CheckRequest, CheckResult, GrantPath};

/// Relations an anonymous visitor may ever be granted.
pub const ANONYMOUS_RELATIONS: &[Relation] = &[Relation::Viewer];

/// Type alias for boxed future to handle async recursion.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Decides whether a subject holds a relation on an object.
pub struct AccessChecker<T> {
    tuple_reader: Arc<T>,
    config: CheckerConfig,
    rules: LinkedResourceRules,
}

impl<T> AccessChecker<T>
where
    T: TupleReader + 'static,
{
    /// Creates a new checker with default configuration and rules.
    pub fn new(tuple_reader: Arc<T>) -> Self {
        Self::with_config(tuple_reader, CheckerConfig::default())
    }

    /// Creates a new checker with custom configuration.
    pub fn with_config(tuple_reader: Arc<T>, config: CheckerConfig) -> Self {
        Self {
            tuple_reader,
            config,
            rules: LinkedResourceRules::default(),
        }
    }

    /// Replaces the linked-resource registry.
    pub fn with_rules(mut self, rules: LinkedResourceRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub fn rules(&self) -> &LinkedResourceRules {
        &self.rules
    }

    /// Performs a permission check.
    ///
    /// Absent data, storage failures and timeouts all deny.
    #[instrument(skip(self, request), fields(
        subject = %request.subject.subject_ref(),
        relation = %request.relation,
        object = %request.object
    ))]
    pub async fn check(&self, request: &CheckRequest) -> CheckResult {
        match timeout(self.config.timeout, self.evaluate(request)).await {
            Ok(Ok(grant)) => {
                debug!(?grant, "check evaluated");
                grant.into()
            }
            Ok(Err(err)) => {
                warn!(error = %err, "check failed, denying");
                CheckResult::deny()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "check timed out, denying"
                );
                CheckResult::deny()
            }
        }
    }

    /// Shorthand for `check(..).allowed`.
    pub async fn is_allowed(&self, request: &CheckRequest) -> bool {
        self.check(request).await.allowed
    }

    async fn evaluate(&self, request: &CheckRequest) -> DomainResult<Option<GrantPath>> {
        if request.subject.is_anonymous() {
            return self
                .check_anonymous(&request.subject, request.relation, &request.object)
                .await;
        }
        let ctx = TraversalContext::new(&request.object);
        self.check_authenticated(&request.subject, request.relation, &request.object, ctx)
            .await
    }

    fn check_authenticated<'a>(
        &'a self,
        subject: &'a Subject,
        relation: Relation,
        object: &'a ObjectRef,
        ctx: TraversalContext,
    ) -> BoxFuture<'a, DomainResult<Option<GrantPath>>> {
        Box::pin(async move {
            if self
                .find_relation(&ObjectRef::wildcard(), relation, object)
                .await?
                .is_some()
            {
                return Ok(Some(GrantPath::Wildcard));
            }

            let owner = self.owning_organization(object).await?;
            if let Some(organization_id) = &owner {
                if !subject.is_scoped_to(organization_id) {
                    debug!(%object, %organization_id, "object outside subject scope");
                    return Ok(None);
                }
            }

            let subject_ref = subject.subject_ref();
            if let Some(relation) = self.find_relation(&subject_ref, relation, object).await? {
                return Ok(Some(GrantPath::Direct { relation }));
            }

            if let Some(grant) = self.check_groups(&subject_ref, relation, object).await? {
                return Ok(Some(grant));
            }

            if relation == Relation::Owner && object.kind != ObjectKind::Organization {
                if let Some(organization_id) = owner {
                    if self.holds_organization_role(&subject_ref, &organization_id).await? {
                        return Ok(Some(GrantPath::OrganizationOwner { organization_id }));
                    }
                }
            }

            if relation == Relation::Viewer {
                return self.check_linked(subject, object, ctx).await;
            }

            Ok(None)
        })
    }

    /// Returns the first stored relation on `object` that satisfies `relation`.
    async fn find_relation(
        &self,
        subject: &ObjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> DomainResult<Option<Relation>> {
        for candidate in relation.satisfied_by() {
            let tuple = Tuple::new(subject.clone(), *candidate, object.clone());
            if self.tuple_reader.tuple_exists(&tuple).await? {
                return Ok(Some(*candidate));
            }
        }
        Ok(None)
    }

    async fn owning_organization(&self, object: &ObjectRef) -> DomainResult<Option<String>> {
        if object.kind == ObjectKind::Organization {
            return Ok(Some(object.id.clone()));
        }
        let query = TupleQuery::for_object(object)
            .with_relation(Relation::Owner)
            .with_subject_kind(ObjectKind::Organization);
        let owners = self.tuple_reader.read_tuples(&query).await?;
        Ok(owners.into_iter().next().map(|t| t.subject.id))
    }

    async fn holds_organization_role(
        &self,
        subject: &ObjectRef,
        organization_id: &str,
    ) -> DomainResult<bool> {
        let organization = ObjectRef::organization(organization_id);
        for role in [Relation::Owner, Relation::Admin] {
            let tuple = Tuple::new(subject.clone(), role, organization.clone());
            if self.tuple_reader.tuple_exists(&tuple).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Group-transitive grant. A block on a group vetoes only that group.
    async fn check_groups(
        &self,
        subject: &ObjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> DomainResult<Option<GrantPath>> {
        let query = TupleQuery::for_subject(subject).with_relation(Relation::Member);
        let groups: Vec<ObjectRef> = self
            .tuple_reader
            .read_tuples(&query)
            .await?
            .into_iter()
            .filter(|t| t.object.kind == ObjectKind::Group)
            .map(|t| t.object)
            .collect();
        if groups.is_empty() {
            return Ok(None);
        }

        let mut futures: FuturesUnordered<_> = groups
            .iter()
            .map(|group| self.check_group(group, relation, object))
            .collect();

        let mut first_error = None;
        while let Some(result) = futures.next().await {
            match result {
                Ok(Some(grant)) => return Ok(Some(grant)),
                Ok(None) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    async fn check_group(
        &self,
        group: &ObjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> DomainResult<Option<GrantPath>> {
        let Some(granted) = self.find_relation(group, relation, object).await? else {
            return Ok(None);
        };
        let block = Tuple::new(group.clone(), Relation::Blocked, object.clone());
        if self.tuple_reader.tuple_exists(&block).await? {
            debug!(group = %group, %object, "group grant vetoed by block");
            return Ok(None);
        }
        Ok(Some(GrantPath::Group {
            group_id: group.id.clone(),
            relation: granted,
        }))
    }

    /// Read access through `(linked, associated_with, object)` tuples.
    async fn check_linked(
        &self,
        subject: &Subject,
        object: &ObjectRef,
        ctx: TraversalContext,
    ) -> DomainResult<Option<GrantPath>> {
        let kinds = self.rules.linked_kinds(object.kind);
        if kinds.is_empty() {
            return Ok(None);
        }
        if ctx.depth >= self.config.max_depth {
            debug!(%object, depth = ctx.depth, "linked resource depth limit reached");
            return Ok(None);
        }

        let query = TupleQuery::for_object(object).with_relation(Relation::AssociatedWith);
        let links: Vec<ObjectRef> = self
            .tuple_reader
            .read_tuples(&query)
            .await?
            .into_iter()
            .map(|t| t.subject)
            .filter(|link| kinds.contains(&link.kind) && !ctx.has_visited(link))
            .collect();

        let mut futures: FuturesUnordered<_> = links
            .iter()
            .map(|link| {
                let ctx = ctx.descend(link);
                async move {
                    let result = self
                        .check_authenticated(subject, Relation::Viewer, link, ctx)
                        .await;
                    (link, result)
                }
            })
            .collect();

        let mut first_error = None;
        while let Some((link, result)) = futures.next().await {
            match result {
                // A public linked object does not make its links public.
                Ok(Some(GrantPath::Wildcard)) | Ok(None) => {}
                Ok(Some(_)) => {
                    return Ok(Some(GrantPath::LinkedResource { via: link.clone() }));
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(None),
        }
    }

    async fn check_anonymous(
        &self,
        subject: &Subject,
        relation: Relation,
        object: &ObjectRef,
    ) -> DomainResult<Option<GrantPath>> {
        let Some(trust_center_id) = subject.trust_center_id() else {
            return Ok(None);
        };
        if !ANONYMOUS_RELATIONS.contains(&relation) || !object.kind.is_trust_center_scoped() {
            return Ok(None);
        }
        let trust_center = ObjectRef::new(ObjectKind::TrustCenter, trust_center_id);
        let wildcard = ObjectRef::wildcard();

        match object.kind {
            ObjectKind::TrustCenter => {
                Ok((object == &trust_center).then_some(GrantPath::TrustCenterVisitor))
            }
            ObjectKind::TrustCenterDoc => {
                if !self.is_associated(&trust_center, object).await? {
                    return Ok(None);
                }
                Ok(self
                    .find_relation(&wildcard, relation, object)
                    .await?
                    .map(|_| GrantPath::Wildcard))
            }
            ObjectKind::File => {
                let query = TupleQuery::for_object(object)
                    .with_relation(Relation::AssociatedWith)
                    .with_subject_kind(ObjectKind::TrustCenterDoc);
                let docs = self.tuple_reader.read_tuples(&query).await?;

                for doc in docs.into_iter().map(|t| t.subject) {
                    if !self.is_associated(&trust_center, &doc).await? {
                        continue;
                    }
                    if self
                        .find_relation(&wildcard, relation, object)
                        .await?
                        .is_some()
                    {
                        return Ok(Some(GrantPath::Wildcard));
                    }
                    // Protected document: metadata is public, the file needs the NDA.
                    let doc_visible = self
                        .find_relation(&wildcard, Relation::Viewer, &doc)
                        .await?
                        .is_some();
                    let nda = Tuple::new(
                        subject.subject_ref(),
                        Relation::NdaSigned,
                        trust_center.clone(),
                    );
                    if doc_visible && self.tuple_reader.tuple_exists(&nda).await? {
                        return Ok(Some(GrantPath::NdaSigned));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn is_associated(&self, parent: &ObjectRef, child: &ObjectRef) -> DomainResult<bool> {
        let tuple = Tuple::new(parent.clone(), Relation::AssociatedWith, child.clone());
        self.tuple_reader.tuple_exists(&tuple).await
    }
}
