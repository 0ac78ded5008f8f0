//! Resource mutation coordinator.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use ulid::Ulid;
use warden_domain::error::{DomainError, DomainResult};
use warden_domain::identity::Subject;
use warden_domain::lifecycle::ResourceEvent;
use warden_domain::model::{EdgeUpdate, ObjectKind, ObjectRef, Resource};
use warden_storage::{DataStore, ResourceFilter, Transaction};

use super::{creation_scope, load, load_editable, load_visible};
use crate::adapters::{map_storage_error, resource_from_stored, resource_to_stored};
use crate::authz::Authz;

/// Input for creating a resource.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub kind: ObjectKind,
    /// Generated when absent.
    pub id: Option<String>,
    /// Defaults to the caller's active organization.
    pub organization_id: Option<String>,
    pub editors: Vec<String>,
    pub viewers: Vec<String>,
    pub blocked_groups: Vec<String>,
    pub links: Vec<ObjectRef>,
    pub members: Vec<ObjectRef>,
}

impl NewResource {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            id: None,
            organization_id: None,
            editors: Vec::new(),
            viewers: Vec::new(),
            blocked_groups: Vec::new(),
            links: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_editor(mut self, group: impl Into<String>) -> Self {
        self.editors.push(group.into());
        self
    }

    pub fn with_viewer(mut self, group: impl Into<String>) -> Self {
        self.viewers.push(group.into());
        self
    }

    pub fn with_blocked_group(mut self, group: impl Into<String>) -> Self {
        self.blocked_groups.push(group.into());
        self
    }

    pub fn with_link(mut self, link: ObjectRef) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_member(mut self, member: ObjectRef) -> Self {
        self.members.push(member);
        self
    }

    fn edges(&self) -> EdgeUpdate {
        EdgeUpdate {
            add_editors: self.editors.clone(),
            add_viewers: self.viewers.clone(),
            add_blocked_groups: self.blocked_groups.clone(),
            add_links: self.links.clone(),
            add_members: self.members.clone(),
            ..Default::default()
        }
    }
}

/// Creates, reads, updates and deletes organization-owned resources.
///
/// Trust centers and their documents go through `TrustCenterService`.
pub struct ResourceService<S> {
    authz: Arc<Authz<S>>,
}

impl<S: DataStore> ResourceService<S> {
    pub fn new(authz: Arc<Authz<S>>) -> Self {
        Self { authz }
    }

    /// Creates a resource together with its tuples.
    #[instrument(skip(self, subject, input), fields(kind = %input.kind))]
    pub async fn create(&self, subject: &Subject, input: NewResource) -> DomainResult<Resource> {
        if !input.kind.is_organization_owned()
            || matches!(
                input.kind,
                ObjectKind::TrustCenter | ObjectKind::TrustCenterDoc
            )
        {
            return Err(DomainError::invalid_input(format!(
                "{} resources cannot be created here",
                input.kind
            )));
        }
        let organization_id =
            creation_scope(&self.authz, subject, input.organization_id.as_deref(), input.kind)
                .await?;

        let id = input.id.clone().unwrap_or_else(|| Ulid::new().to_string());
        let mut resource = Resource::new(input.kind, id, organization_id);
        let edges = input.edges();
        self.authorize_links(subject, resource.kind, &edges.add_links)
            .await?;
        resource.apply_edges(&edges)?;

        let mut transaction = Transaction::new();
        transaction.insert_resource(resource_to_stored(&resource)?);
        self.authz
            .stage_event(&mut transaction, &ResourceEvent::Created(resource.clone()))
            .await?;
        self.authz.commit(transaction).await?;

        info!(object = %resource.object_ref(), "resource created");
        load(&self.authz, &resource.object_ref()).await
    }

    /// Reads a resource the caller can view.
    pub async fn get(&self, subject: &Subject, object: &ObjectRef) -> DomainResult<Resource> {
        load_visible(&self.authz, subject, object).await
    }

    /// Adds and removes group, link and member edges.
    #[instrument(skip(self, subject, update), fields(object = %object))]
    pub async fn update_edges(
        &self,
        subject: &Subject,
        object: &ObjectRef,
        update: EdgeUpdate,
    ) -> DomainResult<Resource> {
        let before = load_editable(&self.authz, subject, object, "update").await?;
        self.authorize_links(subject, before.kind, &update.add_links)
            .await?;

        let mut after = before.clone();
        after.apply_edges(&update)?;
        if after == before {
            debug!("edge update changes nothing");
            return Ok(before);
        }

        let mut transaction = Transaction::new();
        transaction.update_resource(resource_to_stored(&after)?, before.version);
        self.authz
            .stage_event(
                &mut transaction,
                &ResourceEvent::Updated { before, after },
            )
            .await?;
        self.authz.commit(transaction).await?;

        load(&self.authz, object).await
    }

    /// Hard-deletes a resource and every tuple that references it.
    ///
    /// Deleting a trust center also deletes its documents.
    #[instrument(skip(self, subject), fields(object = %object))]
    pub async fn delete(&self, subject: &Subject, object: &ObjectRef) -> DomainResult<()> {
        let resource = load_editable(&self.authz, subject, object, "delete").await?;

        let mut events = Vec::new();
        if resource.kind == ObjectKind::TrustCenter {
            events.extend(
                self.trust_center_documents(&resource)
                    .await?
                    .into_iter()
                    .map(ResourceEvent::Deleted),
            );
        }
        let mut transaction = Transaction::new();
        if resource.kind == ObjectKind::Group {
            for (before, after) in self.group_references(&resource).await? {
                transaction.update_resource(resource_to_stored(&after)?, before.version);
                events.push(ResourceEvent::Updated { before, after });
            }
        }
        events.push(ResourceEvent::Deleted(resource));

        for event in &events {
            if let ResourceEvent::Deleted(deleted) = event {
                transaction.delete_resource(deleted.kind.as_str(), deleted.id.clone());
            }
        }
        let delta = self.authz.stage_events(&mut transaction, &events).await?;
        self.authz.commit(transaction).await?;

        info!(
            resources = events.len(),
            tuples = delta.deletes.len(),
            "resource deleted"
        );
        Ok(())
    }

    /// A new link must be allowed by the registry and editable by the caller.
    async fn authorize_links(
        &self,
        subject: &Subject,
        kind: ObjectKind,
        links: &[ObjectRef],
    ) -> DomainResult<()> {
        for link in links {
            if !self.authz.rules().allows(kind, link.kind) {
                return Err(DomainError::invalid_input(format!(
                    "{kind} cannot be linked to {}",
                    link.kind
                )));
            }
            load_editable(&self.authz, subject, link, "link").await?;
        }
        Ok(())
    }

    /// Resources of the group's organization that name it, paired with the
    /// same resource with the group pruned.
    async fn group_references(&self, group: &Resource) -> DomainResult<Vec<(Resource, Resource)>> {
        let filter = ResourceFilter {
            kind: None,
            organization_id: Some(group.organization_id.clone()),
        };
        let rows = self
            .authz
            .store()
            .query_resources(&filter)
            .await
            .map_err(map_storage_error)?;

        let prune = EdgeUpdate {
            remove_editors: vec![group.id.clone()],
            remove_viewers: vec![group.id.clone()],
            remove_blocked_groups: vec![group.id.clone()],
            remove_members: vec![group.object_ref()],
            ..Default::default()
        };
        let mut pruned = Vec::new();
        for row in &rows {
            let before = resource_from_stored(row)?;
            if before.object_ref() == group.object_ref() {
                continue;
            }
            let mut after = before.clone();
            after.apply_edges(&prune)?;
            if after != before {
                pruned.push((before, after));
            }
        }
        Ok(pruned)
    }

    async fn trust_center_documents(&self, trust_center: &Resource) -> DomainResult<Vec<Resource>> {
        let filter = ResourceFilter {
            kind: Some(ObjectKind::TrustCenterDoc.as_str().to_string()),
            organization_id: Some(trust_center.organization_id.clone()),
        };
        let rows = self
            .authz
            .store()
            .query_resources(&filter)
            .await
            .map_err(map_storage_error)?;

        let mut documents = Vec::new();
        for row in &rows {
            let document = resource_from_stored(row)?;
            let belongs = document
                .document
                .as_ref()
                .is_some_and(|d| d.trust_center_id == trust_center.id);
            if belongs {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}
