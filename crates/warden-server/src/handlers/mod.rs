//! Mutation coordinators and check handlers.
//!
//! Every coordinator follows the same sequence: authorize, build the next
//! resource state, stage the row and its tuple delta in one transaction,
//! commit.

pub mod batch;
pub mod resources;
pub mod trust_center;

use warden_domain::error::{DomainError, DomainResult};
use warden_domain::identity::Subject;
use warden_domain::model::{ObjectKind, ObjectRef, Relation, Resource};
use warden_storage::DataStore;

use crate::adapters::{map_storage_error, resource_from_stored};
use crate::authz::Authz;

pub use resources::{NewResource, ResourceService};
pub use trust_center::{
    DocumentUpdate, DocumentView, NewTrustCenter, NewTrustCenterDocument, TrustCenterService,
};

fn not_found(object: &ObjectRef) -> DomainError {
    DomainError::not_found(object.kind.as_str(), object.id.clone())
}

/// Reads a resource row without any access check.
pub(crate) async fn load<S: DataStore>(
    authz: &Authz<S>,
    object: &ObjectRef,
) -> DomainResult<Resource> {
    let stored = authz
        .store()
        .get_resource(object.kind.as_str(), &object.id)
        .await
        .map_err(map_storage_error)?;
    resource_from_stored(&stored)
}

/// Loads a resource the caller can read. Absent and unreadable both fail
/// with `NotFound`.
pub(crate) async fn load_visible<S: DataStore>(
    authz: &Authz<S>,
    subject: &Subject,
    object: &ObjectRef,
) -> DomainResult<Resource> {
    if !authz.check(subject, Relation::Viewer, object).await {
        return Err(not_found(object));
    }
    load(authz, object).await
}

/// Loads a resource the caller can edit. A readable but not editable
/// resource fails with `NotAuthorized`.
pub(crate) async fn load_editable<S: DataStore>(
    authz: &Authz<S>,
    subject: &Subject,
    object: &ObjectRef,
    action: &str,
) -> DomainResult<Resource> {
    let resource = load_visible(authz, subject, object).await?;
    if !authz.check(subject, Relation::Editor, object).await {
        return Err(DomainError::not_authorized(format!("{action} {object}")));
    }
    Ok(resource)
}

/// Resolves the organization a new object of `kind` is created in and
/// verifies the caller may create objects there.
pub(crate) async fn creation_scope<S: DataStore>(
    authz: &Authz<S>,
    subject: &Subject,
    requested: Option<&str>,
    kind: ObjectKind,
) -> DomainResult<String> {
    if subject.is_anonymous() {
        return Err(DomainError::not_authorized(format!("create {kind}")));
    }
    let organization_id = requested
        .or_else(|| subject.active_organization())
        .ok_or_else(|| DomainError::invalid_input("organization could not be determined"))?
        .to_string();
    if !subject.is_scoped_to(&organization_id) {
        return Err(DomainError::not_found("organization", organization_id));
    }

    // Service tokens are bound to the organization by their credential.
    if matches!(subject, Subject::ServiceToken { .. }) {
        return Ok(organization_id);
    }
    let organization = ObjectRef::organization(&organization_id);
    if !authz.check(subject, Relation::Member, &organization).await {
        return Err(DomainError::not_authorized(format!(
            "create {kind} in {organization}"
        )));
    }
    Ok(organization_id)
}
