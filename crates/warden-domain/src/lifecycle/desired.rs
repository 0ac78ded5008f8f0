//! Desired tuple set of a resource.

use std::collections::BTreeSet;

use crate::model::{ObjectKind, ObjectRef, Relation, Resource, Tuple};

/// Tuples a resource in its current state requires.
///
/// - `(organization, owner, resource)` for organization-owned kinds
/// - `(group, editor|viewer|blocked, resource)` per group edge
/// - `(link, associated_with, resource)` per linked object
/// - `(member, member, resource)` for groups and organizations
/// - for trust-center documents, the association with the trust center and
///   the served file plus the wildcard grants of the current visibility
pub fn desired_tuples(resource: &Resource) -> BTreeSet<Tuple> {
    let object = resource.object_ref();
    let mut tuples = BTreeSet::new();

    if resource.kind.is_organization_owned() {
        tuples.insert(Tuple::new(
            ObjectRef::organization(&resource.organization_id),
            Relation::Owner,
            object.clone(),
        ));
    }

    let group_edges = [
        (&resource.editors, Relation::Editor),
        (&resource.viewers, Relation::Viewer),
        (&resource.blocked_groups, Relation::Blocked),
    ];
    for (groups, relation) in group_edges {
        tuples.extend(
            groups
                .iter()
                .map(|group| Tuple::new(ObjectRef::group(group), relation, object.clone())),
        );
    }

    tuples.extend(
        resource
            .links
            .iter()
            .map(|link| Tuple::new(link.clone(), Relation::AssociatedWith, object.clone())),
    );

    if matches!(resource.kind, ObjectKind::Group | ObjectKind::Organization) {
        tuples.extend(
            resource
                .members
                .iter()
                .map(|member| Tuple::new(member.clone(), Relation::Member, object.clone())),
        );
    }

    if let Some(document) = &resource.document {
        tuples.insert(Tuple::new(
            ObjectRef::new(ObjectKind::TrustCenter, &document.trust_center_id),
            Relation::AssociatedWith,
            object.clone(),
        ));
        if let Some(file_id) = &document.file_id {
            tuples.insert(Tuple::new(
                object.clone(),
                Relation::AssociatedWith,
                ObjectRef::new(ObjectKind::File, file_id),
            ));
        }

        let grants = document.wildcard_grants();
        if grants.doc {
            tuples.insert(Tuple::new(
                ObjectRef::wildcard(),
                Relation::Viewer,
                object.clone(),
            ));
        }
        if let Some(file_id) = grants.file {
            tuples.insert(Tuple::new(
                ObjectRef::wildcard(),
                Relation::Viewer,
                ObjectRef::new(ObjectKind::File, file_id),
            ));
        }
    }

    tuples
}
