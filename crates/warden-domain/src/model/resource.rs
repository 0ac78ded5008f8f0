//! Business objects as seen by the authorization core.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::types::{ObjectKind, ObjectRef};
use crate::error::{DomainError, DomainResult};
use crate::visibility::TrustCenterDocument;

/// Trust-center level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustCenterSettings {
    /// Watermarking default applied to documents created from now on.
    pub watermarking_default: bool,
}

/// An organization-owned object and the edges that drive its tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ObjectKind,
    pub id: String,
    pub organization_id: String,
    /// Row version assigned by the data store.
    #[serde(skip)]
    pub version: u64,
    /// Groups granted `editor`.
    #[serde(default)]
    pub editors: BTreeSet<String>,
    /// Groups granted `viewer`.
    #[serde(default)]
    pub viewers: BTreeSet<String>,
    /// Groups whose grants on this object are vetoed.
    #[serde(default)]
    pub blocked_groups: BTreeSet<String>,
    /// Objects this one is linked to; readers of a link may read this object.
    #[serde(default)]
    pub links: BTreeSet<ObjectRef>,
    /// Members of a group or organization.
    #[serde(default)]
    pub members: BTreeSet<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<TrustCenterDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_center: Option<TrustCenterSettings>,
}

impl Resource {
    pub fn new(kind: ObjectKind, id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            organization_id: organization_id.into(),
            version: 0,
            editors: BTreeSet::new(),
            viewers: BTreeSet::new(),
            blocked_groups: BTreeSet::new(),
            links: BTreeSet::new(),
            members: BTreeSet::new(),
            document: None,
            trust_center: None,
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind, self.id.clone())
    }

    /// All groups named by editor, viewer or blocked edges.
    pub fn referenced_groups(&self) -> BTreeSet<&str> {
        self.editors
            .iter()
            .chain(&self.viewers)
            .chain(&self.blocked_groups)
            .map(String::as_str)
            .collect()
    }

    /// Applies an edge update. Adding a present edge or removing an absent
    /// one is a no-op.
    ///
    /// Only groups and organizations have members; adding one elsewhere is
    /// rejected and leaves `self` untouched.
    pub fn apply_edges(&mut self, update: &EdgeUpdate) -> DomainResult<()> {
        if !update.add_members.is_empty()
            && !matches!(self.kind, ObjectKind::Group | ObjectKind::Organization)
        {
            return Err(DomainError::invalid_input(format!(
                "{} resources have no members",
                self.kind
            )));
        }

        fn apply<T: Ord + Clone>(set: &mut BTreeSet<T>, add: &[T], remove: &[T]) {
            for item in remove {
                set.remove(item);
            }
            set.extend(add.iter().cloned());
        }

        apply(&mut self.editors, &update.add_editors, &update.remove_editors);
        apply(&mut self.viewers, &update.add_viewers, &update.remove_viewers);
        apply(
            &mut self.blocked_groups,
            &update.add_blocked_groups,
            &update.remove_blocked_groups,
        );
        apply(&mut self.links, &update.add_links, &update.remove_links);
        apply(&mut self.members, &update.add_members, &update.remove_members);
        Ok(())
    }
}

/// Requested change to a resource's edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeUpdate {
    pub add_editors: Vec<String>,
    pub remove_editors: Vec<String>,
    pub add_viewers: Vec<String>,
    pub remove_viewers: Vec<String>,
    pub add_blocked_groups: Vec<String>,
    pub remove_blocked_groups: Vec<String>,
    pub add_links: Vec<ObjectRef>,
    pub remove_links: Vec<ObjectRef>,
    pub add_members: Vec<ObjectRef>,
    pub remove_members: Vec<ObjectRef>,
}

impl EdgeUpdate {
    pub fn is_empty(&self) -> bool {
        self.add_editors.is_empty()
            && self.remove_editors.is_empty()
            && self.add_viewers.is_empty()
            && self.remove_viewers.is_empty()
            && self.add_blocked_groups.is_empty()
            && self.remove_blocked_groups.is_empty()
            && self.add_links.is_empty()
            && self.remove_links.is_empty()
            && self.add_members.is_empty()
            && self.remove_members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_edges_is_idempotent() {
        let mut resource = Resource::new(ObjectKind::Control, "c1", "org1");
        let update = EdgeUpdate {
            add_editors: vec!["eng".to_string()],
            ..Default::default()
        };

        resource.apply_edges(&update).unwrap();
        resource.apply_edges(&update).unwrap();

        assert_eq!(resource.editors.len(), 1);
    }

    #[test]
    fn test_apply_edges_removes_then_adds() {
        let mut resource = Resource::new(ObjectKind::Control, "c1", "org1");
        resource.viewers.insert("ops".to_string());

        resource.apply_edges(&EdgeUpdate {
            remove_viewers: vec!["ops".to_string(), "missing".to_string()],
            add_blocked_groups: vec!["ops".to_string()],
            ..Default::default()
        })
        .unwrap();

        assert!(resource.viewers.is_empty());
        assert_eq!(resource.referenced_groups(), BTreeSet::from(["ops"]));
    }

    #[test]
    fn test_members_only_on_groups_and_organizations() {
        let add = EdgeUpdate {
            add_members: vec![ObjectRef::new(ObjectKind::User, "alice")],
            ..Default::default()
        };
        let mut control = Resource::new(ObjectKind::Control, "c1", "org1");

        let err = control.apply_edges(&add).unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput { .. }));
        assert!(control.members.is_empty());

        for kind in [ObjectKind::Group, ObjectKind::Organization] {
            let mut resource = Resource::new(kind, "x", "org1");
            resource.apply_edges(&add).unwrap();
            assert_eq!(resource.members.len(), 1);
        }
    }

    #[test]
    fn test_version_is_not_serialized() {
        let mut resource = Resource::new(ObjectKind::Risk, "r1", "org1");
        resource.version = 7;

        let json = serde_json::to_value(&resource).unwrap();
        assert!(json.get("version").is_none());

        let back: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(back.version, 0);
        assert_eq!(back.kind, ObjectKind::Risk);
    }
}
