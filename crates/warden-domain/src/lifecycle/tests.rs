use std::collections::BTreeSet;
use std::sync::Arc;

use super::*;
use crate::checker::tests::mocks::{obj, tuple, MockTupleReader};
use crate::model::EdgeUpdate;
use crate::visibility::{
    DocumentPatch, GrantEffect, NewDocument, TrustCenterDocument, Visibility, VisibilityTransition,
};

async fn reader_with_groups(groups: &[&str]) -> Arc<MockTupleReader> {
    let reader = Arc::new(MockTupleReader::new());
    for group in groups {
        reader
            .add("organization:org1", Relation::Owner, &format!("group:{group}"))
            .await;
    }
    reader
}

fn control() -> Resource {
    Resource::new(ObjectKind::Control, "c1", "org1")
}

fn wildcards(tuples: &BTreeSet<Tuple>) -> BTreeSet<String> {
    tuples
        .iter()
        .filter(|t| t.subject.is_wildcard())
        .map(|t| t.object.to_string())
        .collect()
}

fn doc(visibility: Visibility) -> Resource {
    let mut resource = Resource::new(ObjectKind::TrustCenterDoc, "d1", "org1");
    resource.document = Some(
        TrustCenterDocument::create(
            NewDocument {
                trust_center_id: "tc1".to_string(),
                file_id: Some("f1".to_string()),
                visibility: Some(visibility),
                watermarking_enabled: None,
            },
            false,
        )
        .document,
    );
    resource
}

fn with_patch(resource: &Resource, patch: DocumentPatch) -> Resource {
    let mut next = resource.clone();
    next.document = resource
        .document
        .as_ref()
        .map(|document| document.apply_patch(patch).document);
    next
}

#[tokio::test]
async fn test_create_writes_owner_and_group_tuples() {
    let reader = reader_with_groups(&["eng", "ops"]).await;
    let manager = TupleLifecycleManager::new(reader);
    let mut resource = control();
    resource.editors.insert("eng".to_string());
    resource.blocked_groups.insert("ops".to_string());

    let delta = manager
        .plan(&ResourceEvent::Created(resource))
        .await
        .unwrap();

    assert_eq!(
        delta.writes,
        BTreeSet::from([
            tuple("organization:org1", Relation::Owner, "control:c1"),
            tuple("group:eng", Relation::Editor, "control:c1"),
            tuple("group:ops", Relation::Blocked, "control:c1"),
        ])
    );
    assert!(delta.deletes.is_empty());
}

#[tokio::test]
async fn test_create_with_foreign_group_is_not_authorized() {
    let reader = reader_with_groups(&["eng"]).await;
    reader
        .add("organization:org2", Relation::Owner, "group:theirs")
        .await;
    let manager = TupleLifecycleManager::new(reader);
    let mut resource = control();
    resource.editors.insert("eng".to_string());
    resource.viewers.insert("theirs".to_string());

    let result = manager.plan(&ResourceEvent::Created(resource)).await;

    assert!(matches!(result, Err(DomainError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_regranting_present_group_is_empty_delta() {
    let reader = reader_with_groups(&["eng"]).await;
    let manager = TupleLifecycleManager::new(reader);
    let mut before = control();
    before.editors.insert("eng".to_string());
    let mut after = before.clone();
    after.apply_edges(&EdgeUpdate {
        add_editors: vec!["eng".to_string()],
        ..Default::default()
    })
    .unwrap();

    let delta = manager
        .plan(&ResourceEvent::Updated { before, after })
        .await
        .unwrap();

    assert!(delta.is_empty());
}

#[tokio::test]
async fn test_edge_update_writes_exact_delta() {
    let reader = reader_with_groups(&["eng", "ops"]).await;
    let manager = TupleLifecycleManager::new(reader);
    let mut before = control();
    before.editors.insert("eng".to_string());
    let mut after = before.clone();
    after.apply_edges(&EdgeUpdate {
        remove_editors: vec!["eng".to_string()],
        add_viewers: vec!["ops".to_string()],
        add_links: vec![obj("program:p1")],
        ..Default::default()
    })
    .unwrap();

    let delta = manager
        .plan(&ResourceEvent::Updated { before, after })
        .await
        .unwrap();

    assert_eq!(
        delta.writes,
        BTreeSet::from([
            tuple("group:ops", Relation::Viewer, "control:c1"),
            tuple("program:p1", Relation::AssociatedWith, "control:c1"),
        ])
    );
    assert_eq!(
        delta.deletes,
        BTreeSet::from([tuple("group:eng", Relation::Editor, "control:c1")])
    );
}

#[tokio::test]
async fn test_update_cannot_move_resource_between_orgs() {
    let manager = TupleLifecycleManager::new(Arc::new(MockTupleReader::new()));
    let before = control();
    let mut after = control();
    after.organization_id = "org2".to_string();

    let result = manager
        .plan(&ResourceEvent::Updated { before, after })
        .await;

    assert!(matches!(result, Err(DomainError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_group_members_become_member_tuples() {
    let reader = Arc::new(MockTupleReader::new());
    let manager = TupleLifecycleManager::new(reader);
    let mut group = Resource::new(ObjectKind::Group, "eng", "org1");
    group.members.insert(obj("user:alice"));
    group.members.insert(obj("service:tok1"));

    let delta = manager.plan(&ResourceEvent::Created(group)).await.unwrap();

    assert!(delta
        .writes
        .contains(&tuple("user:alice", Relation::Member, "group:eng")));
    assert!(delta
        .writes
        .contains(&tuple("service:tok1", Relation::Member, "group:eng")));
    assert!(delta
        .writes
        .contains(&tuple("organization:org1", Relation::Owner, "group:eng")));
}

#[test]
fn test_visibility_transitions_follow_table() {
    let not_visible = desired_tuples(&doc(Visibility::NotVisible));
    let protected = desired_tuples(&doc(Visibility::Protected));
    let public = desired_tuples(&doc(Visibility::PubliclyVisible));

    assert!(wildcards(&not_visible).is_empty());
    assert_eq!(
        wildcards(&protected),
        BTreeSet::from(["trust_center_doc:d1".to_string()])
    );
    assert_eq!(
        wildcards(&public),
        BTreeSet::from(["trust_center_doc:d1".to_string(), "file:f1".to_string()])
    );
    // Association tuples do not depend on visibility.
    assert!(not_visible.contains(&tuple(
        "trust_center:tc1",
        Relation::AssociatedWith,
        "trust_center_doc:d1"
    )));
    assert!(not_visible.contains(&tuple(
        "trust_center_doc:d1",
        Relation::AssociatedWith,
        "file:f1"
    )));
}

#[tokio::test]
async fn test_visibility_round_trip_leaves_no_wildcards() {
    let reader = Arc::new(MockTupleReader::new());
    let manager = TupleLifecycleManager::new(Arc::clone(&reader));

    let created = doc(Visibility::NotVisible);
    let delta = manager
        .plan(&ResourceEvent::Created(created.clone()))
        .await
        .unwrap();
    reader.insert_all(delta.writes).await;

    let mut current = created;
    for visibility in [
        Visibility::PubliclyVisible,
        Visibility::Protected,
        Visibility::NotVisible,
    ] {
        let next = with_patch(
            &current,
            DocumentPatch {
                visibility: Some(visibility),
                ..Default::default()
            },
        );
        let delta = manager
            .plan(&ResourceEvent::Updated {
                before: current,
                after: next.clone(),
            })
            .await
            .unwrap();
        for t in &delta.deletes {
            reader
                .remove(
                    &t.subject.to_string(),
                    t.relation,
                    &t.object.to_string(),
                )
                .await;
        }
        reader.insert_all(delta.writes).await;
        current = next;
    }

    let wildcard_tuples = reader
        .read_tuples(&TupleQuery::for_subject(&ObjectRef::wildcard()))
        .await
        .unwrap();
    assert!(wildcard_tuples.is_empty());
}

#[tokio::test]
async fn test_planned_wildcards_agree_with_transition_table() {
    let manager = TupleLifecycleManager::new(Arc::new(MockTupleReader::new()));
    let states = [
        Visibility::NotVisible,
        Visibility::Protected,
        Visibility::PubliclyVisible,
    ];

    for old in states {
        for new in states {
            let before = doc(old);
            let after = with_patch(
                &before,
                DocumentPatch {
                    visibility: Some(new),
                    ..Default::default()
                },
            );
            let delta = manager
                .plan(&ResourceEvent::Updated { before, after })
                .await
                .unwrap();
            let written = wildcards(&delta.writes);
            let deleted = wildcards(&delta.deletes);
            let effect = |object: &str, held: bool| {
                match (written.contains(object), deleted.contains(object), held) {
                    (true, false, false) => GrantEffect::Create,
                    (false, true, true) => GrantEffect::Delete,
                    (false, false, true) => GrantEffect::Keep,
                    (false, false, false) => GrantEffect::None,
                    other => panic!("{old:?} -> {new:?}: inconsistent delta {other:?}"),
                }
            };

            let planned = VisibilityTransition {
                doc: effect("trust_center_doc:d1", old.grants_doc()),
                file: effect("file:f1", old.grants_file()),
            };
            assert_eq!(
                planned,
                VisibilityTransition::between(old, new),
                "{old:?} -> {new:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_watermark_completion_moves_file_grant() {
    let manager = TupleLifecycleManager::new(Arc::new(MockTupleReader::new()));
    let before = doc(Visibility::PubliclyVisible);
    let before = with_patch(
        &before,
        DocumentPatch {
            watermarking_enabled: Some(true),
            ..Default::default()
        },
    );
    let mut after = before.clone();
    after.document = before
        .document
        .as_ref()
        .map(|document| document.complete_watermark("f1-wm").unwrap());

    let delta = manager
        .plan(&ResourceEvent::Updated { before, after })
        .await
        .unwrap();

    assert!(delta
        .deletes
        .contains(&tuple("user:*", Relation::Viewer, "file:f1")));
    assert!(delta
        .writes
        .contains(&tuple("user:*", Relation::Viewer, "file:f1-wm")));
    assert!(delta.writes.contains(&tuple(
        "trust_center_doc:d1",
        Relation::AssociatedWith,
        "file:f1-wm"
    )));
}

#[tokio::test]
async fn test_delete_removes_every_referencing_tuple() {
    let reader = reader_with_groups(&["g1", "g2", "g3", "g4"]).await;
    let mut resource = control();
    for group in ["g1", "g2", "g3"] {
        resource.editors.insert(group.to_string());
    }
    resource.viewers.insert("g4".to_string());

    let manager = TupleLifecycleManager::new(Arc::clone(&reader));
    let created = manager
        .plan(&ResourceEvent::Created(resource.clone()))
        .await
        .unwrap();
    reader.insert_all(created.writes).await;
    // Tuples written outside the lifecycle still go.
    reader.add("user:alice", Relation::Viewer, "control:c1").await;
    reader
        .add("control:c1", Relation::AssociatedWith, "evidence:e1")
        .await;

    let delta = manager
        .plan(&ResourceEvent::Deleted(resource))
        .await
        .unwrap();

    let object = obj("control:c1");
    assert!(delta.writes.is_empty());
    assert_eq!(delta.deletes.len(), 7);
    assert!(delta.deletes.iter().all(|t| t.references(&object)));
}
