//! Access checker test suite.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::mocks::{obj, user, visitor, FailingTupleReader, MockTupleReader, SlowTupleReader};
use crate::checker::{AccessChecker, CheckRequest, CheckerConfig, GrantPath};
use crate::identity::Subject;
use crate::model::Relation;

async fn check(
    reader: &Arc<MockTupleReader>,
    subject: &Subject,
    relation: Relation,
    object: &str,
) -> Option<GrantPath> {
    let checker = AccessChecker::new(Arc::clone(reader));
    checker
        .check(&CheckRequest::new(subject.clone(), relation, obj(object)))
        .await
        .grant
}

/// control:c1 owned by org1.
async fn org1_control() -> Arc<MockTupleReader> {
    let reader = Arc::new(MockTupleReader::new());
    reader
        .add("organization:org1", Relation::Owner, "control:c1")
        .await;
    reader
}

// ========== Section 1: Wildcard, Direct and Implied Relations ==========

#[tokio::test]
async fn test_absent_data_denies() {
    let reader = Arc::new(MockTupleReader::new());
    let grant = check(&reader, &user("alice", "org1"), Relation::Viewer, "control:c1").await;
    assert_eq!(grant, None);
}

#[tokio::test]
async fn test_wildcard_grant_allows_anyone() {
    let reader = org1_control().await;
    reader.add("user:*", Relation::Viewer, "control:c1").await;

    // Wildcard applies before the organization scope gate.
    let grant = check(&reader, &user("bob", "org2"), Relation::Viewer, "control:c1").await;
    assert_eq!(grant, Some(GrantPath::Wildcard));
}

#[tokio::test]
async fn test_direct_grant() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Viewer, "control:c1").await;

    let grant = check(&reader, &user("alice", "org1"), Relation::Viewer, "control:c1").await;
    assert_eq!(
        grant,
        Some(GrantPath::Direct {
            relation: Relation::Viewer
        })
    );
}

#[tokio::test]
async fn test_editor_implies_viewer_but_not_owner() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Editor, "control:c1").await;
    let alice = user("alice", "org1");

    assert_eq!(
        check(&reader, &alice, Relation::Viewer, "control:c1").await,
        Some(GrantPath::Direct {
            relation: Relation::Editor
        })
    );
    assert_eq!(check(&reader, &alice, Relation::Owner, "control:c1").await, None);
}

// ========== Section 2: Group Transitivity ==========

#[tokio::test]
async fn test_group_member_inherits_group_grant() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Member, "group:eng").await;
    reader.add("group:eng", Relation::Editor, "control:c1").await;

    let grant = check(&reader, &user("alice", "org1"), Relation::Editor, "control:c1").await;
    assert_eq!(
        grant,
        Some(GrantPath::Group {
            group_id: "eng".to_string(),
            relation: Relation::Editor,
        })
    );
}

#[tokio::test]
async fn test_block_vetoes_only_that_group() {
    let reader = org1_control().await;
    let alice = user("alice", "org1");
    reader.add("user:alice", Relation::Member, "group:eng").await;
    reader.add("group:eng", Relation::Editor, "control:c1").await;
    reader.add("group:eng", Relation::Blocked, "control:c1").await;

    assert_eq!(check(&reader, &alice, Relation::Editor, "control:c1").await, None);

    reader.add("user:alice", Relation::Member, "group:ops").await;
    reader.add("group:ops", Relation::Editor, "control:c1").await;

    assert_eq!(
        check(&reader, &alice, Relation::Editor, "control:c1").await,
        Some(GrantPath::Group {
            group_id: "ops".to_string(),
            relation: Relation::Editor,
        })
    );
}

#[tokio::test]
async fn test_non_member_gets_nothing_from_group() {
    let reader = org1_control().await;
    reader.add("group:eng", Relation::Viewer, "control:c1").await;

    let grant = check(&reader, &user("alice", "org1"), Relation::Viewer, "control:c1").await;
    assert_eq!(grant, None);
}

// ========== Section 3: Organization Scope and Owner Shortcut ==========

#[tokio::test]
async fn test_subject_outside_owning_org_is_denied_even_with_tuple() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Editor, "control:c1").await;

    for relation in [Relation::Owner, Relation::Editor, Relation::Viewer] {
        let grant = check(&reader, &user("alice", "org2"), relation, "control:c1").await;
        assert_eq!(grant, None, "{relation} should be denied");
    }
}

#[tokio::test]
async fn test_pat_reaches_every_minted_org() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Viewer, "control:c1").await;

    let pat = Subject::PersonalAccessTokenHolder {
        user_id: "alice".to_string(),
        organization_ids: BTreeSet::from(["org1".to_string(), "org2".to_string()]),
        active_organization_id: Some("org2".to_string()),
    };

    assert!(check(&reader, &pat, Relation::Viewer, "control:c1").await.is_some());
}

#[tokio::test]
async fn test_org_owner_and_admin_get_owner_only() {
    let reader = org1_control().await;
    reader.add("user:olive", Relation::Owner, "organization:org1").await;
    reader.add("user:adam", Relation::Admin, "organization:org1").await;

    for name in ["olive", "adam"] {
        let subject = user(name, "org1");
        assert_eq!(
            check(&reader, &subject, Relation::Owner, "control:c1").await,
            Some(GrantPath::OrganizationOwner {
                organization_id: "org1".to_string()
            })
        );
        assert_eq!(check(&reader, &subject, Relation::Editor, "control:c1").await, None);
        assert_eq!(check(&reader, &subject, Relation::Viewer, "control:c1").await, None);
    }
}

#[tokio::test]
async fn test_owner_of_other_org_gets_no_shortcut() {
    let reader = org1_control().await;
    reader.add("user:olive", Relation::Owner, "organization:org2").await;

    let grant = check(&reader, &user("olive", "org2"), Relation::Owner, "control:c1").await;
    assert_eq!(grant, None);
}

#[tokio::test]
async fn test_service_token_has_no_implicit_access() {
    let reader = org1_control().await;
    let service = Subject::ServiceToken {
        token_id: "tok1".to_string(),
        organization_id: "org1".to_string(),
    };

    assert_eq!(check(&reader, &service, Relation::Viewer, "control:c1").await, None);

    reader.add("service:tok1", Relation::Member, "group:bots").await;
    reader.add("group:bots", Relation::Viewer, "control:c1").await;
    assert!(check(&reader, &service, Relation::Viewer, "control:c1").await.is_some());
}

// ========== Section 4: Linked Resources ==========

#[tokio::test]
async fn test_control_viewer_reads_linked_evidence() {
    let reader = org1_control().await;
    reader
        .add("organization:org1", Relation::Owner, "evidence:e1")
        .await;
    reader
        .add("control:c1", Relation::AssociatedWith, "evidence:e1")
        .await;
    reader.add("user:alice", Relation::Viewer, "control:c1").await;
    let alice = user("alice", "org1");

    assert_eq!(
        check(&reader, &alice, Relation::Viewer, "evidence:e1").await,
        Some(GrantPath::LinkedResource {
            via: obj("control:c1")
        })
    );
    // Linked access is read-only.
    assert_eq!(check(&reader, &alice, Relation::Editor, "evidence:e1").await, None);
    assert_eq!(
        check(&reader, &user("stranger", "org1"), Relation::Viewer, "evidence:e1").await,
        None
    );
}

#[tokio::test]
async fn test_links_of_undeclared_kinds_are_ignored() {
    let reader = org1_control().await;
    reader.add("user:alice", Relation::Viewer, "control:c1").await;
    // control -> organization is not a declared rule.
    reader
        .add("control:c1", Relation::AssociatedWith, "organization:org1")
        .await;

    let grant = check(&reader, &user("alice", "org1"), Relation::Viewer, "organization:org1").await;
    assert_eq!(grant, None);
}

#[tokio::test]
async fn test_linked_recursion_respects_depth_and_cycles() {
    let reader = Arc::new(MockTupleReader::new());
    // file <- evidence <- control <- program. The reverse control -> program
    // link is not a declared rule for programs.
    reader
        .add("evidence:e1", Relation::AssociatedWith, "file:f1")
        .await;
    reader
        .add("control:c1", Relation::AssociatedWith, "evidence:e1")
        .await;
    reader
        .add("program:p1", Relation::AssociatedWith, "control:c1")
        .await;
    reader
        .add("control:c1", Relation::AssociatedWith, "program:p1")
        .await;
    reader.add("user:alice", Relation::Viewer, "program:p1").await;
    let request = CheckRequest::new(user("alice", "org1"), Relation::Viewer, obj("file:f1"));

    let deep = AccessChecker::new(Arc::clone(&reader));
    assert!(deep.is_allowed(&request).await);

    let shallow = AccessChecker::with_config(
        Arc::clone(&reader),
        CheckerConfig::default().with_max_depth(2),
    );
    assert!(!shallow.is_allowed(&request).await);

    reader.remove("user:alice", Relation::Viewer, "program:p1").await;
    assert!(!deep.is_allowed(&request).await);
}

// ========== Section 5: Anonymous Trust-Center Visitors ==========

/// tc1 with protected doc d1 serving file f1.
async fn protected_doc() -> Arc<MockTupleReader> {
    let reader = Arc::new(MockTupleReader::new());
    reader
        .add("organization:org1", Relation::Owner, "trust_center_doc:d1")
        .await;
    reader
        .add("trust_center:tc1", Relation::AssociatedWith, "trust_center_doc:d1")
        .await;
    reader
        .add("trust_center_doc:d1", Relation::AssociatedWith, "file:f1")
        .await;
    reader
        .add("user:*", Relation::Viewer, "trust_center_doc:d1")
        .await;
    reader
}

#[tokio::test]
async fn test_visitor_reads_protected_metadata_but_not_file_until_nda() {
    let reader = protected_doc().await;
    let anon = visitor("anon_1", "tc1", "org1");

    assert_eq!(
        check(&reader, &anon, Relation::Viewer, "trust_center_doc:d1").await,
        Some(GrantPath::Wildcard)
    );
    assert_eq!(check(&reader, &anon, Relation::Viewer, "file:f1").await, None);

    reader
        .add("user:anon_1", Relation::NdaSigned, "trust_center:tc1")
        .await;

    assert_eq!(
        check(&reader, &anon, Relation::Viewer, "file:f1").await,
        Some(GrantPath::NdaSigned)
    );
}

#[tokio::test]
async fn test_protected_file_is_not_public_to_signed_in_users() {
    let reader = protected_doc().await;
    reader.add("group:trust", Relation::Editor, "trust_center_doc:d1").await;
    reader.add("user:alice", Relation::Member, "group:trust").await;

    for subject in [user("mallory", "org2"), user("erin", "org1")] {
        assert_eq!(
            check(&reader, &subject, Relation::Viewer, "trust_center_doc:d1").await,
            Some(GrantPath::Wildcard)
        );
        assert_eq!(check(&reader, &subject, Relation::Viewer, "file:f1").await, None);
    }
    assert_eq!(
        check(&reader, &user("alice", "org1"), Relation::Viewer, "file:f1").await,
        Some(GrantPath::LinkedResource {
            via: obj("trust_center_doc:d1")
        })
    );
}

#[tokio::test]
async fn test_visitor_reads_public_file_without_nda() {
    let reader = protected_doc().await;
    reader.add("user:*", Relation::Viewer, "file:f1").await;

    let grant = check(&reader, &visitor("anon_1", "tc1", "org1"), Relation::Viewer, "file:f1").await;
    assert_eq!(grant, Some(GrantPath::Wildcard));
}

#[tokio::test]
async fn test_visitor_is_confined_to_own_trust_center() {
    let reader = protected_doc().await;
    reader.add("user:*", Relation::Viewer, "file:f1").await;
    let other = visitor("anon_2", "tc2", "org2");

    assert_eq!(check(&reader, &other, Relation::Viewer, "trust_center_doc:d1").await, None);
    assert_eq!(check(&reader, &other, Relation::Viewer, "file:f1").await, None);
    assert_eq!(
        check(&reader, &other, Relation::Viewer, "trust_center:tc2").await,
        Some(GrantPath::TrustCenterVisitor)
    );
    assert_eq!(check(&reader, &other, Relation::Viewer, "trust_center:tc1").await, None);
}

#[tokio::test]
async fn test_visitor_relations_are_whitelisted() {
    let reader = protected_doc().await;
    reader
        .add("user:*", Relation::Editor, "trust_center_doc:d1")
        .await;
    reader.add("user:*", Relation::Viewer, "control:c1").await;
    let anon = visitor("anon_1", "tc1", "org1");

    assert_eq!(check(&reader, &anon, Relation::Editor, "trust_center_doc:d1").await, None);
    assert_eq!(check(&reader, &anon, Relation::Viewer, "control:c1").await, None);
}

#[tokio::test]
async fn test_nda_on_not_visible_doc_grants_nothing() {
    let reader = protected_doc().await;
    reader
        .remove("user:*", Relation::Viewer, "trust_center_doc:d1")
        .await;
    reader
        .add("user:anon_1", Relation::NdaSigned, "trust_center:tc1")
        .await;

    let grant = check(&reader, &visitor("anon_1", "tc1", "org1"), Relation::Viewer, "file:f1").await;
    assert_eq!(grant, None);
}

// ========== Section 6: Fail Closed ==========

#[tokio::test]
async fn test_storage_failure_denies() {
    let checker = AccessChecker::new(Arc::new(FailingTupleReader));
    let result = checker
        .check(&CheckRequest::new(
            user("alice", "org1"),
            Relation::Viewer,
            obj("control:c1"),
        ))
        .await;
    assert!(!result.allowed);
    assert_eq!(result.grant, None);
}

#[tokio::test]
async fn test_timeout_denies() {
    let checker = AccessChecker::with_config(
        Arc::new(SlowTupleReader {
            delay: Duration::from_millis(200),
        }),
        CheckerConfig::default().with_timeout(Duration::from_millis(20)),
    );
    let allowed = checker
        .is_allowed(&CheckRequest::new(
            user("alice", "org1"),
            Relation::Viewer,
            obj("control:c1"),
        ))
        .await;
    assert!(!allowed);
}
