//! Shared harness for end-to-end scenarios.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;
use warden_domain::error::{DomainError, DomainResult};
use warden_domain::identity::{CredentialVerifier, Subject, TokenKind, VerifiedClaims};
use warden_domain::model::{ObjectKind, ObjectRef, Relation, Resource};
use warden_server::handlers::NewResource;
use warden_server::{build_store, ChannelWatermarkQueue, ServerConfig, WardenServices, WatermarkJob};
use warden_storage::{DataStore, MemoryDataStore, TupleFilter};

/// Verifier backed by a fixed token table.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, VerifiedClaims>,
}

impl StaticVerifier {
    pub fn with_token(mut self, token: &str, subject_id: &str, orgs: &[&str]) -> Self {
        self.tokens.insert(
            token.to_string(),
            VerifiedClaims {
                subject_id: subject_id.to_string(),
                organization_ids: orgs.iter().map(|o| o.to_string()).collect(),
                expires_at: None,
                trust_center_id: None,
                email: None,
            },
        );
        self
    }

    pub fn with_visitor(mut self, token: &str, visitor_id: &str, trust_center_id: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            VerifiedClaims {
                subject_id: visitor_id.to_string(),
                organization_ids: vec!["org1".to_string()],
                expires_at: None,
                trust_center_id: Some(trust_center_id.to_string()),
                email: Some("visitor@example.com".to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, _kind: TokenKind, token: &str) -> DomainResult<VerifiedClaims> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| DomainError::authentication("unknown token"))
    }
}

pub type Services = WardenServices<MemoryDataStore, StaticVerifier, ChannelWatermarkQueue>;

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryDataStore>,
    pub jobs: Receiver<WatermarkJob>,
}

impl Harness {
    pub fn new(verifier: StaticVerifier) -> Self {
        let config = ServerConfig::default();
        let store = build_store(&config.storage).expect("memory store");
        let (queue, jobs) = ChannelWatermarkQueue::new(16);
        let services = WardenServices::new(
            &config,
            Arc::clone(&store),
            Arc::new(verifier),
            Arc::new(queue),
        )
        .expect("valid config");
        Self {
            services,
            store,
            jobs,
        }
    }

    /// Makes `user_id` a member of `org`, which allows creating objects there.
    pub async fn join_organization(&self, user_id: &str, org: &str) {
        self.services
            .authz
            .write_tuples(&[warden_domain::model::Tuple::new(
                ObjectRef::new(ObjectKind::User, user_id),
                Relation::Member,
                ObjectRef::organization(org),
            )])
            .await
            .expect("write membership");
    }

    /// Creates a group whose members are the given users.
    pub async fn create_group(&self, creator: &Subject, id: &str, users: &[&str]) -> Resource {
        let input = users.iter().fold(
            NewResource::new(ObjectKind::Group).with_id(id),
            |input, user| input.with_member(ObjectRef::new(ObjectKind::User, *user)),
        );
        self.services
            .resources
            .create(creator, input)
            .await
            .expect("create group")
    }

    /// Every stored tuple that names `object` on either side.
    pub async fn tuples_referencing(&self, object: &ObjectRef) -> usize {
        let kind = object.kind.as_str();
        let as_object = self
            .store
            .read_tuples(&TupleFilter::for_object(kind, object.id.clone()))
            .await
            .expect("read tuples");
        let as_subject = self
            .store
            .read_tuples(&TupleFilter::for_subject(kind, object.id.clone()))
            .await
            .expect("read tuples");
        as_object.len() + as_subject.len()
    }

    pub async fn wildcard_grants(&self) -> usize {
        self.store
            .read_tuples(&TupleFilter::for_subject("user", "*"))
            .await
            .expect("read tuples")
            .len()
    }
}

pub fn user(id: &str, org: &str) -> Subject {
    Subject::InteractiveUser {
        user_id: id.to_string(),
        organization_id: org.to_string(),
    }
}

pub fn obj(value: &str) -> ObjectRef {
    ObjectRef::parse(value).expect("valid object ref")
}
