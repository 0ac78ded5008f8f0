//! Credential classification and subject resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::subject::Subject;
use crate::error::{DomainError, DomainResult};

/// Prefix of anonymous visitor subject IDs.
pub const ANONYMOUS_ID_PREFIX: &str = "anon_";

/// Kind of credential presented by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Session,
    PersonalAccessToken,
    ApiToken,
    AnonymousAssertion,
}

/// Bearer-token prefixes that distinguish machine tokens from sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrefixes {
    pub api_token: String,
    pub personal_access_token: String,
}

impl Default for TokenPrefixes {
    fn default() -> Self {
        Self {
            api_token: "tola_".to_string(),
            personal_access_token: "tolp_".to_string(),
        }
    }
}

/// An inbound, not yet verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Session(String),
    PersonalAccessToken {
        token: String,
        /// Organization requested by the caller for this call.
        organization_id: Option<String>,
    },
    ApiToken(String),
    AnonymousAssertion(String),
}

impl Credential {
    /// Classifies a bearer token by prefix. Anything without a machine-token
    /// prefix is treated as a session token.
    pub fn from_bearer(
        token: impl Into<String>,
        organization_header: Option<&str>,
        prefixes: &TokenPrefixes,
    ) -> Self {
        let token = token.into();
        if token.starts_with(&prefixes.api_token) {
            Credential::ApiToken(token)
        } else if token.starts_with(&prefixes.personal_access_token) {
            Credential::PersonalAccessToken {
                token,
                organization_id: organization_header
                    .filter(|org| !org.is_empty())
                    .map(str::to_string),
            }
        } else {
            Credential::Session(token)
        }
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Credential::Session(_) => TokenKind::Session,
            Credential::PersonalAccessToken { .. } => TokenKind::PersonalAccessToken,
            Credential::ApiToken(_) => TokenKind::ApiToken,
            Credential::AnonymousAssertion(_) => TokenKind::AnonymousAssertion,
        }
    }

    fn token(&self) -> &str {
        match self {
            Credential::Session(token)
            | Credential::ApiToken(token)
            | Credential::AnonymousAssertion(token)
            | Credential::PersonalAccessToken { token, .. } => token,
        }
    }
}

/// Raw claims returned by the credential verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    /// User ID, token ID or anonymous visitor ID.
    pub subject_id: String,
    pub organization_ids: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub trust_center_id: Option<String>,
    pub email: Option<String>,
}

/// Validates credentials and returns their raw claims.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, kind: TokenKind, token: &str) -> DomainResult<VerifiedClaims>;
}

/// Maps credentials to subjects.
pub struct IdentityResolver<V> {
    verifier: Arc<V>,
}

impl<V: CredentialVerifier> IdentityResolver<V> {
    pub fn new(verifier: Arc<V>) -> Self {
        Self { verifier }
    }

    /// Resolves a credential to a subject.
    pub async fn resolve(&self, credential: &Credential) -> DomainResult<Subject> {
        self.resolve_at(credential, Utc::now()).await
    }

    /// Resolves a credential, judging expiry against `now`.
    pub async fn resolve_at(
        &self,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> DomainResult<Subject> {
        if credential.token().is_empty() {
            return Err(DomainError::authentication("empty credential"));
        }

        let claims = self
            .verifier
            .verify(credential.kind(), credential.token())
            .await
            .map_err(|err| match err {
                DomainError::Authentication { .. } => err,
                other => DomainError::authentication(other.to_string()),
            })?;

        if claims.subject_id.is_empty() {
            return Err(DomainError::authentication("claims carry no subject"));
        }
        if let Some(expires_at) = claims.expires_at {
            if expires_at <= now {
                return Err(DomainError::authentication("credential expired"));
            }
        }

        let subject = map_claims(credential, claims)?;
        debug!(kind = ?credential.kind(), subject = %subject.subject_ref(), "resolved subject");
        Ok(subject)
    }
}

fn single_organization(claims: &VerifiedClaims, what: &str) -> DomainResult<String> {
    match claims.organization_ids.as_slice() {
        [org] if !org.is_empty() => Ok(org.clone()),
        _ => Err(DomainError::authentication(format!(
            "{what} must be scoped to exactly one organization"
        ))),
    }
}

fn map_claims(credential: &Credential, claims: VerifiedClaims) -> DomainResult<Subject> {
    match credential {
        Credential::Session(_) => Ok(Subject::InteractiveUser {
            organization_id: single_organization(&claims, "session")?,
            user_id: claims.subject_id,
        }),
        Credential::ApiToken(_) => Ok(Subject::ServiceToken {
            organization_id: single_organization(&claims, "api token")?,
            token_id: claims.subject_id,
        }),
        Credential::PersonalAccessToken {
            organization_id, ..
        } => {
            let organization_ids: BTreeSet<String> = claims
                .organization_ids
                .into_iter()
                .filter(|org| !org.is_empty())
                .collect();
            if organization_ids.is_empty() {
                return Err(DomainError::authentication(
                    "personal access token has no organizations",
                ));
            }
            // A requested organization outside the minted set is not honoured.
            let active_organization_id = organization_id
                .as_ref()
                .filter(|org| organization_ids.contains(*org))
                .cloned();
            if organization_id.is_some() && active_organization_id.is_none() {
                return Err(DomainError::authentication(
                    "requested organization is not authorized for this token",
                ));
            }
            Ok(Subject::PersonalAccessTokenHolder {
                user_id: claims.subject_id,
                organization_ids,
                active_organization_id,
            })
        }
        Credential::AnonymousAssertion(_) => {
            if !claims.subject_id.starts_with(ANONYMOUS_ID_PREFIX) {
                return Err(DomainError::authentication(
                    "anonymous assertion has a non-anonymous subject",
                ));
            }
            let trust_center_id = claims
                .trust_center_id
                .clone()
                .filter(|tc| !tc.is_empty())
                .ok_or_else(|| {
                    DomainError::authentication("anonymous assertion has no trust center")
                })?;
            Ok(Subject::AnonymousTrustCenterVisitor {
                organization_id: single_organization(&claims, "anonymous assertion")?,
                ephemeral_id: claims.subject_id,
                trust_center_id,
                email: claims.email,
            })
        }
    }
}
