//! Caller identities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{ObjectKind, ObjectRef};

/// A resolved caller identity and its organization scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    /// Session user, scoped to exactly one organization.
    InteractiveUser {
        user_id: String,
        organization_id: String,
    },
    /// Personal access token, scoped to the organizations chosen at mint time.
    PersonalAccessTokenHolder {
        user_id: String,
        organization_ids: BTreeSet<String>,
        active_organization_id: Option<String>,
    },
    /// Service API token, scoped to exactly one organization.
    ServiceToken {
        token_id: String,
        organization_id: String,
    },
    /// Unauthenticated trust-center visitor.
    AnonymousTrustCenterVisitor {
        ephemeral_id: String,
        trust_center_id: String,
        organization_id: String,
        email: Option<String>,
    },
}

impl Subject {
    /// The entity that appears as the subject of this caller's tuples.
    pub fn subject_ref(&self) -> ObjectRef {
        match self {
            Subject::InteractiveUser { user_id, .. }
            | Subject::PersonalAccessTokenHolder { user_id, .. } => {
                ObjectRef::new(ObjectKind::User, user_id.clone())
            }
            Subject::ServiceToken { token_id, .. } => {
                ObjectRef::new(ObjectKind::Service, token_id.clone())
            }
            Subject::AnonymousTrustCenterVisitor { ephemeral_id, .. } => {
                ObjectRef::new(ObjectKind::User, ephemeral_id.clone())
            }
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Subject::AnonymousTrustCenterVisitor { .. })
    }

    /// Returns true if the caller's credential covers the organization.
    pub fn is_scoped_to(&self, organization_id: &str) -> bool {
        match self {
            Subject::InteractiveUser {
                organization_id: org,
                ..
            }
            | Subject::ServiceToken {
                organization_id: org,
                ..
            }
            | Subject::AnonymousTrustCenterVisitor {
                organization_id: org,
                ..
            } => org == organization_id,
            Subject::PersonalAccessTokenHolder {
                organization_ids, ..
            } => organization_ids.contains(organization_id),
        }
    }

    /// The organization new objects are created in, if one is determined.
    pub fn active_organization(&self) -> Option<&str> {
        match self {
            Subject::InteractiveUser {
                organization_id, ..
            }
            | Subject::ServiceToken {
                organization_id, ..
            }
            | Subject::AnonymousTrustCenterVisitor {
                organization_id, ..
            } => Some(organization_id),
            Subject::PersonalAccessTokenHolder {
                organization_ids,
                active_organization_id,
                ..
            } => match active_organization_id {
                Some(active) => Some(active),
                None if organization_ids.len() == 1 => {
                    organization_ids.iter().next().map(String::as_str)
                }
                None => None,
            },
        }
    }

    /// Trust center an anonymous visitor is bound to.
    pub fn trust_center_id(&self) -> Option<&str> {
        match self {
            Subject::AnonymousTrustCenterVisitor {
                trust_center_id, ..
            } => Some(trust_center_id),
            _ => None,
        }
    }
}
