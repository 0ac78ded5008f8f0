//! Identity resolution: inbound credentials to canonical subjects.
//!
//! The resolver never widens the organization set a credential declares.
//! Anonymous trust-center visitors are not persisted users; whether they
//! signed the NDA is a tuple lookup made by the access checker.

mod resolver;
mod subject;

pub use resolver::{
    Credential, CredentialVerifier, IdentityResolver, TokenKind, TokenPrefixes, VerifiedClaims,
    ANONYMOUS_ID_PREFIX,
};
pub use subject::Subject;
