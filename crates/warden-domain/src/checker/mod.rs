//! Access checker for permission checks.
//!
//! The checker answers allow/deny for `(subject, relation, object)` by
//! querying the tuple store, following group membership and
//! linked-resource rules.

mod access_checker;
mod config;
mod context;
mod rules;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use access_checker::{AccessChecker, ANONYMOUS_RELATIONS};
pub use config::CheckerConfig;
pub use rules::LinkedResourceRules;
pub use traits::{TupleQuery, TupleReader};
pub use types::{CheckRequest, CheckResult, GrantPath};
