//! Configuration for the access checker.

use std::time::Duration;

/// Configuration for the access checker.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Maximum linked-resource hops followed by one check.
    pub max_depth: u32,
    /// Timeout for a whole check. Expiry denies.
    pub timeout: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_depth: 25,
            timeout: Duration::from_secs(5),
        }
    }
}

impl CheckerConfig {
    /// Creates a new configuration with the specified max depth.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Creates a new configuration with the specified timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
