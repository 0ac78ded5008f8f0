//! Process-wide `tracing` subscriber.
//!
//! `RUST_LOG` takes precedence over the configured level. JSON lines carry
//! the current span, so a denied check can be traced back to its request:
//!
//! ```json
//! {"timestamp":"2026-01-15T10:30:00.000Z","level":"WARN","target":"warden_domain::checker","fields":{"message":"check failed, denying"}}
//! ```
//!
//! `WardenServices::new` installs the subscriber from `ServerConfig::logging`.

use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{prelude::*, EnvFilter, Layer};

use crate::config::LoggingSettings;

/// Output format and level for the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub json_format: bool,
    /// Used when `RUST_LOG` is unset.
    pub default_level: Level,
}

impl LoggingConfig {
    /// An unparseable level falls back to INFO; `ServerConfig::validate`
    /// rejects those earlier.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            json_format: settings.json,
            default_level: Level::from_str(&settings.level).unwrap_or(Level::INFO),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level.to_string()))
    }
}

/// Installs the global subscriber.
///
/// Returns false when a subscriber was already installed; the existing one
/// stays in place.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = if config.json_format {
        registry.with(json_layer(std::io::stdout)).try_init()
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };
    installed.is_ok()
}

fn json_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_writer(writer)
        .with_current_span(true)
        .with_target(true)
}
