//! Wiring of the authorization services from configuration.

use std::sync::Arc;

use tracing::{debug, info};
use warden_domain::error::DomainResult;
use warden_domain::identity::{
    Credential, CredentialVerifier, IdentityResolver, Subject, TokenPrefixes,
};
use warden_storage::{DataStore, MemoryDataStore};

use crate::authz::Authz;
use crate::config::{ConfigLoadError, ServerConfig, StorageSettings};
use crate::handlers::batch::BatchCheckHandler;
use crate::handlers::{ResourceService, TrustCenterService};
use crate::observability::{init_logging, LoggingConfig};
use crate::watermark::WatermarkQueue;

/// Builds the data store selected by `storage.backend`.
pub fn build_store(settings: &StorageSettings) -> Result<Arc<MemoryDataStore>, ConfigLoadError> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryDataStore::with_max_tuples_per_write(
            settings.max_tuples_per_write,
        ))),
        other => Err(ConfigLoadError::Invalid {
            message: format!("unsupported storage backend: {other}"),
        }),
    }
}

/// All services sharing one data store.
pub struct WardenServices<S, V, Q> {
    pub authz: Arc<Authz<S>>,
    pub identity: IdentityResolver<V>,
    pub resources: ResourceService<S>,
    pub trust_centers: TrustCenterService<S, Q>,
    pub batch: BatchCheckHandler<S>,
    prefixes: TokenPrefixes,
}

impl<S, V, Q> WardenServices<S, V, Q>
where
    S: DataStore,
    V: CredentialVerifier,
    Q: WatermarkQueue,
{
    /// Validates `config` and installs the global log subscriber on first
    /// use.
    pub fn new(
        config: &ServerConfig,
        store: Arc<S>,
        verifier: Arc<V>,
        queue: Arc<Q>,
    ) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        if !init_logging(&LoggingConfig::from_settings(&config.logging)) {
            debug!("tracing subscriber already installed");
        }

        let authz = Arc::new(Authz::new(store, config.checker.to_checker_config()));
        info!(
            max_depth = config.checker.max_depth,
            timeout_ms = config.checker.timeout_ms,
            "authorization services ready"
        );

        Ok(Self {
            identity: IdentityResolver::new(verifier),
            resources: ResourceService::new(Arc::clone(&authz)),
            trust_centers: TrustCenterService::new(
                Arc::clone(&authz),
                queue,
                config.trust_center.watermarking_default,
            ),
            batch: BatchCheckHandler::new(Arc::clone(&authz)),
            prefixes: config.identity.token_prefixes(),
            authz,
        })
    }

    /// Classifies and resolves a bearer token.
    pub async fn authenticate(
        &self,
        bearer: &str,
        organization_header: Option<&str>,
    ) -> DomainResult<Subject> {
        let credential = Credential::from_bearer(bearer, organization_header, &self.prefixes);
        self.identity.resolve(&credential).await
    }
}
