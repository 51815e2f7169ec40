use std::sync::Arc;
use videocat_core::{Authenticator, CacheProbe, CatalogEngine, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    engine: CatalogEngine,
    cache: Option<Arc<CacheProbe>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        engine: CatalogEngine,
        cache: Option<Arc<CacheProbe>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            engine,
            cache,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn engine(&self) -> &CatalogEngine {
        &self.engine
    }

    /// Cache probe, if a cache is configured.
    pub fn cache(&self) -> Option<&CacheProbe> {
        self.cache.as_deref()
    }
}
