//! Explicit tracking context handed to every façade call.

use std::fmt;
use std::sync::Arc;

use crate::config::TrackingConfig;
use crate::registry::{MemoryRegistry, Registry};
use crate::Result;

/// Configuration plus the registry connection.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct TrackingContext {
    config: TrackingConfig,
    registry: Arc<dyn Registry>,
}

impl TrackingContext {
    /// Build a context from a validated configuration and a registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration fails validation.
    pub fn new(config: TrackingConfig, registry: Arc<dyn Registry>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    /// Default configuration over a fresh [`MemoryRegistry`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            config: TrackingConfig::default(),
            registry: Arc::new(MemoryRegistry::new()),
        }
    }

    /// Same registry, different configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration fails validation.
    pub fn with_config(&self, config: TrackingConfig) -> Result<Self> {
        Self::new(config, Arc::clone(&self.registry))
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    /// A shared handle to the registry.
    #[must_use]
    pub fn registry_handle(&self) -> Arc<dyn Registry> {
        Arc::clone(&self.registry)
    }
}

impl fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
