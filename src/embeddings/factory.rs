//! Provider registry and factory
//!
//! Maps provider names to constructor closures and turns a [`ServiceConfig`]
//! (or an [`EmbeddingEnv`] snapshot) into an `Arc<dyn EmbeddingService>`.
//!
//! The registry is an explicit value owned by whoever assembles the
//! application, not process-global state. It is guarded by a `RwLock`;
//! registration is expected at startup, lookups can happen from any task.

use super::config::{EmbeddingEnv, ServiceConfig};
use super::error::{EmbeddingError, Result};
use super::ollama::OllamaEmbeddingService;
use super::openai::OpenAiEmbeddingService;
use super::synthetic::{DefaultEmbeddingService, DEFAULT_SYNTHETIC_DIMENSIONS};
use super::traits::EmbeddingService;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_PROVIDER_NAME: &str = super::config::DEFAULT_PROVIDER;
pub const OPENAI_PROVIDER_NAME: &str = "openai";
pub const OLLAMA_PROVIDER_NAME: &str = "ollama";

/// Builds a provider from the full config handed to `create_service`.
pub type ProviderConstructor =
    Arc<dyn Fn(&ServiceConfig) -> Result<Arc<dyn EmbeddingService>> + Send + Sync>;

/// Name → constructor mapping, insertion ordered.
///
/// Names are stored lowercased; re-registering a name replaces its
/// constructor in place.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: RwLock<Vec<(String, ProviderConstructor)>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic inside a constructor never happens under the lock, so a
    // poisoned lock still holds a consistent Vec.
    fn read(&self) -> RwLockReadGuard<'_, Vec<(String, ProviderConstructor)>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(String, ProviderConstructor)>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, name: &str, constructor: ProviderConstructor) {
        let name = name.trim().to_lowercase();
        let mut entries = self.write();
        match entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = constructor,
            None => entries.push((name, constructor)),
        }
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Constructor registered under `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<ProviderConstructor> {
        let name = name.trim().to_lowercase();
        self.read()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| Arc::clone(c))
    }
}

/// Resolves configuration into embedding providers.
///
/// `new()` registers the built-in providers: `default` (synthetic),
/// `openai` (requires an API key) and `ollama` (local server).
pub struct EmbeddingServiceFactory {
    registry: ProviderRegistry,
}

impl EmbeddingServiceFactory {
    /// Factory with the built-in providers registered.
    pub fn new() -> Self {
        let factory = Self::empty();
        factory.register_builtin_providers();
        factory
    }

    /// Factory with nothing registered.
    pub fn empty() -> Self {
        Self {
            registry: ProviderRegistry::new(),
        }
    }

    /// (Re-)register `default`, `openai` and `ollama`.
    pub fn register_builtin_providers(&self) {
        self.register_provider(DEFAULT_PROVIDER_NAME, |config| {
            Ok(Arc::new(DefaultEmbeddingService::from_config(config)?))
        });
        self.register_provider(OPENAI_PROVIDER_NAME, |config| {
            Ok(Arc::new(OpenAiEmbeddingService::new(config)?))
        });
        self.register_provider(OLLAMA_PROVIDER_NAME, |config| {
            Ok(Arc::new(OllamaEmbeddingService::new(config)?))
        });
    }

    /// Store `constructor` under the lowercased `name`, replacing any previous entry.
    pub fn register_provider<F>(&self, name: &str, constructor: F)
    where
        F: Fn(&ServiceConfig) -> Result<Arc<dyn EmbeddingService>> + Send + Sync + 'static,
    {
        tracing::debug!(provider = %name, "Registering embedding provider");
        self.registry.register(name, Arc::new(constructor));
    }

    /// Remove every registration, built-ins included.
    ///
    /// Meant for test isolation; call [`register_builtin_providers`](Self::register_builtin_providers)
    /// afterwards to restore normal operation.
    pub fn reset_registry(&self) {
        self.registry.clear();
    }

    /// Registered provider names in insertion order.
    pub fn available_providers(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Instantiate the provider named by `config.provider` (default `"default"`).
    ///
    /// # Errors
    ///
    /// `ProviderNotRegistered` for unknown names; any constructor error is
    /// returned as-is.
    pub fn create_service(&self, config: &ServiceConfig) -> Result<Arc<dyn EmbeddingService>> {
        let name = config.provider_name();
        let constructor = self
            .registry
            .get(&name)
            .ok_or_else(|| EmbeddingError::ProviderNotRegistered(name.clone()))?;

        // The registry lock is released here; constructors may re-enter the factory.
        let service = constructor(config)?;
        let info = service.model_info();
        tracing::info!(
            provider = %name,
            model = %info.name,
            dimensions = info.dimensions,
            "Embedding service created"
        );
        Ok(service)
    }

    /// Instantiate a provider from an environment snapshot. Never fails.
    ///
    /// `mock_embeddings` short-circuits to the synthetic provider. Any error
    /// while resolving or constructing the requested provider is logged and
    /// replaced by a synthetic provider, built directly so it is available
    /// even after [`reset_registry`](Self::reset_registry).
    pub fn create_from_environment(&self, env: &EmbeddingEnv) -> Arc<dyn EmbeddingService> {
        let dimensions = env.dimensions.filter(|d| *d > 0);

        if env.forces_synthetic() {
            tracing::info!("MOCK_EMBEDDINGS set, using synthetic embedding provider");
            return Arc::new(DefaultEmbeddingService::new(
                dimensions.unwrap_or(DEFAULT_SYNTHETIC_DIMENSIONS),
            ));
        }

        let config = env.to_service_config();
        match self.create_service(&config) {
            Ok(service) => service,
            Err(e) => {
                tracing::warn!(
                    provider = %config.provider_name(),
                    error = %e,
                    "Failed to create embedding service, falling back to synthetic provider"
                );
                Arc::new(DefaultEmbeddingService::new(
                    dimensions.unwrap_or(DEFAULT_SYNTHETIC_DIMENSIONS),
                ))
            }
        }
    }

    /// Hosted OpenAI-compatible provider with explicit settings.
    pub fn create_openai_service(
        &self,
        api_key: impl Into<String>,
        model: Option<String>,
        dimensions: Option<usize>,
        api_endpoint: Option<String>,
    ) -> Result<Arc<dyn EmbeddingService>> {
        let config = ServiceConfig {
            provider: Some(OPENAI_PROVIDER_NAME.to_string()),
            model,
            dimensions,
            api_key: Some(api_key.into()),
            api_endpoint,
            ..Default::default()
        };
        self.create_service(&config)
    }

    /// Local model server provider with explicit settings.
    pub fn create_ollama_service(
        &self,
        model: Option<String>,
        dimensions: Option<usize>,
        api_endpoint: Option<String>,
    ) -> Result<Arc<dyn EmbeddingService>> {
        let config = ServiceConfig {
            provider: Some(OLLAMA_PROVIDER_NAME.to_string()),
            model,
            dimensions,
            api_endpoint,
            ..Default::default()
        };
        self.create_service(&config)
    }

    /// Synthetic provider with explicit dimensions.
    pub fn create_default_service(&self, dimensions: usize) -> Result<Arc<dyn EmbeddingService>> {
        self.create_service(&ServiceConfig::for_provider(DEFAULT_PROVIDER_NAME).dimensions(dimensions))
    }
}

impl Default for EmbeddingServiceFactory {
    fn default() -> Self {
        Self::new()
    }
}
