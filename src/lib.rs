//! Memory Embeddings
//!
//! Pluggable embedding generation for a knowledge-graph memory:
//! - `EmbeddingService` trait hiding which backend produced a vector
//! - Ollama (local), OpenAI-compatible (hosted) and synthetic providers
//! - Provider registry / factory with a never-failing environment entry point
//! - Optional in-memory cache in front of any provider

pub mod embeddings;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use embeddings::{CachedEmbeddingService, EmbeddingEnv, EmbeddingService, EmbeddingServiceFactory};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub embeddings: EmbeddingsYamlConfig,
}

/// Embeddings configuration section
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingsYamlConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    /// Force the synthetic provider
    pub mock: Option<bool>,
    /// Number of embeddings kept in memory (0 = no cache)
    pub cache_capacity: u64,
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Environment snapshot handed to the factory
    pub embedding: EmbeddingEnv,
    /// Number of embeddings kept in memory (0 = no cache)
    pub cache_capacity: u64,
}

impl Config {
    /// Load configuration from environment variables and `config.yaml` in CWD.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path).embeddings;

        // 2. Overlay env vars
        let env = EmbeddingEnv::from_env();
        let cache_capacity = std::env::var("EMBEDDING_CACHE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(yaml.cache_capacity);

        Ok(Self {
            embedding: EmbeddingEnv {
                provider: env.provider.or(yaml.provider),
                api_key: env.api_key.or(yaml.api_key),
                api_endpoint: env.api_endpoint.or(yaml.api_endpoint),
                model: env.model.or(yaml.model),
                dimensions: env.dimensions.or(yaml.dimensions),
                mock_embeddings: env.mock_embeddings.or(yaml.mock),
            },
            cache_capacity,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Shared embedding state handed to the knowledge-graph layer
#[derive(Clone)]
pub struct EmbeddingState {
    pub factory: Arc<EmbeddingServiceFactory>,
    pub service: Arc<dyn EmbeddingService>,
    pub config: Arc<Config>,
}

impl EmbeddingState {
    /// Build the factory with built-in providers and resolve the configured service.
    ///
    /// Never fails: an unusable provider configuration degrades to the
    /// synthetic provider (see `EmbeddingServiceFactory::create_from_environment`).
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, EmbeddingServiceFactory::new())
    }

    /// Same as [`new`](Self::new) with a caller-prepared factory (extra providers registered).
    pub fn with_factory(config: Config, factory: EmbeddingServiceFactory) -> Self {
        let mut service = factory.create_from_environment(&config.embedding);

        if config.cache_capacity > 0 {
            tracing::debug!(capacity = config.cache_capacity, "Embedding cache enabled");
            service = Arc::new(CachedEmbeddingService::new(service, config.cache_capacity));
        }

        Self {
            factory: Arc::new(factory),
            service,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
