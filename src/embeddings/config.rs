//! Provider-facing configuration types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider name used when a config does not name one.
pub const DEFAULT_PROVIDER: &str = "default";

/// What a provider instance produces. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub dimensions: usize,
    pub version: String,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, dimensions: usize, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            version: version.into(),
        }
    }
}

/// Options handed to a provider constructor.
///
/// Recognized fields are typed; anything else lands in `extra` so providers
/// can read their own extension options (e.g. `version`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Registry entry to use, matched case-insensitively.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(alias = "apiEndpoint")]
    pub api_endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceConfig {
    /// Config selecting `provider` with every other field defaulted.
    pub fn for_provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Set a provider-specific extension field.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Lowercased provider name, falling back to [`DEFAULT_PROVIDER`].
    pub fn provider_name(&self) -> String {
        self.provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROVIDER)
            .to_lowercase()
    }

    /// String extension field, ignoring empty values.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The API key, treating an empty string as absent.
    pub fn non_empty_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Snapshot of the embedding-related environment.
///
/// Populated once by the config loader (see [`crate::Config`]) and passed by
/// value to [`super::EmbeddingServiceFactory::create_from_environment`], so
/// the factory itself never reads process state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddingEnv {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
    /// Force the synthetic provider regardless of everything else.
    /// `None` when unset, so a config file value can sit underneath it.
    pub mock_embeddings: Option<bool>,
}

impl EmbeddingEnv {
    /// Read the `EMBEDDING_*` / `MOCK_EMBEDDINGS` variables.
    ///
    /// `EMBEDDING_API_KEY` falls back to `OPENAI_API_KEY`. Empty values are
    /// treated as unset.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }

        Self {
            provider: var("EMBEDDING_PROVIDER"),
            api_key: var("EMBEDDING_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            api_endpoint: var("EMBEDDING_API_ENDPOINT"),
            model: var("EMBEDDING_MODEL"),
            dimensions: var("EMBEDDING_DIMENSIONS").and_then(|s| s.parse().ok()),
            mock_embeddings: var("MOCK_EMBEDDINGS").map(|v| parse_flag(&v)),
        }
    }

    /// Whether the synthetic provider is forced.
    pub fn forces_synthetic(&self) -> bool {
        self.mock_embeddings.unwrap_or(false)
    }

    /// The [`ServiceConfig`] this snapshot describes.
    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            api_key: self.api_key.clone(),
            api_endpoint: self.api_endpoint.clone(),
            extra: Map::new(),
        }
    }
}

/// Boolean-like flag parsing: `true`, `1`, `yes`, `on` (any case).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
