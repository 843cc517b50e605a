//! Synthetic embedding provider
//!
//! Manufactures random unit vectors without any network access. Used as the
//! registry default and as the fallback of
//! [`EmbeddingServiceFactory::create_from_environment`](super::EmbeddingServiceFactory::create_from_environment).

use super::config::{ModelInfo, ServiceConfig};
use super::error::Result;
use super::normalize::normalize_in_place;
use super::traits::EmbeddingService;
use async_trait::async_trait;

pub const DEFAULT_SYNTHETIC_MODEL: &str = "default-random-embedding";
pub const DEFAULT_SYNTHETIC_DIMENSIONS: usize = 1536;
pub const DEFAULT_SYNTHETIC_VERSION: &str = "1.0.0";

/// Random-vector embedding provider.
///
/// Every call draws fresh uniform values in `[-1, 1)` and L2-normalizes them,
/// so the output satisfies the same contract as the real providers while
/// carrying no semantic meaning.
///
/// # Example
///
/// ```rust
/// use memory_embeddings::embeddings::{DefaultEmbeddingService, EmbeddingService};
///
/// # tokio_test::block_on(async {
/// let service = DefaultEmbeddingService::new(384);
/// let embedding = service.generate_embedding("hello world").await.unwrap();
/// assert_eq!(embedding.len(), 384);
/// assert_eq!(service.model_info().dimensions, 384);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct DefaultEmbeddingService {
    info: ModelInfo,
}

impl DefaultEmbeddingService {
    /// Create a synthetic provider with the given dimensions.
    ///
    /// A dimension of zero is bumped to one so the output is always a valid
    /// unit vector.
    pub fn new(dimensions: usize) -> Self {
        Self {
            info: ModelInfo::new(
                DEFAULT_SYNTHETIC_MODEL,
                dimensions.max(1),
                DEFAULT_SYNTHETIC_VERSION,
            ),
        }
    }

    /// Registry constructor. Never fails; zero dimensions are bumped like [`new`](Self::new).
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let dimensions = config.dimensions.unwrap_or(DEFAULT_SYNTHETIC_DIMENSIONS);
        let mut service = Self::new(dimensions);
        if let Some(model) = config.model.as_deref().filter(|m| !m.is_empty()) {
            service.info.name = model.to_string();
        }
        if let Some(version) = config.extra_str("version") {
            service.info.version = version.to_string();
        }
        Ok(service)
    }

    fn random_unit_vector(&self) -> Vec<f32> {
        let mut vector: Vec<f32> = (0..self.info.dimensions)
            .map(|_| rand::random::<f32>() * 2.0 - 1.0)
            .collect();
        normalize_in_place(&mut vector);
        vector
    }
}

impl Default for DefaultEmbeddingService {
    fn default() -> Self {
        Self::new(DEFAULT_SYNTHETIC_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingService for DefaultEmbeddingService {
    async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.random_unit_vector())
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.random_unit_vector()).collect())
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}
