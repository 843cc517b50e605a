//! EmbeddingService trait definition
//!
//! Defines the abstract interface every embedding provider satisfies.
//! Follows the project pattern: async trait + Send + Sync for
//! `Arc<dyn EmbeddingService>` usage.

use super::config::ModelInfo;
use super::error::Result;
use async_trait::async_trait;

/// Abstract interface for generating vector embeddings from text.
///
/// Implementations must be thread-safe (`Send + Sync`) to be shared
/// across async tasks via `Arc<dyn EmbeddingService>`.
///
/// # Implementations
///
/// - [`OllamaEmbeddingService`](super::OllamaEmbeddingService): local model server
///   (`/api/embeddings`, one text per request)
/// - [`OpenAiEmbeddingService`](super::OpenAiEmbeddingService): hosted
///   OpenAI-compatible `/v1/embeddings` API with true batch requests
/// - [`DefaultEmbeddingService`](super::DefaultEmbeddingService): random unit
///   vectors, no network (fallback and tests)
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate a unit-length embedding for a single text.
    ///
    /// # Errors
    ///
    /// Returns an error instead of an empty or malformed vector whenever a
    /// valid result cannot be produced (network error, error status,
    /// malformed payload).
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one per input, in input order.
    ///
    /// The default processes texts sequentially: each request is issued only
    /// after the previous one resolved. The first failure aborts the call and
    /// no partial results are returned.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.generate_embedding(text).await?);
        }
        Ok(embeddings)
    }

    /// Name, dimensions and version of the vectors this instance produces.
    ///
    /// Fixed at construction; stored alongside embeddings so we know which
    /// model generated each vector.
    fn model_info(&self) -> &ModelInfo;
}
