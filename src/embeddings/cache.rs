//! In-memory embedding cache
//!
//! Wraps any provider with a bounded `moka` cache keyed by the exact input
//! text. Entries live only as long as the process.

use super::config::ModelInfo;
use super::error::{EmbeddingError, Result};
use super::traits::EmbeddingService;
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;

/// Caching decorator around an `EmbeddingService`.
///
/// Failed calls are never cached, so a transient endpoint error is retried on
/// the next request for the same text. Batch misses are forwarded to the inner
/// provider as a single `generate_embeddings` call, keeping its batching.
pub struct CachedEmbeddingService {
    inner: Arc<dyn EmbeddingService>,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbeddingService {
    /// Cache at most `capacity` embeddings in front of `inner`.
    pub fn new(inner: Arc<dyn EmbeddingService>, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }

    pub fn inner(&self) -> &Arc<dyn EmbeddingService> {
        &self.inner
    }

    /// Approximate number of cached embeddings.
    pub async fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl EmbeddingService for CachedEmbeddingService {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.cache.get(text).await {
            tracing::trace!(model = %self.inner.model_info().name, "Embedding cache hit");
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.generate_embedding(text).await?;
        self.cache
            .insert(text.to_string(), Arc::new(embedding.clone()))
            .await;
        Ok(embedding)
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        // Distinct uncached texts, and (result slot, miss index) pairs to fill
        let mut misses: Vec<String> = Vec::new();
        let mut miss_index: HashMap<&str, usize> = HashMap::new();
        let mut pending: Vec<(usize, usize)> = Vec::new();

        for (slot, text) in texts.iter().enumerate() {
            match self.cache.get(text).await {
                Some(hit) => results.push(Some(hit.as_ref().clone())),
                None => {
                    let next = misses.len();
                    let index = *miss_index.entry(text.as_str()).or_insert(next);
                    if index == next {
                        misses.push(text.clone());
                    }
                    pending.push((slot, index));
                    results.push(None);
                }
            }
        }

        if misses.is_empty() {
            tracing::trace!(count = texts.len(), "Embedding batch served from cache");
            return Ok(results.into_iter().flatten().collect());
        }

        let fresh = self.inner.generate_embeddings(&misses).await?;
        if fresh.len() != misses.len() {
            return Err(EmbeddingError::InvalidResponse {
                endpoint: self.inner.model_info().name.clone(),
                reason: format!("expected {} embeddings, got {}", misses.len(), fresh.len()),
            });
        }

        for (text, embedding) in misses.iter().zip(fresh.iter()) {
            self.cache
                .insert(text.clone(), Arc::new(embedding.clone()))
                .await;
        }
        for (slot, index) in pending {
            results[slot] = Some(fresh[index].clone());
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn model_info(&self) -> &ModelInfo {
        self.inner.model_info()
    }
}
