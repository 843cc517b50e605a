//! Hosted OpenAI-compatible embedding provider
//!
//! Implements `EmbeddingService` using the `/v1/embeddings` API format
//! (OpenAI, LiteLLM, vLLM, or any compatible proxy).
//!
//! Defaults:
//! - endpoint: `https://api.openai.com/v1/embeddings`
//! - model: `text-embedding-3-small`
//! - dimensions: `1536`
//!
//! An API key is mandatory; construction fails without one.

use super::config::{ModelInfo, ServiceConfig};
use super::error::{truncate_body, EmbeddingError, Result};
use super::normalize::normalize_in_place;
use super::traits::EmbeddingService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OPENAI_DIMENSIONS: usize = 1536;
pub const DEFAULT_OPENAI_VERSION: &str = "1.0.0";

/// Some providers have batch size limits; inputs are split into chunks of this size.
const BATCH_SIZE: usize = 50;

const OPENAI_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP embedding provider for hosted OpenAI-compatible APIs.
///
/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct OpenAiEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    info: ModelInfo,
}

/// OpenAI-compatible embedding request
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// OpenAI-compatible embedding response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// OpenAI-compatible error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiEmbeddingService {
    /// Create a provider from a `ServiceConfig`.
    ///
    /// # Errors
    ///
    /// `MissingConfig` when `api_key` is absent or blank. No request is made.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let api_key = config
            .non_empty_api_key()
            .ok_or(EmbeddingError::MissingConfig {
                provider: "openai",
                field: "api_key",
            })?
            .to_string();

        if config.dimensions == Some(0) {
            return Err(EmbeddingError::InvalidConfig {
                provider: "openai",
                reason: "dimensions must be greater than zero".into(),
            });
        }

        let endpoint = config
            .api_endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
        let model = config
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let dimensions = config.dimensions.unwrap_or(DEFAULT_OPENAI_DIMENSIONS);
        let version = config
            .extra_str("version")
            .unwrap_or(DEFAULT_OPENAI_VERSION)
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(OPENAI_REQUEST_TIMEOUT)
            .build()
            .map_err(EmbeddingError::Client)?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            info: ModelInfo::new(model, dimensions, version),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn invalid(&self, reason: impl Into<String>) -> EmbeddingError {
        EmbeddingError::InvalidResponse {
            endpoint: self.endpoint.clone(),
            reason: reason.into(),
        }
    }

    /// Send one request for `input` and return normalized vectors in input order.
    async fn request_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbeddingRequest {
            model: &self.info.name,
            input,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.info.name,
            inputs = input.len(),
            "Requesting embeddings"
        );

        let transport = |source: reqwest::Error| EmbeddingError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the OpenAI-style error message when there is one
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .map(|detail| detail.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: truncate_body(&message),
            });
        }

        let body = response.text().await.map_err(transport)?;
        let resp: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| self.invalid(format!("failed to parse response: {}", e)))?;

        if resp.data.len() != input.len() {
            return Err(self.invalid(format!(
                "expected {} embeddings, got {}",
                input.len(),
                resp.data.len()
            )));
        }

        // Sort by index; after sorting every position must carry its own index
        let mut data = resp.data;
        data.sort_by_key(|d| d.index);

        data.into_iter()
            .enumerate()
            .map(|(position, d)| {
                if d.index != position {
                    return Err(self.invalid(format!(
                        "embedding indices do not cover 0..{} (found {} at position {})",
                        input.len(),
                        d.index,
                        position
                    )));
                }
                if d.embedding.is_empty() {
                    return Err(self.invalid(format!("embedding at index {} is empty", d.index)));
                }
                if let Some(i) = d.embedding.iter().position(|x| !x.is_finite()) {
                    return Err(self.invalid(format!(
                        "embedding at index {} has component {} out of f32 range",
                        d.index, i
                    )));
                }
                let mut embedding = d.embedding;
                normalize_in_place(&mut embedding);
                Ok(embedding)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingService {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        self.request_embeddings(&input)
            .await?
            .pop()
            .ok_or_else(|| self.invalid("empty response"))
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            let mut embeddings = self.request_embeddings(chunk).await?;
            all_embeddings.append(&mut embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}
