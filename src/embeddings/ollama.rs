//! Local model server embedding provider
//!
//! Implements `EmbeddingService` against an Ollama-style `/api/embeddings`
//! endpoint: one text in, one vector out.
//!
//! Defaults (each overridable independently through `ServiceConfig`):
//! - endpoint: `http://localhost:11434/api/embeddings`
//! - model: `nomic-embed-text`
//! - dimensions: `768`
//! - version: `1.0.0` (`extra["version"]`)

use super::config::{ModelInfo, ServiceConfig};
use super::error::{truncate_body, EmbeddingError, Result};
use super::normalize::normalize_in_place;
use super::traits::EmbeddingService;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/embeddings";
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_OLLAMA_DIMENSIONS: usize = 768;
pub const DEFAULT_OLLAMA_VERSION: &str = "1.0.0";

/// Per-request bound; a hung server fails the call instead of stalling it.
pub const OLLAMA_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP embedding provider for a local model server.
///
/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
/// `generate_embeddings` keeps the sequential trait default: the endpoint
/// only accepts a single prompt per request.
#[derive(Clone)]
pub struct OllamaEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    info: ModelInfo,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

impl OllamaEmbeddingService {
    /// Create a provider from a `ServiceConfig`, defaulting every missing field.
    ///
    /// Never contacts the endpoint; an unreachable server is only discovered
    /// on the first `generate_embedding` call.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Self::with_timeout(config, OLLAMA_REQUEST_TIMEOUT)
    }

    pub(crate) fn with_timeout(config: &ServiceConfig, timeout: Duration) -> Result<Self> {
        if config.dimensions == Some(0) {
            return Err(EmbeddingError::InvalidConfig {
                provider: "ollama",
                reason: "dimensions must be greater than zero".into(),
            });
        }

        let endpoint = config
            .api_endpoint
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string());
        let model = config
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let dimensions = config.dimensions.unwrap_or(DEFAULT_OLLAMA_DIMENSIONS);
        let version = config
            .extra_str("version")
            .unwrap_or(DEFAULT_OLLAMA_VERSION)
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbeddingError::Client)?;

        Ok(Self {
            client,
            endpoint,
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

    /// Pull a non-empty numeric `embedding` array out of a response body.
    fn parse_embedding(&self, body: &str) -> Result<Vec<f32>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| self.invalid(format!("body is not valid JSON: {}", e)))?;

        let field = value
            .get("embedding")
            .ok_or_else(|| self.invalid("missing `embedding` field"))?;
        let items = field
            .as_array()
            .ok_or_else(|| self.invalid("`embedding` is not an array"))?;
        if items.is_empty() {
            return Err(self.invalid("`embedding` is empty"));
        }

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let x = item
                    .as_f64()
                    .ok_or_else(|| self.invalid(format!("`embedding[{}]` is not a number", i)))?
                    as f32;
                if !x.is_finite() {
                    return Err(self.invalid(format!("`embedding[{}]` is out of f32 range", i)));
                }
                Ok(x)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbeddingService {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            prompt: text,
            model: &self.info.name,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.info.name,
            chars = text.len(),
            "Requesting embedding"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| EmbeddingError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| EmbeddingError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let mut embedding = self.parse_embedding(&body)?;

        if embedding.len() != self.info.dimensions {
            tracing::warn!(
                endpoint = %self.endpoint,
                model = %self.info.name,
                expected = self.info.dimensions,
                actual = embedding.len(),
                "Embedding length differs from configured dimensions"
            );
        }

        normalize_in_place(&mut embedding);
        Ok(embedding)
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service_for(server: &MockServer) -> OllamaEmbeddingService {
        let config = ServiceConfig::for_provider("ollama")
            .api_endpoint(format!("{}/api/embeddings", server.uri()))
            .dimensions(2);
        OllamaEmbeddingService::new(&config).unwrap()
    }

    #[test]
    fn test_defaults() {
        let service = OllamaEmbeddingService::new(&ServiceConfig::default()).unwrap();
        assert_eq!(service.endpoint(), DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(
            service.model_info(),
            &ModelInfo::new(
                DEFAULT_OLLAMA_MODEL,
                DEFAULT_OLLAMA_DIMENSIONS,
                DEFAULT_OLLAMA_VERSION
            )
        );
    }

    #[test]
    fn test_fields_default_independently() {
        let config = ServiceConfig::for_provider("ollama").dimensions(1024);
        let service = OllamaEmbeddingService::new(&config).unwrap();
        assert_eq!(service.endpoint(), DEFAULT_OLLAMA_ENDPOINT);
        assert_eq!(service.model_info().name, DEFAULT_OLLAMA_MODEL);
        assert_eq!(service.model_info().dimensions, 1024);

        let config = ServiceConfig::for_provider("ollama")
            .model("mxbai-embed-large")
            .extra("version", "2024-06");
        let service = OllamaEmbeddingService::new(&config).unwrap();
        assert_eq!(service.model_info().name, "mxbai-embed-large");
        assert_eq!(service.model_info().dimensions, DEFAULT_OLLAMA_DIMENSIONS);
        assert_eq!(service.model_info().version, "2024-06");
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let config = ServiceConfig::for_provider("ollama").dimensions(0);
        assert!(matches!(
            OllamaEmbeddingService::new(&config),
            Err(EmbeddingError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_shape_and_normalization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "prompt": "hello", "model": "nomic-embed-text" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [3, 4] })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server);
        let embedding = service.generate_embedding("hello").await.unwrap();

        assert_eq!(embedding.len(), 2);
        assert!((embedding[0] - 0.6).abs() < 1e-6);
        assert!((embedding[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_zero_vector_from_server_becomes_basis_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "embedding": [0.0, 0.0] })),
            )
            .mount(&server)
            .await;

        let embedding = service_for(&server).generate_embedding("x").await.unwrap();
        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_missing_embedding_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "vector": [3, 4] })))
            .mount(&server)
            .await;

        let err = service_for(&server)
            .generate_embedding("hello")
            .await
            .unwrap_err();
        match err {
            EmbeddingError::InvalidResponse { reason, .. } => {
                assert!(reason.contains("missing"), "unexpected reason: {}", reason)
            }
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_payloads_are_distinct_errors() {
        let cases = [
            (json!({ "embedding": "not-a-list" }), "not an array"),
            (json!({ "embedding": [] }), "empty"),
            (json!({ "embedding": [1.0, "two"] }), "embedding[1]"),
            (json!({ "embedding": [1.0, 1e300] }), "`embedding[1]` is out of f32 range"),
        ];

        for (body, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                .mount(&server)
                .await;

            let err = service_for(&server).generate_embedding("x").await.unwrap_err();
            match err {
                EmbeddingError::InvalidResponse { reason, .. } => assert!(
                    reason.contains(expected),
                    "body {} gave reason {}",
                    body,
                    reason
                ),
                other => panic!("expected InvalidResponse for {}, got {:?}", body, other),
            }
        }
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let err = service_for(&server).generate_embedding("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_error_status_includes_truncated_body() {
        let server = MockServer::start().await;
        let body = format!("model \"nomic-embed-text\" not found {}", "x".repeat(1000));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string(body))
            .mount(&server)
            .await;

        let err = service_for(&server).generate_embedding("x").await.unwrap_err();
        match err {
            EmbeddingError::Status { status, body, .. } => {
                assert_eq!(status, 404);
                assert!(body.starts_with("model \"nomic-embed-text\" not found"));
                assert!(body.chars().count() <= crate::embeddings::error::MAX_ERROR_BODY_CHARS + 1);
            }
            other => panic!("expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Reserve a port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let endpoint = format!("http://127.0.0.1:{}/api/embeddings", port);

        let config = ServiceConfig::for_provider("ollama").api_endpoint(endpoint.clone());
        let service = OllamaEmbeddingService::new(&config).unwrap();
        let err = service.generate_embedding("x").await.unwrap_err();
        match err {
            EmbeddingError::Transport { endpoint: e, .. } => assert_eq!(e, endpoint),
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_request_timeout_is_ten_seconds() {
        assert_eq!(OLLAMA_REQUEST_TIMEOUT, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_hung_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "embedding": [1.0, 0.0] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = ServiceConfig::for_provider("ollama")
            .api_endpoint(format!("{}/api/embeddings", server.uri()))
            .dimensions(2);
        let service =
            OllamaEmbeddingService::with_timeout(&config, Duration::from_millis(100)).unwrap();

        let started = Instant::now();
        let err = service.generate_embedding("x").await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            EmbeddingError::Transport { source, .. } => {
                assert!(source.is_timeout(), "expected timeout, got {:?}", source)
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_is_sequential_and_ordered() {
        let server = MockServer::start().await;
        // The first text is the slowest; order must still follow the input.
        let responses = [
            ("a", 300u64, json!([1.0, 0.0])),
            ("b", 10, json!([0.0, 2.0])),
            ("c", 150, json!([3.0, 4.0])),
        ];
        for (prompt, delay_ms, embedding) in responses {
            Mock::given(method("POST"))
                .and(body_partial_json(json!({ "prompt": prompt })))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "embedding": embedding }))
                        .set_delay(Duration::from_millis(delay_ms)),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let service = service_for(&server);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let started = Instant::now();
        let embeddings = service.generate_embeddings(&texts).await.unwrap();
        let elapsed = started.elapsed();

        let expected = [[1.0f32, 0.0], [0.0, 1.0], [0.6, 0.8]];
        assert_eq!(embeddings.len(), expected.len());
        for (got, want) in embeddings.iter().zip(expected.iter()) {
            assert!((got[0] - want[0]).abs() < 1e-6 && (got[1] - want[1]).abs() < 1e-6);
        }

        let requests = server.received_requests().await.unwrap();
        let prompts: Vec<String> = requests
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                body["prompt"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);

        // Sequential: latencies add up.
        assert!(elapsed >= Duration::from_millis(460), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "prompt": "bad" })))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [1, 1] })))
            .mount(&server)
            .await;

        let service = service_for(&server);
        let texts = vec!["ok".to_string(), "bad".to_string(), "never".to_string()];
        let err = service.generate_embeddings(&texts).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Status { status: 500, .. }));

        // "never" was not requested.
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
    }
}
