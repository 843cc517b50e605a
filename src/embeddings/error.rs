//! Error taxonomy for embedding providers and the provider factory.

use thiserror::Error;

/// Errors raised while building a provider or generating an embedding.
///
/// Construction-time variants (`MissingConfig`, `InvalidConfig`, `Client`,
/// `ProviderNotRegistered`) happen before any network I/O. Call-time variants
/// (`Transport`, `Status`, `InvalidResponse`) are only produced by providers
/// that talk to an endpoint.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// A field the provider cannot work without is absent.
    #[error("{provider} embedding provider requires `{field}`")]
    MissingConfig {
        provider: &'static str,
        field: &'static str,
    },

    /// A field is present but unusable.
    #[error("invalid {provider} embedding configuration: {reason}")]
    InvalidConfig {
        provider: &'static str,
        reason: String,
    },

    /// No constructor is registered under the requested name.
    #[error("embedding provider '{0}' is not registered")]
    ProviderNotRegistered(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced an HTTP response (connect, timeout, body read).
    #[error("network error calling embedding endpoint {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("embedding endpoint {endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The endpoint answered 2xx but the payload is unusable.
    #[error("invalid response from embedding endpoint {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl EmbeddingError {
    /// True for failures detected before any request was sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig { .. }
                | Self::InvalidConfig { .. }
                | Self::ProviderNotRegistered(_)
                | Self::Client(_)
        )
    }
}

/// Result alias used throughout the embeddings module.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Maximum number of characters of an error body kept in `Status` errors.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

/// Truncate an error body on a char boundary so logs stay bounded.
pub(crate) fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
