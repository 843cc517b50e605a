//! Embedding generation module
//!
//! Provides unit-length vector embeddings for knowledge-graph entities and
//! observations without tying callers to a particular backend.
//!
//! Architecture follows the project pattern (trait + impls + factory):
//! - `EmbeddingService` trait: async interface every provider implements
//! - `OllamaEmbeddingService`: local model server (`/api/embeddings`)
//! - `OpenAiEmbeddingService`: hosted OpenAI-compatible API
//! - `DefaultEmbeddingService`: random unit vectors, no network
//! - `EmbeddingServiceFactory`: name → constructor registry with an
//!   environment entry point that always yields a working service
//! - `CachedEmbeddingService`: optional in-memory cache decorator

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod normalize;
pub mod ollama;
pub mod openai;
pub mod synthetic;
pub mod traits;

pub use cache::CachedEmbeddingService;
pub use config::{parse_flag, EmbeddingEnv, ModelInfo, ServiceConfig, DEFAULT_PROVIDER};
pub use error::{EmbeddingError, Result};
pub use factory::{
    EmbeddingServiceFactory, ProviderConstructor, ProviderRegistry, DEFAULT_PROVIDER_NAME,
    OLLAMA_PROVIDER_NAME, OPENAI_PROVIDER_NAME,
};
pub use normalize::{l2_norm, normalize_in_place};
pub use ollama::OllamaEmbeddingService;
pub use openai::OpenAiEmbeddingService;
pub use synthetic::DefaultEmbeddingService;
pub use traits::EmbeddingService;
