//! Test helper providers and shared test state
//!
//! Provides a recording `EmbeddingService` stub, a constructor that always
//! fails, and a lock serializing tests that mutate process environment.
#![allow(dead_code)]

use crate::embeddings::{EmbeddingError, EmbeddingService, ModelInfo, Result, ServiceConfig};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Env vars are process-global; every test touching them holds this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Stub provider that records every text it is asked to embed.
///
/// Vectors are `[len(text), 1.0]` normalized, so different-length texts get
/// distinguishable embeddings. Texts listed in `fail_on` produce a
/// `Status` error. Batch calls are counted separately and then embed each
/// text in order, aborting on the first failure.
pub struct RecordingService {
    info: ModelInfo,
    calls: AtomicUsize,
    batches: AtomicUsize,
    seen: Mutex<Vec<String>>,
    fail_on: Vec<String>,
}

impl RecordingService {
    pub fn new(name: &str) -> Self {
        Self {
            info: ModelInfo::new(name, 2, "test"),
            calls: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail_on: Vec::new(),
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingService for RecordingService {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());

        if self.fail_on.iter().any(|t| t == text) {
            return Err(EmbeddingError::Status {
                endpoint: "test://recording".into(),
                status: 503,
                body: format!("refusing {}", text),
            });
        }

        let mut vector = vec![text.len() as f32, 1.0];
        crate::embeddings::normalize_in_place(&mut vector);
        Ok(vector)
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.generate_embedding(text).await?);
        }
        Ok(embeddings)
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

/// Registry constructor that always fails.
pub fn failing_constructor(_config: &ServiceConfig) -> Result<Arc<dyn EmbeddingService>> {
    Err(EmbeddingError::InvalidConfig {
        provider: "broken",
        reason: "always fails".into(),
    })
}
