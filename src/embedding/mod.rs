//! Embedding backends behind a single service facade.
//!
//! The backend is chosen and validated at construction, never lazily in
//! the middle of a batch: `auto` tries the local fastembed model first and
//! falls back to the OpenAI-compatible API. The service's dimension is
//! fixed for its lifetime; the index stores vectors of exactly that size.

pub mod api;
pub mod local;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
pub use api::ApiBackend;
pub use local::LocalBackend;

/// Errors from embedding backend selection and encoding.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("model initialization failed: {0}")]
    Init(String),

    #[error("embedding failed: {0}")]
    Embed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unknown embedding model: {0}")]
    UnknownModel(String),
}

/// One way of turning texts into fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Vector length produced by this backend. Constant per instance.
    fn dimension(&self) -> usize;

    /// Encode a non-empty batch, one vector per input, in input order.
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Facade over the selected backend.
pub struct EmbeddingService {
    backend: Box<dyn EmbeddingBackend>,
}

impl EmbeddingService {
    /// Select and validate a backend per configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let backend: Box<dyn EmbeddingBackend> = match config.provider {
            EmbeddingProvider::Local => Box::new(LocalBackend::new(config)?),
            EmbeddingProvider::Api => Box::new(ApiBackend::new(config)?),
            EmbeddingProvider::Auto => match LocalBackend::new(config) {
                Ok(local) => Box::new(local),
                Err(e) => {
                    tracing::warn!("Local embedding model unavailable ({e}); trying API");
                    Box::new(ApiBackend::new(config)?)
                }
            },
        };

        tracing::info!(
            "Embedding backend: {} (dimension {})",
            backend.name(),
            backend.dimension()
        );
        Ok(Self { backend })
    }

    /// Wrap an explicit backend (used by tests).
    pub fn with_backend(backend: Box<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    /// Encode a batch of texts. An empty input produces an empty output
    /// without touching the backend.
    pub async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.backend.encode(texts.to_vec()).await
    }

    /// Encode a single text.
    pub async fn encode_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.backend.encode(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::Embed("backend returned no vector".to_string()))
    }
}

/// Cosine similarity between two vectors; 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
