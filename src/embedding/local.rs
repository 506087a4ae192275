//! Local fastembed backend.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbeddingBackend, EmbeddingError};
use crate::config::EmbeddingConfig;

/// On-process embedding model.
///
/// The model is wrapped in a Mutex for interior mutability and driven from
/// a blocking thread since inference is CPU-bound. The dimension is probed
/// with a test embedding at construction rather than trusted from config.
pub struct LocalBackend {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl LocalBackend {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let kind = parse_model(&config.model)?;

        let mut model =
            TextEmbedding::try_new(InitOptions::new(kind).with_show_download_progress(false))
                .map_err(|e| EmbeddingError::Init(e.to_string()))?;

        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::Init(e.to_string()))?;
        let dimension = probe
            .into_iter()
            .next()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::Init("model produced no probe vector".to_string()))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| EmbeddingError::Embed("embedding model mutex poisoned".to_string()))?;
            guard
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Embed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::Embed(e.to_string()))?
    }
}

/// Map a configured model name to a fastembed model.
fn parse_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML6V2Q" => Ok(EmbeddingModel::AllMiniLML6V2Q),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        "ParaphraseMLMiniLML12V2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_names_parse() {
        assert!(parse_model("AllMiniLML6V2").is_ok());
        assert!(parse_model("MultilingualE5Small").is_ok());
    }

    #[test]
    fn unknown_model_names_are_rejected() {
        let err = parse_model("NotARealModel").unwrap_err();
        assert!(matches!(err, EmbeddingError::UnknownModel(name) if name == "NotARealModel"));
    }
}
