//! OpenAI-compatible embeddings API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

use super::{EmbeddingBackend, EmbeddingError};
use crate::config::EmbeddingConfig;

/// Requests above this size are split; matches the common server limit.
const BATCH_SIZE: usize = 100;

/// Rough character budget per token when no tokenizer is available.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Remote embeddings over the `/embeddings` endpoint.
///
/// Texts are truncated to the configured token budget before upload; the
/// reported dimension comes from configuration since the model is remote.
pub struct ApiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    max_tokens: usize,
    tokenizer: Option<CoreBPE>,
}

impl ApiBackend {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| EmbeddingError::Init("OPENAI_API_KEY is not set".to_string()))?;

        let tokenizer = tiktoken_rs::cl100k_base().ok();
        if tokenizer.is_none() {
            tracing::warn!("Tokenizer unavailable; falling back to character-based truncation");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.api_model.clone(),
            dimension: config.dimension,
            max_tokens: config.max_tokens,
            tokenizer,
        })
    }

    async fn encode_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingsResponse = response.json().await?;
        if body.data.len() != batch.len() {
            return Err(EmbeddingError::Embed(format!(
                "expected {} vectors, got {}",
                batch.len(),
                body.data.len()
            )));
        }

        let mut items = body.data;
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for ApiBackend {
    fn name(&self) -> &'static str {
        "api"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_to_budget(self.tokenizer.as_ref(), t, self.max_tokens))
            .collect();

        let mut vectors = Vec::with_capacity(truncated.len());
        for batch in truncated.chunks(BATCH_SIZE) {
            vectors.extend(self.encode_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Truncate text to the token budget, decoding back to a string.
///
/// Without a tokenizer the budget is approximated as four characters per
/// token, which over-truncates rarely and never under-truncates by much.
fn truncate_to_budget(tokenizer: Option<&CoreBPE>, text: &str, max_tokens: usize) -> String {
    if let Some(bpe) = tokenizer {
        let tokens = bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        if let Ok(decoded) = bpe.decode(tokens[..max_tokens].to_vec()) {
            return decoded;
        }
    }
    text.chars().take(max_tokens * CHARS_PER_TOKEN).collect()
}
