//! Dual-mode document index: semantic (embedding cosine) or keyword
//! (weighted term overlap) over the same persistent tantivy collection.

pub mod schema;
pub mod store;

use serde::Serialize;
use tantivy::directory::error::OpenDirectoryError;
use thiserror::Error;

use crate::documents::{Document, DocumentSource};
use crate::embedding::EmbeddingError;

pub use store::IndexStore;

/// Errors from index storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("Directory error: {0}")]
    Directory(#[from] OpenDirectoryError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("index dimension mismatch: stored {stored}, configured {configured}")]
    DimensionMismatch { stored: usize, configured: usize },

    #[error("Index error: {0}")]
    Index(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for index store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// How documents are scored against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Cosine similarity between query and document embeddings.
    Semantic,
    /// Weighted phrase and term overlap on content and title.
    Keyword,
}

/// One scored search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: DocumentSource,
    pub content: String,
    pub metadata: std::collections::BTreeMap<String, String>,
    /// Cosine similarity (semantic) or keyword weight (keyword).
    pub score: f32,
}

impl SearchResult {
    fn from_document(document: Document, score: f32) -> Self {
        Self {
            id: document.id,
            title: document.title,
            url: document.url,
            source: document.source,
            content: document.content,
            metadata: document.metadata,
            score,
        }
    }
}
