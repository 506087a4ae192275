//! Core document types shared by the crawler, PDF extractor, and index.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Where a document's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// Extracted from a crawled HTML page.
    Scraper,
    /// Extracted from a downloaded PDF.
    Pdf,
    /// Synthesized from a Swagger/OpenAPI specification.
    Swagger,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Scraper => "scraper",
            DocumentSource::Pdf => "pdf",
            DocumentSource::Swagger => "swagger",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scraper" => Some(DocumentSource::Scraper),
            "pdf" => Some(DocumentSource::Pdf),
            "swagger" => Some(DocumentSource::Swagger),
            _ => None,
        }
    }
}

/// Derive a stable document id from a source URL.
pub fn doc_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extracted, normalized text unit with provenance.
///
/// Invariant: `content` is non-empty. Producers drop empty-content pages
/// before constructing a `Document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Content-hash of the source URL (plus operation id for API-spec
    /// entries, chunk suffix for chunks).
    pub id: String,

    /// Normalized text content.
    pub content: String,

    /// Page title, source name, or operation summary.
    pub title: String,

    /// URL the content was fetched from.
    pub url: String,

    /// Provenance tag.
    pub source: DocumentSource,

    /// Free-form provenance metadata (jurisdiction, language, category...).
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create a document with an id derived from the URL.
    pub fn new(
        content: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        source: DocumentSource,
    ) -> Self {
        let url = url.into();
        Self {
            id: doc_id(&url),
            content: content.into(),
            title: title.into(),
            url,
            source,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach provenance metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Character count of the content (not bytes).
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// First `max_chars` characters of content, on a UTF-8 boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_stable_and_url_derived() {
        let a = doc_id("https://example.test/a");
        let b = doc_id("https://example.test/a");
        let c = doc_id("https://example.test/b");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn document_new_derives_id_from_url() {
        let doc = Document::new(
            "body",
            "Title",
            "https://example.test/x",
            DocumentSource::Scraper,
        );
        assert_eq!(doc.id, doc_id("https://example.test/x"));
        assert_eq!(doc.source.as_str(), "scraper");
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let doc = Document::new("héllo wörld", "t", "https://e.test", DocumentSource::Pdf);
        assert_eq!(doc.preview(5), "héllo");
    }
}
