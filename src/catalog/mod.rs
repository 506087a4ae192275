//! Source catalog: typed records describing where to fetch content from.
//!
//! Sources are loaded from a TOML file of `[[source]]` tables and are
//! read-only afterwards. Each record carries per-source crawl parameters
//! (notably `max_depth`) alongside provenance metadata that ends up on the
//! indexed documents.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from catalog loading.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error reading catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Kind of content behind a source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Web,
    Pdf,
}

/// Priority level for source updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// A configured origin to ingest. Identity is the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub jurisdiction: String,
    #[serde(default)]
    pub category: String,
    pub priority: Priority,
    #[serde(default)]
    pub update_frequency: String,
    /// Overrides the crawler's default depth when set.
    pub max_depth: Option<usize>,
}

impl Source {
    /// Provenance metadata carried onto every document from this source.
    /// Empty fields are omitted.
    pub fn metadata(&self) -> std::collections::BTreeMap<String, String> {
        let mut metadata = std::collections::BTreeMap::new();
        for (key, value) in [
            ("language", self.language.as_str()),
            ("jurisdiction", self.jurisdiction.as_str()),
            ("category", self.category.as_str()),
            ("priority", self.priority.as_str()),
            ("update_frequency", self.update_frequency.as_str()),
        ] {
            if !value.is_empty() {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
        metadata
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "source")]
    sources: Vec<Source>,
}

/// Loaded catalog of sources, preserving file order.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: Vec<Source>,
}

impl SourceCatalog {
    /// Load a catalog from a TOML file.
    ///
    /// Entries without a URL are skipped rather than failing the load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&raw)
    }

    /// Parse catalog contents from a TOML string.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        let sources: Vec<Source> = file
            .sources
            .into_iter()
            .filter(|s| !s.url.is_empty())
            .collect();
        tracing::info!("Loaded {} sources from catalog", sources.len());
        Ok(Self { sources })
    }

    /// Build a catalog from in-memory sources (used by tests and callers
    /// that manage their own configuration).
    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// All sources in file order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Sources filtered by priority, jurisdiction, and kind. `None` filters
    /// are ignored.
    pub fn filtered(
        &self,
        priority: Option<&[Priority]>,
        jurisdiction: Option<&[&str]>,
        kind: Option<&[SourceKind]>,
    ) -> Vec<&Source> {
        self.sources
            .iter()
            .filter(|s| priority.is_none_or(|p| p.contains(&s.priority)))
            .filter(|s| jurisdiction.is_none_or(|j| j.contains(&s.jurisdiction.as_str())))
            .filter(|s| kind.is_none_or(|k| k.contains(&s.kind)))
            .collect()
    }

    /// All web sources, in catalog order.
    pub fn web_sources(&self) -> Vec<&Source> {
        self.filtered(None, None, Some(&[SourceKind::Web]))
    }

    /// All PDF sources, in catalog order.
    pub fn pdf_sources(&self) -> Vec<&Source> {
        self.filtered(None, None, Some(&[SourceKind::Pdf]))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
