//! Configuration module for the documentation indexing pipeline.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`lexcrawl.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `LEXCRAWL_` and use double
//! underscores to separate nested levels:
//! - `LEXCRAWL_CRAWLER__MAX_PAGES=500` sets `crawler.max_pages`
//! - `LEXCRAWL_EMBEDDING__PROVIDER=api` sets `embedding.provider`
//! - `LEXCRAWL_INDEX__PATH=/var/lib/lexcrawl` sets `index.path`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Web crawler limits and HTTP behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Document chunking parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding backend selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Search index storage
    #[serde(default)]
    pub index: IndexConfig,

    /// PDF download and extraction
    #[serde(default)]
    pub pdf: PdfConfig,

    /// Refresh cycle pacing
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Source catalog location
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrawlerConfig {
    /// Default maximum crawl depth; sources can override per entry
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Global cap on visited pages per scrape invocation
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Swagger/OpenAPI JSON endpoints, imported outside the HTML crawl
    #[serde(default)]
    pub swagger_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Window size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between adjacent windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Validate configuration values.
    ///
    /// An overlap at or above the window size would stall the window, so it
    /// is rejected here rather than clamped.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than zero".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Backend preference: "auto" probes local then api, or pin one
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Local model name (fastembed identifier)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL for the OpenAI-compatible embeddings endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Remote model identifier
    #[serde(default = "default_api_model")]
    pub api_model: String,

    /// Vector dimension for API and keyword-only modes.
    /// Local backends report their own dimension and ignore this.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Token budget per text on the API path
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Probe local first, then the API backend
    Auto,
    /// Local fastembed model only
    Local,
    /// OpenAI-compatible API only
    Api,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Directory holding the tantivy collection
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Semantic mode when true; keyword-only mode stores zero vectors
    #[serde(default = "default_true")]
    pub use_embeddings: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PdfConfig {
    /// Directory for downloaded PDFs, keyed by URL hash
    #[serde(default = "default_pdf_cache_dir")]
    pub cache_dir: PathBuf,

    /// Page count above which a PDF is treated as scanned/image-only
    #[serde(default = "default_pdf_max_pages")]
    pub max_pages: usize,

    /// Hard deadline for one document's extraction, in seconds
    #[serde(default = "default_pdf_timeout")]
    pub extraction_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RefreshConfig {
    /// Per-source scrape deadline for web sources, in seconds
    #[serde(default = "default_source_timeout")]
    pub per_source_timeout_secs: u64,

    /// Fixed pause between sources, in milliseconds
    #[serde(default = "default_source_delay")]
    pub inter_source_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// TOML file listing sources to ingest
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `crawler = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_max_depth() -> usize {
    2
}
fn default_max_pages() -> usize {
    1000
}
fn default_crawl_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Auto
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dimension() -> usize {
    384
}
fn default_max_tokens() -> usize {
    8191
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/index")
}
fn default_true() -> bool {
    true
}
fn default_pdf_cache_dir() -> PathBuf {
    PathBuf::from("data/pdf_cache")
}
fn default_pdf_max_pages() -> usize {
    500
}
fn default_pdf_timeout() -> u64 {
    10
}
fn default_source_timeout() -> u64 {
    60
}
fn default_source_delay() -> u64 {
    1000
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/sources.toml")
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            timeout_secs: default_crawl_timeout(),
            user_agent: default_user_agent(),
            swagger_urls: Vec::new(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_base: default_api_base(),
            api_model: default_api_model(),
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            use_embeddings: true,
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_pdf_cache_dir(),
            max_pages: default_pdf_max_pages(),
            extraction_timeout_secs: default_pdf_timeout(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            per_source_timeout_secs: default_source_timeout(),
            inter_source_delay_ms: default_source_delay(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, `lexcrawl.toml`, and environment.
    ///
    /// Later layers win: env overrides file, file overrides defaults.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("lexcrawl.toml")
    }

    /// Load settings with an explicit config file path.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LEXCRAWL_").split("__"))
            .extract()?;

        settings
            .chunking
            .validate()
            .map_err(figment::Error::from)?;

        Ok(settings)
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PdfConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}

impl RefreshConfig {
    pub fn per_source_timeout(&self) -> Duration {
        Duration::from_secs(self.per_source_timeout_secs)
    }

    pub fn inter_source_delay(&self) -> Duration {
        Duration::from_millis(self.inter_source_delay_ms)
    }
}
