//! Crawl-and-index core for legal and technical documentation.
//!
//! The pipeline runs in three stages: acquisition (bounded web crawler,
//! Swagger/OpenAPI importer, cached PDF extractor), normalization
//! (overlapping character-window chunking), and storage (a persistent
//! tantivy collection searched either semantically via embeddings or by
//! weighted keyword overlap). The [`RefreshOrchestrator`] ties the stages
//! together over a TOML source catalog.
//!
//! # Example
//!
//! ```no_run
//! use lexcrawl::{IndexStore, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! let store = IndexStore::open(&settings.index, None, settings.embedding.dimension)?;
//! let results = store.search("data protection impact assessment", 10, None).await?;
//! for result in results {
//!     println!("{:.3}  {}", result.score, result.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod documents;
pub mod embedding;
pub mod index;
pub mod logging;
pub mod pdf;
pub mod refresh;

pub use catalog::{Priority, Source, SourceCatalog, SourceKind};
pub use config::Settings;
pub use crawler::WebCrawler;
pub use documents::{Chunker, Document, DocumentSource};
pub use embedding::EmbeddingService;
pub use index::{IndexStore, SearchMode, SearchResult};
pub use pdf::PdfScraper;
pub use refresh::{RefreshOrchestrator, RefreshReport};
