//! PDF download and text extraction.
//!
//! Downloads are cached on disk keyed by a hash of the URL, so a refresh
//! never re-fetches an unchanged document. Extraction runs on a blocking
//! thread under a hard deadline; documents that cannot be extracted still
//! produce a record whose content is a sentinel string, so the index
//! remembers the attempt.

pub mod backend;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::catalog::Source;
use crate::config::PdfConfig;
use crate::documents::{Document, DocumentSource, doc_id};
use backend::PdfBackend;

/// Stored when the page count suggests a scanned, image-only document.
pub const TOO_MANY_PAGES: &str = "[PDF with too many pages - likely scanned document]";
/// Stored when the backend errored or the deadline expired.
pub const EXTRACTION_FAILED: &str = "[PDF extraction failed]";
/// Stored when every page came back empty.
pub const NO_TEXT: &str = "[PDF extracted but contains no text]";

const CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Errors from PDF download and extraction.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("PDF rendering error: {0}")]
    Render(String),

    #[error("PDF extraction error: {0}")]
    Extraction(String),

    #[error("no PDF extraction backend available")]
    NoBackend,
}

/// Downloads PDFs into the cache and extracts their text.
pub struct PdfScraper {
    client: reqwest::Client,
    backend: Arc<dyn PdfBackend>,
    config: PdfConfig,
}

impl PdfScraper {
    /// Create a scraper, selecting the extraction backend up front.
    pub fn new(config: &PdfConfig) -> Result<Self, PdfError> {
        Self::with_backend(config, Arc::from(backend::select_backend()?))
    }

    /// Create a scraper with an explicit backend.
    pub fn with_backend(config: &PdfConfig, backend: Arc<dyn PdfBackend>) -> Result<Self, PdfError> {
        std::fs::create_dir_all(&config.cache_dir)?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            backend,
            config: config.clone(),
        })
    }

    /// Download and extract one catalog source.
    pub async fn scrape(&self, source: &Source) -> Option<Document> {
        self.scrape_pdf(&source.url, &source.name, source.metadata())
            .await
    }

    /// Download (or reuse from cache) and extract one PDF.
    ///
    /// Download failure yields `None`; extraction problems yield a document
    /// whose content is one of the sentinel strings.
    pub async fn scrape_pdf(
        &self,
        url: &str,
        title: &str,
        metadata: BTreeMap<String, String>,
    ) -> Option<Document> {
        let path = match self.download(url).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Error downloading PDF {url}: {e}");
                return None;
            }
        };

        let content = self.extract(path).await;

        Some(
            Document::new(content, title, url, DocumentSource::Pdf).with_metadata(metadata),
        )
    }

    /// Fetch the PDF into the cache directory, streaming to disk.
    ///
    /// A cache hit skips the network entirely. A failed download removes
    /// the partial file so the next attempt starts clean.
    async fn download(&self, url: &str) -> Result<PathBuf, PdfError> {
        let path = self.config.cache_dir.join(cache_filename(url));

        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("PDF cache hit for {url}");
            return Ok(path);
        }

        tracing::info!("Downloading PDF: {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;

        if let Err(e) = write_stream(response, &path).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        Ok(path)
    }

    /// Run extraction on a blocking thread under the configured deadline.
    ///
    /// On timeout the blocking thread is left to finish on its own; its
    /// result is discarded.
    async fn extract(&self, path: PathBuf) -> String {
        let backend = Arc::clone(&self.backend);
        let max_pages = self.config.max_pages;

        let task =
            tokio::task::spawn_blocking(move || extract_blocking(&*backend, &path, max_pages));

        match tokio::time::timeout(self.config.extraction_timeout(), task).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                tracing::warn!("PDF extraction task failed: {e}");
                EXTRACTION_FAILED.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    "PDF extraction timed out after {}s",
                    self.config.extraction_timeout_secs
                );
                EXTRACTION_FAILED.to_string()
            }
        }
    }
}

async fn write_stream(response: reqwest::Response, path: &Path) -> Result<(), PdfError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Apply the extraction policy: page-count guard, then per-page blocks.
///
/// Pages whose text is blank are skipped while page numbering follows the
/// document, so a reader can map a block back to the original page.
fn extract_blocking(backend: &dyn PdfBackend, path: &Path, max_pages: usize) -> String {
    let count = match backend.page_count(path) {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Error reading PDF page count: {e}");
            return EXTRACTION_FAILED.to_string();
        }
    };

    if count > max_pages {
        tracing::warn!("PDF has {count} pages (limit {max_pages}); treating as scanned");
        return TOO_MANY_PAGES.to_string();
    }

    let pages = match backend.extract_pages(path) {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!("Error extracting PDF text: {e}");
            return EXTRACTION_FAILED.to_string();
        }
    };

    let blocks: Vec<String> = pages
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| format!("\n--- Page {} ---\n{}", i + 1, text))
        .collect();

    if blocks.is_empty() {
        return NO_TEXT.to_string();
    }

    blocks.join("\n")
}

/// Cache filename: 16 hex chars of the URL hash plus the sanitized path
/// stem. The hash prefix keeps two URLs with the same filename apart.
fn cache_filename(url: &str) -> String {
    let digest = doc_id(url);
    let prefix = &digest[..16];

    let stem = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|last| {
            Path::new(&last)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{prefix}_{sanitized}.pdf")
}
