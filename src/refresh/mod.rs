//! Full refresh cycle: wipe the index, then re-ingest every catalog
//! source in order.
//!
//! One refresh runs at a time; a second concurrent call is rejected
//! outright rather than queued. Source failures are isolated: a source
//! that times out or fails to index is recorded in the report and the
//! cycle moves on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Source, SourceCatalog};
use crate::config::RefreshConfig;
use crate::crawler::WebCrawler;
use crate::documents::{Chunker, Document};
use crate::index::{IndexStore, StoreError};
use crate::pdf::PdfScraper;

/// Errors that abort a refresh before any source is processed.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("a refresh is already running")]
    AlreadyRunning,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    /// Documents extracted across all sources, before chunking.
    pub total_documents: usize,

    /// Chunks written to the index.
    pub total_chunks: usize,

    /// Names of sources that timed out or failed to index.
    pub failed_sources: Vec<String>,
}

/// Drives the scrape → chunk → index pipeline over the catalog.
pub struct RefreshOrchestrator {
    store: Arc<IndexStore>,
    crawler: WebCrawler,
    pdf: PdfScraper,
    chunker: Chunker,
    catalog: SourceCatalog,
    config: RefreshConfig,
    busy: AtomicBool,
}

impl RefreshOrchestrator {
    pub fn new(
        store: Arc<IndexStore>,
        crawler: WebCrawler,
        pdf: PdfScraper,
        chunker: Chunker,
        catalog: SourceCatalog,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            crawler,
            pdf,
            chunker,
            catalog,
            config,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Run one full refresh cycle.
    ///
    /// The index is wiped exactly once, then web sources, Swagger
    /// endpoints, and PDF sources are processed in catalog order with a
    /// fixed pause between sources.
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(RefreshError::AlreadyRunning);
        }

        let result = self.run().await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> Result<RefreshReport, RefreshError> {
        tracing::info!("Starting documentation refresh");
        self.store.delete_all()?;

        let mut report = RefreshReport::default();

        for source in self.catalog.web_sources() {
            self.refresh_web_source(source, &mut report).await;
            tokio::time::sleep(self.config.inter_source_delay()).await;
        }

        let swagger_docs = self.crawler.import_swagger().await;
        if !swagger_docs.is_empty() {
            self.index_documents("swagger", swagger_docs, &mut report)
                .await;
        }

        for source in self.catalog.pdf_sources() {
            self.refresh_pdf_source(source, &mut report).await;
            tokio::time::sleep(self.config.inter_source_delay()).await;
        }

        tracing::info!(
            "Refresh complete: {} documents, {} chunks, {} failed sources",
            report.total_documents,
            report.total_chunks,
            report.failed_sources.len()
        );
        Ok(report)
    }

    async fn refresh_web_source(&self, source: &Source, report: &mut RefreshReport) {
        let scrape = self.crawler.scrape(std::slice::from_ref(source));
        let documents = match tokio::time::timeout(self.config.per_source_timeout(), scrape).await {
            Ok(documents) => documents,
            Err(_) => {
                tracing::warn!(
                    "Source {} timed out after {}s",
                    source.name,
                    self.config.per_source_timeout_secs
                );
                report.failed_sources.push(source.name.clone());
                return;
            }
        };

        let metadata = source.metadata();
        let documents: Vec<Document> = documents
            .into_iter()
            .map(|doc| doc.with_metadata(metadata.clone()))
            .collect();

        self.index_documents(&source.name, documents, report).await;
    }

    async fn refresh_pdf_source(&self, source: &Source, report: &mut RefreshReport) {
        match self.pdf.scrape(source).await {
            Some(document) => {
                self.index_documents(&source.name, vec![document], report)
                    .await;
            }
            None => {
                tracing::warn!("Source {} failed to download", source.name);
                report.failed_sources.push(source.name.clone());
            }
        }
    }

    /// Chunk and index one source's documents, recording the failure
    /// instead of propagating it.
    async fn index_documents(
        &self,
        source_name: &str,
        documents: Vec<Document>,
        report: &mut RefreshReport,
    ) {
        let chunks = self.chunker.chunk(&documents);
        match self.store.add_documents(&chunks).await {
            Ok(added) => {
                report.total_documents += documents.len();
                report.total_chunks += added;
            }
            Err(e) => {
                tracing::warn!("Error indexing source {source_name}: {e}");
                report.failed_sources.push(source_name.to_string());
            }
        }
    }
}
