//! End-to-end refresh: crawl a live server, import a Swagger spec, fail a
//! PDF source, and verify what lands in the index.

use std::sync::Arc;

use tempfile::TempDir;

use lexcrawl::catalog::{Priority, Source, SourceCatalog, SourceKind};
use lexcrawl::config::{ChunkingConfig, CrawlerConfig, IndexConfig, PdfConfig, RefreshConfig};
use lexcrawl::documents::{Chunker, doc_id};
use lexcrawl::index::IndexStore;
use lexcrawl::pdf::PdfScraper;
use lexcrawl::refresh::RefreshOrchestrator;
use lexcrawl::{RefreshReport, WebCrawler};

const SWAGGER_SPEC: &str = r#"{
    "info": {"title": "Consent API", "description": "Manage consent."},
    "paths": {
        "/consents": {
            "get": {
                "summary": "List consents",
                "operationId": "listConsents",
                "responses": {"200": {"description": "OK"}}
            }
        }
    }
}"#;

fn source(kind: SourceKind, name: &str, url: String) -> Source {
    Source {
        kind,
        name: name.to_string(),
        url,
        language: "en".to_string(),
        jurisdiction: "EU".to_string(),
        category: "regulation".to_string(),
        priority: Priority::High,
        update_frequency: "weekly".to_string(),
        max_depth: Some(0),
    }
}

struct Pipeline {
    store: Arc<IndexStore>,
    orchestrator: RefreshOrchestrator,
    _dir: TempDir,
}

fn pipeline(catalog: SourceCatalog, crawler_config: CrawlerConfig) -> Pipeline {
    let dir = TempDir::new().unwrap();

    let index_config = IndexConfig {
        path: dir.path().join("index"),
        use_embeddings: false,
    };
    let store = Arc::new(IndexStore::open(&index_config, None, 4).unwrap());

    let pdf_config = PdfConfig {
        cache_dir: dir.path().join("pdf_cache"),
        ..PdfConfig::default()
    };

    let orchestrator = RefreshOrchestrator::new(
        Arc::clone(&store),
        WebCrawler::new(&crawler_config).unwrap(),
        PdfScraper::new(&pdf_config).unwrap(),
        Chunker::new(&ChunkingConfig::default()).unwrap(),
        catalog,
        RefreshConfig {
            per_source_timeout_secs: 10,
            inter_source_delay_ms: 0,
        },
    );

    Pipeline {
        store,
        orchestrator,
        _dir: dir,
    }
}

async fn run(pipeline: &Pipeline) -> RefreshReport {
    pipeline.orchestrator.refresh().await.unwrap()
}

#[tokio::test]
async fn refresh_indexes_all_source_kinds_and_isolates_failures() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let _page = server
        .mock("GET", "/")
        .with_body(
            r#"<html><head><title>GDPR Portal</title></head><body><main>
                <p>Data protection obligations apply to all controllers.</p>
            </main></body></html>"#,
        )
        .create_async()
        .await;

    let _swagger = server
        .mock("GET", "/swagger.json")
        .with_header("content-type", "application/json")
        .with_body(SWAGGER_SPEC)
        .create_async()
        .await;

    let catalog = SourceCatalog::from_sources(vec![
        source(SourceKind::Web, "GDPR Portal", base.clone()),
        // Nothing listens on port 1; the download fails fast.
        source(
            SourceKind::Pdf,
            "Broken PDF",
            "http://127.0.0.1:1/missing.pdf".to_string(),
        ),
    ]);

    let crawler_config = CrawlerConfig {
        swagger_urls: vec![format!("{base}/swagger.json")],
        ..CrawlerConfig::default()
    };

    let pipeline = pipeline(catalog, crawler_config);
    let report = run(&pipeline).await;

    // 1 crawled page + 2 swagger documents (overview and one operation)
    assert_eq!(report.total_documents, 3);
    assert_eq!(report.total_chunks, 3);
    assert_eq!(report.failed_sources, vec!["Broken PDF".to_string()]);

    assert_eq!(pipeline.store.count(), 3);

    // The crawled page is retrievable by its URL-derived id, with the
    // source's provenance metadata attached.
    let page = pipeline.store.get_document(&doc_id(&base)).unwrap().unwrap();
    assert_eq!(page.title, "GDPR Portal");
    assert_eq!(page.metadata.get("jurisdiction").unwrap(), "EU");

    let results = pipeline
        .store
        .search("data protection", 10, None)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].url, base);
}

#[tokio::test]
async fn a_second_refresh_wipes_before_reindexing() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let _page = server
        .mock("GET", "/")
        .with_body("<html><head><title>Docs</title></head><body><p>Stable text.</p></body></html>")
        .expect(2)
        .create_async()
        .await;

    let catalog = SourceCatalog::from_sources(vec![source(SourceKind::Web, "Docs", base)]);
    let pipeline = pipeline(catalog, CrawlerConfig::default());

    let first = run(&pipeline).await;
    let second = run(&pipeline).await;

    assert_eq!(first.total_chunks, 1);
    assert_eq!(second.total_chunks, 1);
    assert_eq!(pipeline.store.count(), 1, "wipe keeps the count stable");
}
