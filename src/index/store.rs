//! Persistent document store over a tantivy index.
//!
//! The store keeps one tantivy document per chunk, with the embedding
//! vector stored inline as bytes. Both search modes scan the stored
//! documents linearly: semantic mode scores by cosine similarity against
//! the query embedding, keyword mode by weighted phrase and term overlap.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{
    Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument, Term,
};

use super::schema::IndexSchema;
use super::{SearchMode, SearchResult, StoreError, StoreResult};
use crate::config::IndexConfig;
use crate::documents::{Document, DocumentSource};
use crate::embedding::{EmbeddingService, cosine_similarity};

/// Cap applied to every search limit.
const MAX_SEARCH_LIMIT: usize = 20;

/// Upper bound on documents touched by a full-collection scan.
const SCAN_LIMIT: usize = 100_000;

/// One stored document plus its embedding, read back from the index.
struct StoredRecord {
    document: Document,
    embedding: Vec<f32>,
}

/// Dual-mode document index.
pub struct IndexStore {
    index: Index,
    reader: IndexReader,
    schema: IndexSchema,
    writer: Mutex<Option<IndexWriter<TantivyDocument>>>,
    embeddings: Option<EmbeddingService>,
    dimension: usize,
    heap_size: usize,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("dimension", &self.dimension)
            .field("heap_size", &self.heap_size)
            .field("semantic", &self.embeddings.is_some())
            .finish_non_exhaustive()
    }
}

impl IndexStore {
    /// Create or reopen the index at the configured path.
    ///
    /// `embeddings: Some` selects semantic mode and fixes the vector
    /// dimension from the backend; `None` selects keyword mode, which
    /// stores all-zero vectors of `fallback_dimension`. The mode is fixed
    /// for the lifetime of the store.
    pub fn open(
        config: &IndexConfig,
        embeddings: Option<EmbeddingService>,
        fallback_dimension: usize,
    ) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.path)?;

        let (tantivy_schema, schema) = IndexSchema::build();

        let exists = config.path.join("meta.json").exists();
        let index = if exists {
            Index::open_in_dir(&config.path)?
        } else {
            let dir = MmapDirectory::open(&config.path)?;
            Index::create(dir, tantivy_schema, IndexSettings::default())?
        };

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        if exists {
            reader.reload()?;
        }

        let dimension = embeddings
            .as_ref()
            .map_or(fallback_dimension, |e| e.dimension());

        // The dimension is part of the collection's identity: vectors of a
        // different length must never be mixed into or scored against it.
        let marker = config.path.join("dimension");
        if marker.exists() {
            let stored: usize = std::fs::read_to_string(&marker)?
                .trim()
                .parse()
                .map_err(|_| StoreError::Index("unreadable dimension marker".to_string()))?;
            if stored != dimension {
                return Err(StoreError::DimensionMismatch {
                    stored,
                    configured: dimension,
                });
            }
        } else {
            std::fs::write(&marker, dimension.to_string())?;
        }

        tracing::info!(
            "Opened index at {} ({} mode, dimension {dimension})",
            config.path.display(),
            if embeddings.is_some() {
                "semantic"
            } else {
                "keyword"
            },
        );

        Ok(Self {
            index,
            reader,
            schema,
            writer: Mutex::new(None),
            embeddings,
            dimension,
            heap_size: 50_000_000,
        })
    }

    /// Whether this store embeds documents.
    pub fn is_semantic(&self) -> bool {
        self.embeddings.is_some()
    }

    /// Add or replace documents, one upsert per document id.
    ///
    /// A single commit covers the whole batch; readers never observe a
    /// partially applied batch. Returns the number of documents written.
    pub async fn add_documents(&self, documents: &[Document]) -> StoreResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let vectors = match &self.embeddings {
            Some(service) => {
                let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
                service.encode(&texts).await?
            }
            None => vec![vec![0.0; self.dimension]; documents.len()],
        };

        let indexed_at = chrono::Utc::now().timestamp() as u64;

        {
            let mut writer_guard = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
            let writer = self.ensure_writer(&mut writer_guard)?;

            for (document, vector) in documents.iter().zip(vectors.iter()) {
                writer.delete_term(Term::from_field_text(self.schema.id, &document.id));

                let mut doc = TantivyDocument::new();
                doc.add_text(self.schema.id, &document.id);
                doc.add_text(self.schema.content, &document.content);
                doc.add_text(self.schema.title, &document.title);
                doc.add_text(self.schema.url, &document.url);
                doc.add_text(self.schema.source, document.source.as_str());
                let metadata = serde_json::to_string(&document.metadata)
                    .unwrap_or_else(|_| "{}".to_string());
                doc.add_text(self.schema.metadata, &metadata);
                doc.add_bytes(self.schema.embedding, &vector_to_bytes(vector));
                doc.add_u64(self.schema.indexed_at, indexed_at);

                writer.add_document(doc)?;
            }

            writer.commit()?;
        }

        self.reader.reload()?;

        tracing::info!("Indexed {} documents", documents.len());
        Ok(documents.len())
    }

    /// Search the index.
    ///
    /// The query must be non-empty; the limit is clamped to
    /// [`MAX_SEARCH_LIMIT`]. `mode: None` picks semantic when embeddings
    /// are available, keyword otherwise. Requesting semantic mode on a
    /// keyword-only store falls back to keyword scoring.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        mode: Option<SearchMode>,
    ) -> StoreResult<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(StoreError::EmptyQuery);
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let mode = match (mode, &self.embeddings) {
            (Some(SearchMode::Semantic), Some(_)) | (None, Some(_)) => SearchMode::Semantic,
            (Some(SearchMode::Semantic), None) => {
                tracing::warn!("Semantic search requested without embeddings; using keyword mode");
                SearchMode::Keyword
            }
            _ => SearchMode::Keyword,
        };

        match mode {
            SearchMode::Semantic => self.search_semantic(query, limit).await,
            SearchMode::Keyword => self.search_keyword(query, limit),
        }
    }

    async fn search_semantic(&self, query: &str, limit: usize) -> StoreResult<Vec<SearchResult>> {
        let service = self
            .embeddings
            .as_ref()
            .ok_or_else(|| StoreError::Index("semantic search without embeddings".to_string()))?;
        let query_vec = service.encode_one(query).await?;

        let mut results: Vec<SearchResult> = self
            .scan_all()?
            .into_iter()
            .filter_map(|record| {
                if record.embedding.len() != query_vec.len() {
                    tracing::warn!(
                        "Skipping document {} with stale embedding dimension {}",
                        record.document.id,
                        record.embedding.len()
                    );
                    return None;
                }
                let score = cosine_similarity(&query_vec, &record.embedding);
                Some(SearchResult::from_document(record.document, score))
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    fn search_keyword(&self, query: &str, limit: usize) -> StoreResult<Vec<SearchResult>> {
        let mut results: Vec<SearchResult> = self
            .scan_all()?
            .into_iter()
            .filter_map(|record| {
                let score =
                    keyword_score(query, &record.document.content, &record.document.title);
                (score > 0.0).then(|| SearchResult::from_document(record.document, score))
            })
            .collect();

        // sort_by is stable, so equal scores keep index order
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Exact lookup by document id.
    pub fn get_document(&self, id: &str) -> StoreResult<Option<Document>> {
        let searcher = self.reader.searcher();

        let term = Term::from_field_text(self.schema.id, id);
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;

        let Some((_score, address)) = top_docs.first() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher.doc(*address)?;
        Ok(Some(self.read_record(&doc)?.document))
    }

    /// Remove every document in one commit.
    pub fn delete_all(&self) -> StoreResult<()> {
        {
            let mut writer_guard = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
            let writer = self.ensure_writer(&mut writer_guard)?;
            writer.delete_all_documents()?;
            writer.commit()?;
        }
        self.reader.reload()?;
        tracing::info!("Cleared all indexed documents");
        Ok(())
    }

    /// Number of indexed documents.
    pub fn count(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    fn scan_all(&self) -> StoreResult<Vec<StoredRecord>> {
        self.scan_capped(SCAN_LIMIT)
    }

    fn scan_capped(&self, cap: usize) -> StoreResult<Vec<StoredRecord>> {
        let searcher = self.reader.searcher();
        let total = searcher.num_docs() as usize;
        if total > cap {
            tracing::warn!(
                "Scanning {cap} of {total} indexed documents; results may be incomplete"
            );
        }
        let top_docs = searcher.search(&AllQuery, &TopDocs::with_limit(cap))?;

        let mut records = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            records.push(self.read_record(&doc)?);
        }
        Ok(records)
    }

    fn read_record(&self, doc: &TantivyDocument) -> StoreResult<StoredRecord> {
        let text = |field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let source = doc
            .get_first(self.schema.source)
            .and_then(|v| v.as_str())
            .and_then(DocumentSource::parse)
            .unwrap_or(DocumentSource::Scraper);

        let metadata: BTreeMap<String, String> = doc
            .get_first(self.schema.metadata)
            .and_then(|v| v.as_str())
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let embedding = doc
            .get_first(self.schema.embedding)
            .and_then(|v| v.as_bytes())
            .map(bytes_to_vector)
            .unwrap_or_default();

        let document = Document {
            id: text(self.schema.id),
            content: text(self.schema.content),
            title: text(self.schema.title),
            url: text(self.schema.url),
            source,
            metadata,
        };

        Ok(StoredRecord {
            document,
            embedding,
        })
    }

    fn ensure_writer<'a>(
        &self,
        writer_guard: &'a mut Option<IndexWriter<TantivyDocument>>,
    ) -> StoreResult<&'a mut IndexWriter<TantivyDocument>> {
        if writer_guard.is_none() {
            *writer_guard = Some(self.index.writer(self.heap_size)?);
        }
        writer_guard
            .as_mut()
            .ok_or_else(|| StoreError::Index("writer initialization failed".to_string()))
    }
}

/// Weighted keyword score; zero means no match at all.
///
/// Phrase hits dominate (title over content), individual term overlap
/// breaks ties between documents with the same phrase hits.
fn keyword_score(query: &str, content: &str, title: &str) -> f32 {
    let query_lower = query.to_lowercase();
    let content_lower = content.to_lowercase();
    let title_lower = title.to_lowercase();

    let mut score = 0.0;
    if content_lower.contains(&query_lower) {
        score += 3.0;
    }
    if title_lower.contains(&query_lower) {
        score += 5.0;
    }

    let terms: HashSet<&str> = query_lower.split_whitespace().collect();
    let content_terms: HashSet<&str> = content_lower.split_whitespace().collect();
    let title_terms: HashSet<&str> = title_lower.split_whitespace().collect();

    score += 0.5 * terms.intersection(&content_terms).count() as f32;
    score += 2.0 * terms.intersection(&title_terms).count() as f32;

    score
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingBackend, EmbeddingError};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    fn keyword_store(dir: &Path) -> IndexStore {
        let config = IndexConfig {
            path: dir.to_path_buf(),
            use_embeddings: false,
        };
        IndexStore::open(&config, None, 4).unwrap()
    }

    fn doc(id: &str, title: &str, content: &str) -> Document {
        let mut d = Document::new(
            content,
            title,
            format!("https://example.test/{id}"),
            DocumentSource::Scraper,
        );
        d.id = id.to_string();
        d
    }

    #[tokio::test]
    async fn add_and_count() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        let added = store
            .add_documents(&[doc("a", "One", "first"), doc("b", "Two", "second")])
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(store.count(), 2);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        store
            .add_documents(&[doc("a", "Old title", "old content")])
            .await
            .unwrap();
        store
            .add_documents(&[doc("a", "New title", "new content")])
            .await
            .unwrap();

        assert_eq!(store.count(), 1);
        let stored = store.get_document("a").unwrap().unwrap();
        assert_eq!(stored.title, "New title");
        assert_eq!(stored.content, "new content");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());
        let err = store.search("   ", 5, None).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyQuery));
    }

    #[tokio::test]
    async fn keyword_search_prefers_title_matches() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        store
            .add_documents(&[
                doc("body", "Annual report", "our privacy policy explains everything"),
                doc("title", "Privacy policy", "the document text"),
                doc("none", "Unrelated", "nothing relevant here"),
            ])
            .await
            .unwrap();

        let results = store.search("privacy policy", 10, None).await.unwrap();
        assert_eq!(results.len(), 2, "zero-score documents are excluded");
        assert_eq!(results[0].id, "title");
        assert_eq!(results[1].id, "body");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn limit_is_clamped() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        let docs: Vec<Document> = (0..30)
            .map(|i| doc(&format!("d{i}"), "match", "match"))
            .collect();
        store.add_documents(&docs).await.unwrap();

        let results = store.search("match", 500, None).await.unwrap();
        assert_eq!(results.len(), MAX_SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn delete_all_empties_the_store() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        store
            .add_documents(&[doc("a", "One", "first"), doc("b", "Two", "second")])
            .await
            .unwrap();
        store.delete_all().unwrap();

        assert_eq!(store.count(), 0);
        assert!(store.get_document("a").unwrap().is_none());
    }

    #[tokio::test]
    async fn reopen_preserves_documents() {
        let dir = TempDir::new().unwrap();
        {
            let store = keyword_store(dir.path());
            store
                .add_documents(&[doc("persist", "Kept", "survives reopen")])
                .await
                .unwrap();
        }
        let store = keyword_store(dir.path());
        assert_eq!(store.count(), 1);
        let stored = store.get_document("persist").unwrap().unwrap();
        assert_eq!(stored.title, "Kept");
    }

    #[tokio::test]
    async fn reopening_with_a_different_dimension_is_rejected() {
        let dir = TempDir::new().unwrap();
        {
            keyword_store(dir.path());
        }

        let config = IndexConfig {
            path: dir.path().to_path_buf(),
            use_embeddings: false,
        };
        let err = IndexStore::open(&config, None, 8).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                stored: 4,
                configured: 8
            }
        ));
    }

    #[tokio::test]
    async fn a_capped_scan_returns_at_most_the_cap() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        let docs: Vec<Document> = (0..3)
            .map(|i| doc(&format!("d{i}"), "match", "match"))
            .collect();
        store.add_documents(&docs).await.unwrap();

        let records = store.scan_capped(2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(store.count(), 3);
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = keyword_store(dir.path());

        let mut metadata = BTreeMap::new();
        metadata.insert("jurisdiction".to_string(), "EU".to_string());
        let d = doc("meta", "Titled", "content").with_metadata(metadata);
        store.add_documents(&[d]).await.unwrap();

        let stored = store.get_document("meta").unwrap().unwrap();
        assert_eq!(stored.metadata.get("jurisdiction").unwrap(), "EU");
    }

    #[test]
    fn keyword_score_weights() {
        // phrase in both: 3 + 5, plus term overlap 2*0.5 + 2*2
        let score = keyword_score("privacy policy", "our privacy policy", "privacy policy");
        assert!((score - 13.0).abs() < 1e-6);

        assert_eq!(keyword_score("privacy", "nothing here", "other"), 0.0);

        // single term in content only
        let score = keyword_score("privacy", "privacy matters", "other");
        assert!((score - 3.5).abs() < 1e-6);
    }

    #[test]
    fn vector_bytes_round_trip() {
        let v = vec![0.5_f32, -1.25, 3.0];
        assert_eq!(bytes_to_vector(&vector_to_bytes(&v)), v);
    }

    struct AxisBackend;

    #[async_trait]
    impl EmbeddingBackend for AxisBackend {
        fn name(&self) -> &'static str {
            "axis"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn encode(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("privacy") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn semantic_search_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let config = IndexConfig {
            path: dir.path().to_path_buf(),
            use_embeddings: true,
        };
        let service = EmbeddingService::with_backend(Box::new(AxisBackend));
        let store = IndexStore::open(&config, Some(service), 384).unwrap();
        assert_eq!(store.count(), 0);

        store
            .add_documents(&[
                doc("near", "About privacy", "privacy rules"),
                doc("far", "Cooking", "pasta recipes"),
            ])
            .await
            .unwrap();

        let results = store
            .search("privacy question", 10, Some(SearchMode::Semantic))
            .await
            .unwrap();
        assert_eq!(results[0].id, "near");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[1].score.abs() < 1e-6);
    }
}
