//! Document model and chunking.
//!
//! A [`Document`] is one extracted, normalized text unit with provenance
//! (crawled page, PDF, or API-spec operation). The [`Chunker`] splits long
//! documents into overlapping windows sized for embedding.

pub mod chunker;
pub mod types;

pub use chunker::Chunker;
pub use types::{Document, DocumentSource, doc_id};
