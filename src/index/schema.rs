//! Tantivy schema for indexed document chunks.

use tantivy::schema::{
    FAST, Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};

/// Schema fields for document storage.
///
/// `id` and `url` are STRING for exact-match lookups; `content` and
/// `title` are tokenized for term scoring; the embedding is an opaque
/// little-endian f32 byte payload, stored but never indexed.
#[derive(Debug)]
pub struct IndexSchema {
    /// Unique document/chunk identifier.
    pub id: Field,

    /// Full chunk content.
    pub content: Field,

    /// Document title.
    pub title: Field,

    /// Source URL.
    pub url: Field,

    /// Provenance tag ("scraper", "pdf", "swagger").
    pub source: Field,

    /// Provenance metadata as a JSON object string.
    pub metadata: Field,

    /// Embedding vector as little-endian f32 bytes.
    pub embedding: Field,

    /// Timestamp when indexed (UTC seconds).
    pub indexed_at: Field,
}

impl IndexSchema {
    /// Build the schema for document storage.
    pub fn build() -> (Schema, Self) {
        let mut builder = SchemaBuilder::default();

        let id = builder.add_text_field("id", STRING | STORED);

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("default")
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();
        let content = builder.add_text_field("content", text_options.clone());
        let title = builder.add_text_field("title", text_options);

        let url = builder.add_text_field("url", STRING | STORED);
        let source = builder.add_text_field("source", STRING | STORED);
        let metadata = builder.add_text_field("metadata", STORED);

        let embedding = builder.add_bytes_field("embedding", STORED);

        let indexed_at = builder.add_u64_field("indexed_at", STORED | FAST);

        let schema = builder.build();

        let fields = Self {
            id,
            content,
            title,
            url,
            source,
            metadata,
            embedding,
            indexed_at,
        };

        (schema, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_all_fields() {
        let (schema, _fields) = IndexSchema::build();

        assert!(schema.get_field("id").is_ok());
        assert!(schema.get_field("content").is_ok());
        assert!(schema.get_field("title").is_ok());
        assert!(schema.get_field("url").is_ok());
        assert!(schema.get_field("source").is_ok());
        assert!(schema.get_field("metadata").is_ok());
        assert!(schema.get_field("embedding").is_ok());
        assert!(schema.get_field("indexed_at").is_ok());
        assert_eq!(schema.fields().count(), 8);
    }
}
