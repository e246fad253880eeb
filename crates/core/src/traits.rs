use crate::error::StoreError;
use crate::models::{ChunkRecord, SearchMatch, SourceStats};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Collection-oriented handle to the external vector store.
///
/// The store owns embedding persistence, ANN indexing, and the on-disk
/// format; this trait only exposes the add/get/query surface the ingestion
/// loop and the tool handlers need.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write (id, document, metadata) triples with their embeddings.
    async fn add_chunks(
        &self,
        records: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    /// Distinct `source` metadata values across all stored chunks, sorted.
    async fn list_sources(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Chunk count and embedding presence for one source, `None` when no
    /// chunk carries it.
    async fn source_stats(&self, source: &str) -> Result<Option<SourceStats>, StoreError>;

    /// Nearest stored chunks to `query_vector`, optionally restricted by
    /// metadata equality on `source`.
    async fn query_chunks(
        &self,
        query_vector: &[f32],
        n_results: usize,
        source: Option<&str>,
    ) -> Result<Vec<SearchMatch>, StoreError>;
}
