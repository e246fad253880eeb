use serde::{Deserialize, Serialize};

/// Metadata carried by every stored chunk.
///
/// `source` is the filename of the document the chunk came from; the set of
/// distinct sources in the collection is the set of ingested documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source: String,
}

/// One retrievable unit of document text, keyed by `{digest}_{index}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A single hit returned from the store for a search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub source: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Chunk count and embedding presence for one ingested document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SourceStats {
    pub chunk_count: usize,
    pub has_embeddings: bool,
}

/// Knobs for splitting and writing a document.
#[derive(Debug, Clone, Copy)]
pub struct IngestionOptions {
    pub chunk_max_tokens: usize,
    pub chunk_overlap_tokens: usize,
    pub batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_tokens: 1_000,
            chunk_overlap_tokens: 50,
            batch_size: 10,
        }
    }
}
