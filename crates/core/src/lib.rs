pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod stores;
pub mod tools;
pub mod traits;
pub mod watch;

pub use chunking::{normalize_whitespace, split_text, ChunkingConfig};
pub use embeddings::{Embedder, HashedNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, StoreError};
pub use extractor::{extract_document_text, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{
    chunk_records, digest_file, discover_pdf_files, ingest_folder, ingest_pdf, FailedPdf,
    IngestOutcome, IngestedPdf, IngestionReport,
};
pub use models::{ChunkMetadata, ChunkRecord, IngestionOptions, SearchMatch, SourceStats};
pub use stores::{ChromaStore, MemoryStore};
pub use tools::{ToolHandlers, DEFAULT_SEARCH_RESULTS};
pub use traits::DocumentStore;
pub use watch::{PdfWatcher, WatchEvent};
