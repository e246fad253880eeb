//! Read-only tool handlers over the storage handle.
//!
//! Each handler is a stateless read against the store and always returns a
//! JSON payload: failures come back as `{"error": message}` instead of being
//! raised, so the protocol layer can pass every result through verbatim.

use crate::embeddings::Embedder;
use crate::error::StoreError;
use crate::traits::DocumentStore;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_SEARCH_RESULTS: usize = 5;

#[derive(Debug, Error)]
enum ToolError {
    #[error("{0}")]
    Invalid(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct ToolHandlers {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl ToolHandlers {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Search indexed chunks; optionally restricted to one ingested document.
    pub async fn search(&self, query: &str, n_results: usize, document: Option<&str>) -> Value {
        match self.search_inner(query, n_results, document).await {
            Ok(payload) => payload,
            Err(error) => json!({ "error": error.to_string() }),
        }
    }

    async fn search_inner(
        &self,
        query: &str,
        n_results: usize,
        document: Option<&str>,
    ) -> Result<Value, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::Invalid("query cannot be empty".to_string()));
        }

        if let Some(document) = document {
            let sources = self.store.list_sources().await?;
            if !sources.contains(document) {
                let known = sources.into_iter().collect::<Vec<_>>().join(", ");
                return Err(ToolError::Invalid(format!(
                    "document '{document}' not found; known documents: {known}"
                )));
            }
        }

        let query_vector = self.embedder.embed(query);
        let matches = self
            .store
            .query_chunks(&query_vector, n_results.max(1), document)
            .await?;

        Ok(json!({ "results": matches }))
    }

    /// Sorted distinct sources across all stored chunks, with their count.
    pub async fn list_documents(&self) -> Value {
        match self.store.list_sources().await {
            Ok(sources) => json!({ "count": sources.len(), "documents": sources }),
            Err(error) => json!({ "error": error.to_string() }),
        }
    }

    /// Chunk count and embedding presence for one ingested document.
    pub async fn get_document_info(&self, document: &str) -> Value {
        match self.store.source_stats(document).await {
            Ok(Some(stats)) => json!({
                "document": document,
                "chunk_count": stats.chunk_count,
                "has_embeddings": stats.has_embeddings,
            }),
            Ok(None) => json!({
                "error": format!("no chunks found for document '{document}'")
            }),
            Err(error) => json!({ "error": error.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashedNgramEmbedder;
    use crate::models::{ChunkMetadata, ChunkRecord};
    use crate::stores::MemoryStore;

    async fn seeded_handlers() -> ToolHandlers {
        let store = MemoryStore::new();
        let embedder = HashedNgramEmbedder::default();

        let records = [
            ("a1b2_0", "alpha.pdf", "hydraulic pumps require maintenance"),
            ("a1b2_1", "alpha.pdf", "pressure relief valves and settings"),
            ("c3d4_0", "beta.pdf", "annual budget review for operations"),
        ]
        .into_iter()
        .map(|(chunk_id, source, text)| ChunkRecord {
            chunk_id: chunk_id.to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
            },
        })
        .collect::<Vec<_>>();

        let embeddings = records
            .iter()
            .map(|record| embedder.embed(&record.text))
            .collect::<Vec<_>>();

        store.add_chunks(&records, &embeddings).await.unwrap();
        ToolHandlers::new(Arc::new(store), Arc::new(embedder))
    }

    #[tokio::test]
    async fn empty_query_is_an_error_payload() {
        let handlers = seeded_handlers().await;
        let payload = handlers.search("   ", 5, None).await;
        assert_eq!(payload["error"], "query cannot be empty");
    }

    #[tokio::test]
    async fn empty_query_errors_even_on_empty_store() {
        let handlers = ToolHandlers::new(
            Arc::new(MemoryStore::new()),
            Arc::new(HashedNgramEmbedder::default()),
        );
        let payload = handlers.search("", 5, None).await;
        assert_eq!(payload["error"], "query cannot be empty");
    }

    #[tokio::test]
    async fn unknown_document_filter_enumerates_sources() {
        let handlers = seeded_handlers().await;
        let payload = handlers.search("pumps", 5, Some("gamma.pdf")).await;

        let message = payload["error"].as_str().unwrap();
        assert!(message.contains("gamma.pdf"));
        assert!(message.contains("alpha.pdf"));
        assert!(message.contains("beta.pdf"));
    }

    #[tokio::test]
    async fn search_returns_source_and_text() {
        let handlers = seeded_handlers().await;
        let payload = handlers.search("hydraulic pumps", 2, None).await;

        let results = payload["results"].as_array().unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 2);
        assert!(results[0]["source"].is_string());
        assert!(results[0]["text"].is_string());
    }

    #[tokio::test]
    async fn document_filter_restricts_results() {
        let handlers = seeded_handlers().await;
        let payload = handlers.search("budget review", 5, Some("beta.pdf")).await;

        let results = payload["results"].as_array().unwrap();
        assert!(results
            .iter()
            .all(|result| result["source"] == "beta.pdf"));
    }

    #[tokio::test]
    async fn list_documents_counts_distinct_sources() {
        let handlers = seeded_handlers().await;
        let payload = handlers.list_documents().await;

        assert_eq!(payload["count"], 2);
        let documents = payload["documents"].as_array().unwrap();
        assert_eq!(documents[0], "alpha.pdf");
        assert_eq!(documents[1], "beta.pdf");
    }

    #[tokio::test]
    async fn document_info_reports_chunks_and_embeddings() {
        let handlers = seeded_handlers().await;
        let payload = handlers.get_document_info("alpha.pdf").await;

        assert_eq!(payload["document"], "alpha.pdf");
        assert_eq!(payload["chunk_count"], 2);
        assert_eq!(payload["has_embeddings"], true);
    }

    #[tokio::test]
    async fn document_info_for_unknown_source_is_an_error() {
        let handlers = seeded_handlers().await;
        let payload = handlers.get_document_info("missing.pdf").await;
        assert!(payload["error"]
            .as_str()
            .unwrap()
            .contains("missing.pdf"));
    }
}
