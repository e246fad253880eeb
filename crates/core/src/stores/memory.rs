//! In-process store with brute-force cosine search.
//!
//! Stands in for the external collection in tests and offline runs; same
//! add/get/query surface, no persistence.

use crate::error::StoreError;
use crate::models::{ChunkRecord, SearchMatch, SourceStats};
use crate::traits::DocumentStore;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::RwLock;

struct StoredChunk {
    record: ChunkRecord,
    embedding: Vec<f32>,
}

#[derive(Default)]
pub struct MemoryStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_chunks(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredChunk>>, StoreError> {
        self.chunks
            .read()
            .map_err(|_| StoreError::Request("store lock poisoned".to_string()))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_chunks(
        &self,
        records: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if records.len() != embeddings.len() {
            return Err(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                records.len()
            )));
        }

        let mut chunks = self
            .chunks
            .write()
            .map_err(|_| StoreError::Request("store lock poisoned".to_string()))?;

        for (record, embedding) in records.iter().zip(embeddings.iter()) {
            chunks.push(StoredChunk {
                record: record.clone(),
                embedding: embedding.clone(),
            });
        }

        Ok(())
    }

    async fn list_sources(&self) -> Result<BTreeSet<String>, StoreError> {
        let chunks = self.read_chunks()?;
        Ok(chunks
            .iter()
            .map(|stored| stored.record.metadata.source.clone())
            .collect())
    }

    async fn source_stats(&self, source: &str) -> Result<Option<SourceStats>, StoreError> {
        let chunks = self.read_chunks()?;
        let matching = chunks
            .iter()
            .filter(|stored| stored.record.metadata.source == source)
            .collect::<Vec<_>>();

        if matching.is_empty() {
            return Ok(None);
        }

        Ok(Some(SourceStats {
            chunk_count: matching.len(),
            has_embeddings: matching.iter().any(|stored| !stored.embedding.is_empty()),
        }))
    }

    async fn query_chunks(
        &self,
        query_vector: &[f32],
        n_results: usize,
        source: Option<&str>,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        let chunks = self.read_chunks()?;

        let mut scored = chunks
            .iter()
            .filter(|stored| source.map_or(true, |s| stored.record.metadata.source == s))
            .map(|stored| {
                let similarity = cosine_similarity(query_vector, &stored.embedding);
                (similarity, stored)
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(n_results)
            .map(|(similarity, stored)| SearchMatch {
                source: stored.record.metadata.source.clone(),
                text: stored.record.text.clone(),
                distance: Some(f64::from(1.0 - similarity)),
            })
            .collect())
    }
}
