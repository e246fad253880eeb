use crate::error::StoreError;
use crate::models::{ChunkRecord, SearchMatch, SourceStats};
use crate::traits::DocumentStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Client for the ChromaDB HTTP collection API (v1).
///
/// The collection is resolved by name once at connect time; all later calls
/// address it by its server-assigned id.
pub struct ChromaStore {
    endpoint: String,
    collection_id: String,
    collection_name: String,
    client: Client,
}

impl ChromaStore {
    /// Resolves (or creates) the named collection and returns a ready handle.
    pub async fn connect(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let collection_name = collection.into();
        let client = Client::new();

        let response = client
            .post(format!("{endpoint}/api/v1/collections"))
            .json(&json!({ "name": collection_name, "get_or_create": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("create collection returned {}", response.status()),
            });
        }

        let parsed: Value = response.json().await?;
        let collection_id = parsed
            .pointer("/id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: "chroma".to_string(),
                details: "collection response missing id".to_string(),
            })?
            .to_string();

        Ok(Self {
            endpoint,
            collection_id,
            collection_name,
            client,
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn post_collection(&self, operation: &str, body: &Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/{operation}",
                self.endpoint, self.collection_id
            ))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("{operation} returned {}", response.status()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for ChromaStore {
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

        if records.is_empty() {
            return Ok(());
        }

        let ids = records
            .iter()
            .map(|record| record.chunk_id.as_str())
            .collect::<Vec<_>>();
        let documents = records
            .iter()
            .map(|record| record.text.as_str())
            .collect::<Vec<_>>();
        let metadatas = records
            .iter()
            .map(|record| serde_json::to_value(&record.metadata))
            .collect::<Result<Vec<_>, _>>()?;

        self.post_collection(
            "add",
            &json!({
                "ids": ids,
                "documents": documents,
                "metadatas": metadatas,
                "embeddings": embeddings,
            }),
        )
        .await?;

        Ok(())
    }

    async fn list_sources(&self) -> Result<BTreeSet<String>, StoreError> {
        let parsed = self
            .post_collection("get", &json!({ "include": ["metadatas"] }))
            .await?;

        Ok(parse_sources(&parsed))
    }

    async fn source_stats(&self, source: &str) -> Result<Option<SourceStats>, StoreError> {
        let parsed = self
            .post_collection(
                "get",
                &json!({
                    "where": { "source": source },
                    "include": ["metadatas", "embeddings"],
                }),
            )
            .await?;

        Ok(parse_source_stats(&parsed))
    }

    async fn query_chunks(
        &self,
        query_vector: &[f32],
        n_results: usize,
        source: Option<&str>,
    ) -> Result<Vec<SearchMatch>, StoreError> {
        let mut body = json!({
            "query_embeddings": [query_vector],
            "n_results": n_results,
            "include": ["documents", "metadatas", "distances"],
        });

        if let Some(source) = source {
            body["where"] = json!({ "source": source });
        }

        let parsed = self.post_collection("query", &body).await?;
        Ok(parse_query_matches(&parsed))
    }
}

fn parse_sources(parsed: &Value) -> BTreeSet<String> {
    parsed
        .pointer("/metadatas")
        .and_then(Value::as_array)
        .map(|metadatas| {
            metadatas
                .iter()
                .filter_map(|metadata| {
                    metadata
                        .pointer("/source")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_source_stats(parsed: &Value) -> Option<SourceStats> {
    let chunk_count = parsed
        .pointer("/ids")
        .and_then(Value::as_array)
        .map(|ids| ids.len())
        .unwrap_or(0);

    if chunk_count == 0 {
        return None;
    }

    let has_embeddings = parsed
        .pointer("/embeddings")
        .and_then(Value::as_array)
        .map(|embeddings| embeddings.iter().any(|value| !value.is_null()))
        .unwrap_or(false);

    Some(SourceStats {
        chunk_count,
        has_embeddings,
    })
}

fn parse_query_matches(parsed: &Value) -> Vec<SearchMatch> {
    // Query responses are row-per-query; we always send exactly one query.
    let documents = parsed
        .pointer("/documents/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let metadatas = parsed
        .pointer("/metadatas/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let distances = parsed
        .pointer("/distances/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    documents
        .iter()
        .enumerate()
        .map(|(position, document)| {
            let source = metadatas
                .get(position)
                .and_then(|metadata| metadata.pointer("/source"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();

            SearchMatch {
                source,
                text: document.as_str().unwrap_or_default().to_string(),
                distance: distances.get(position).and_then(Value::as_f64),
            }
        })
        .collect()
}
