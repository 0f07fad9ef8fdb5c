//! Chunk store backed by a Weaviate collection.
//!
//! Only the read side is implemented: hybrid search and exact key lookup
//! over `POST /v1/graphql`. Ingestion and schema management live elsewhere.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use wikirag_core::config::StoreSettings;
use wikirag_core::error::{Error, Result};
use wikirag_core::traits::ChunkStore;
use wikirag_core::types::{Chunk, KeysBySource};

pub mod graphql;

const SERVICE: &str = "store";

pub struct WeaviateStore {
    client: reqwest::Client,
    graphql_url: reqwest::Url,
    ready_url: reqwest::Url,
    api_key: Option<String>,
    collection: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct ChunkRow {
    source_id: String,
    chunk_id: u32,
    #[serde(default)]
    source_title: Option<String>,
    #[serde(default)]
    chunk_text: Option<String>,
    #[serde(rename = "_additional", default)]
    additional: Option<Additional>,
}

#[derive(Deserialize)]
struct Additional {
    #[serde(default)]
    score: Option<Score>,
}

/// Weaviate reports hybrid scores as strings; accept numbers too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Score {
    Number(f32),
    Text(String),
}

impl Score {
    fn value(&self) -> f32 {
        match self {
            Score::Number(n) => *n,
            Score::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

impl ChunkRow {
    fn into_chunk(self) -> Chunk {
        let search_score = self.additional.and_then(|a| a.score).map_or(0.0, |s| s.value());
        Chunk {
            source_id: self.source_id,
            chunk_id: self.chunk_id,
            source_title: self.source_title.unwrap_or_default(),
            text: self.chunk_text.unwrap_or_default(),
            search_score,
            rank_score: 0.0,
        }
    }
}

impl WeaviateStore {
    pub fn new(settings: &StoreSettings) -> Result<Self> {
        if !graphql::is_valid_collection_name(&settings.collection) {
            return Err(Error::InvalidConfig(format!(
                "store.collection '{}' is not a valid class name",
                settings.collection
            )));
        }
        let base = reqwest::Url::parse(&settings.url)
            .map_err(|e| Error::InvalidConfig(format!("store.url '{}': {e}", settings.url)))?;
        let graphql_url = base
            .join("/v1/graphql")
            .map_err(|e| Error::InvalidConfig(format!("store.url: {e}")))?;
        let ready_url = base
            .join("/v1/.well-known/ready")
            .map_err(|e| Error::InvalidConfig(format!("store.url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("store client: {e}")))?;
        let api_key = Some(settings.api_key.clone()).filter(|k| !k.is_empty());
        Ok(Self { client, graphql_url, ready_url, api_key, collection: settings.collection.clone() })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn run_query(&self, query: String) -> Result<Vec<Chunk>> {
        let body = serde_json::json!({ "query": query });
        let response = self
            .authorized(self.client.post(self.graphql_url.clone()))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(SERVICE, format!("HTTP {}: {text}", status.as_u16())));
        }
        let parsed: GraphQlResponse = response.json().await.map_err(|e| Error::unavailable(SERVICE, e))?;
        if let Some(first) = parsed.errors.first() {
            return Err(Error::unavailable(SERVICE, format!("graphql: {}", first.message)));
        }
        let rows = parsed
            .data
            .as_ref()
            .and_then(|d| d.get("Get"))
            .and_then(|g| g.get(&self.collection))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<ChunkRow>(row) {
                Ok(row) => chunks.push(row.into_chunk()),
                Err(e) => tracing::warn!(error = %e, "skipping malformed chunk row"),
            }
        }
        Ok(chunks)
    }
}

#[async_trait]
impl ChunkStore for WeaviateStore {
    async fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: &[f32],
        limit: usize,
        blend_weight: f32,
    ) -> Result<Vec<Chunk>> {
        let query = graphql::hybrid_query(&self.collection, query_text, query_vector, limit, blend_weight);
        let hits = self.run_query(query).await?;
        tracing::debug!(query = query_text, hits = hits.len(), "hybrid search");
        Ok(hits)
    }

    async fn fetch_by_keys(&self, keys: &KeysBySource, limit: usize) -> Result<Vec<Chunk>> {
        let Some(filter) = graphql::keys_filter(keys) else {
            return Ok(vec![]);
        };
        self.run_query(graphql::fetch_query(&self.collection, &filter, limit)).await
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.ready_url.clone()))
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::unavailable(SERVICE, format!("not ready: HTTP {}", response.status().as_u16())))
        }
    }
}
