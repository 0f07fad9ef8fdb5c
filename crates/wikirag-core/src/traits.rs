//! Seams to the external services the pipeline consumes.
//!
//! Every implementation is a stateless handle and must be safe to share
//! across the concurrent fan-out futures of a single request.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, Chunk, KeysBySource};

/// Chat-completion backend. Returns the raw assistant text of one reply.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
    async fn health(&self) -> Result<()>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>>;
    async fn health(&self) -> Result<()>;
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Lexical + vector search, best first. `blend_weight` of 1.0 is pure vector.
    async fn hybrid_search(
        &self,
        query_text: &str,
        query_vector: &[f32],
        limit: usize,
        blend_weight: f32,
    ) -> Result<Vec<Chunk>>;

    /// Exact-match lookup of the given keys, at most `limit` chunks.
    async fn fetch_by_keys(&self, keys: &KeysBySource, limit: usize) -> Result<Vec<Chunk>>;

    async fn health(&self) -> Result<()>;
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// One relevance score per text, in input order. Higher is better.
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
    async fn health(&self) -> Result<()>;
}
