//! Concurrent embed → hybrid search → rerank over every query variant.
//!
//! Each query runs independently; a failure drops that query's hits and is
//! logged, the rest still contribute. Results are merged in query order once
//! all queries finish, so the output does not depend on completion order.

use futures::stream::{self, StreamExt};

use wikirag_core::config::RetrievalSettings;
use wikirag_core::error::{Error, Result};
use wikirag_core::traits::{ChunkStore, Embedder, Reranker};
use wikirag_core::types::{Chunk, Query};

/// Per-request knobs for [`retrieve_all`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanoutParams {
    pub search_limit: usize,
    pub blend_weight: f32,
    pub normalize: bool,
    pub max_concurrency: usize,
}

impl FanoutParams {
    pub fn from_settings(retrieval: &RetrievalSettings, normalize: bool) -> Self {
        Self {
            search_limit: retrieval.search_limit,
            blend_weight: retrieval.blend_weight,
            normalize,
            max_concurrency: retrieval.max_concurrency,
        }
    }
}

#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub embedder: &'a dyn Embedder,
    pub store: &'a dyn ChunkStore,
    pub reranker: &'a dyn Reranker,
}

/// Embed all query texts in one call. `None` entries are embedded per query.
async fn embed_batch(embedder: &dyn Embedder, queries: &[Query], normalize: bool) -> Vec<Option<Vec<f32>>> {
    let texts: Vec<String> = queries.iter().map(|q| q.text.clone()).collect();
    match embedder.embed(&texts, normalize).await {
        Ok(vectors) if vectors.len() == queries.len() => vectors.into_iter().map(Some).collect(),
        Ok(vectors) => {
            tracing::warn!(expected = queries.len(), got = vectors.len(), "batch embedding size mismatch");
            vec![None; queries.len()]
        }
        Err(e) => {
            tracing::warn!(error = %e, "batch embedding failed; embedding queries one by one");
            vec![None; queries.len()]
        }
    }
}

async fn retrieve_one(
    with: Collaborators<'_>,
    query: &Query,
    vector: Option<Vec<f32>>,
    params: FanoutParams,
) -> Result<Vec<Chunk>> {
    let vector = match vector {
        Some(v) => v,
        None => with
            .embedder
            .embed(std::slice::from_ref(&query.text), params.normalize)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::unavailable("embedding", "no vector returned"))?,
    };

    let mut hits = with
        .store
        .hybrid_search(&query.text, &vector, params.search_limit, params.blend_weight)
        .await?;
    if hits.is_empty() {
        return Ok(hits);
    }

    let texts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
    let scores = with.reranker.rerank(&query.text, &texts).await?;
    if scores.len() != hits.len() {
        return Err(Error::unavailable(
            "rerank",
            format!("returned {} scores for {} hits", scores.len(), hits.len()),
        ));
    }
    for (hit, score) in hits.iter_mut().zip(scores) {
        hit.rank_score = score;
    }
    Ok(hits)
}

/// Concatenated, reranked hits of every query, in query order.
#[tracing::instrument(skip_all, fields(queries = queries.len()))]
pub async fn retrieve_all(with: Collaborators<'_>, queries: &[Query], params: FanoutParams) -> Vec<Chunk> {
    if queries.is_empty() {
        return vec![];
    }
    let vectors = embed_batch(with.embedder, queries, params.normalize).await;

    let outcomes: Vec<(&Query, Result<Vec<Chunk>>)> = stream::iter(queries.iter().zip(vectors))
        .map(|(query, vector)| async move { (query, retrieve_one(with, query, vector, params).await) })
        .buffered(params.max_concurrency.max(1))
        .collect()
        .await;

    let mut all = Vec::new();
    let mut failed = 0usize;
    for (query, outcome) in outcomes {
        match outcome {
            Ok(hits) => {
                tracing::debug!(query = %query.text, hits = hits.len(), "query retrieved");
                all.extend(hits);
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(query = %query.text, error = %e, "query dropped from fan-out");
            }
        }
    }
    tracing::info!(hits = all.len(), failed, "fan-out finished");
    all
}
