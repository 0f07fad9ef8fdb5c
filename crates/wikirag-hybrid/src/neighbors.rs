//! Adjacent-chunk expansion for reading continuity.

use std::collections::HashSet;

use wikirag_core::traits::ChunkStore;
use wikirag_core::types::{Chunk, ChunkKey, KeysBySource, RANK_SENTINEL};

/// Keys `(s, c-1)` and `(s, c+1)` of every chunk, minus those already present.
pub fn missing_neighbor_keys(chunks: &[Chunk]) -> KeysBySource {
    let present: HashSet<(&str, u32)> = chunks.iter().map(|c| (c.source_id.as_str(), c.chunk_id)).collect();
    let mut missing = KeysBySource::new();
    for chunk in chunks {
        let prev = chunk.chunk_id.checked_sub(1);
        let next = chunk.chunk_id.checked_add(1);
        for id in [prev, next].into_iter().flatten() {
            if !present.contains(&(chunk.source_id.as_str(), id)) {
                missing.entry(chunk.source_id.clone()).or_default().insert(id);
            }
        }
    }
    missing
}

/// Result cap for the neighbor lookup: one more than the number of sources.
///
/// Under-fetches when one source needs several neighbors; kept as is.
pub fn neighbor_fetch_limit(keys: &KeysBySource) -> usize {
    keys.len() + 1
}

/// Fetch the missing neighbors of `chunks` and mark them as filler.
///
/// Lookup failures degrade to no neighbors. Rows the store returns outside the
/// requested keys, or already present, are discarded.
pub async fn fetch_neighbors(store: &dyn ChunkStore, chunks: &[Chunk]) -> Vec<Chunk> {
    let keys = missing_neighbor_keys(chunks);
    if keys.is_empty() {
        return vec![];
    }
    let limit = neighbor_fetch_limit(&keys);
    let fetched = match store.fetch_by_keys(&keys, limit).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!(sources = keys.len(), error = %e, "neighbor fetch failed; continuing without");
            return vec![];
        }
    };

    let mut seen: HashSet<ChunkKey> = chunks.iter().map(Chunk::key).collect();
    let mut neighbors = Vec::with_capacity(fetched.len());
    for mut chunk in fetched {
        let requested = keys.get(&chunk.source_id).is_some_and(|ids| ids.contains(&chunk.chunk_id));
        if !requested || !seen.insert(chunk.key()) {
            continue;
        }
        chunk.search_score = 0.0;
        chunk.rank_score = RANK_SENTINEL;
        neighbors.push(chunk);
    }
    tracing::debug!(sources = keys.len(), limit, fetched = neighbors.len(), "neighbors fetched");
    neighbors
}
