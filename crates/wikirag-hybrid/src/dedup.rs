use std::collections::hash_map::Entry;
use std::collections::HashMap;

use wikirag_core::types::{Chunk, ChunkKey};

/// Collapse duplicate `(source_id, chunk_id)` hits, best `rank_score` first.
///
/// A later duplicate replaces the kept one only with a strictly greater
/// score, so ties keep the first-seen chunk. The sort is stable, so equal
/// scores across keys also stay in first-seen order.
pub fn deduplicate(chunks: impl IntoIterator<Item = Chunk>) -> Vec<Chunk> {
    let mut index: HashMap<ChunkKey, usize> = HashMap::new();
    let mut kept: Vec<Chunk> = Vec::new();
    for chunk in chunks {
        match index.entry(chunk.key()) {
            Entry::Occupied(slot) => {
                let existing = &mut kept[*slot.get()];
                if chunk.rank_score > existing.rank_score {
                    *existing = chunk;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(chunk);
            }
        }
    }
    kept.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));
    kept
}

/// [`deduplicate`] then keep the `top_n` most relevant.
pub fn top_unique(chunks: impl IntoIterator<Item = Chunk>, top_n: usize) -> Vec<Chunk> {
    let mut unique = deduplicate(chunks);
    unique.truncate(top_n);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wikirag_core::testing::ranked;

    fn keys_and_scores(chunks: &[Chunk]) -> Vec<(String, u32, f32)> {
        chunks.iter().map(|c| (c.source_id.clone(), c.chunk_id, c.rank_score)).collect()
    }

    #[test]
    fn keeps_best_instance_sorted_by_score() {
        let out = deduplicate(vec![ranked("S1", 0, 0.2), ranked("S1", 0, 0.9), ranked("S2", 1, 0.5)]);
        assert_eq!(keys_and_scores(&out), vec![("S1".into(), 0, 0.9), ("S2".into(), 1, 0.5)]);
    }

    #[test]
    fn ties_keep_the_first_seen_instance() {
        let mut first = ranked("S1", 4, 0.7);
        first.text = "first".into();
        let mut second = ranked("S1", 4, 0.7);
        second.text = "second".into();

        let out = deduplicate(vec![first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "first");
    }

    #[test]
    fn equal_scores_across_keys_keep_arrival_order() {
        let out = deduplicate(vec![ranked("B", 1, 0.5), ranked("A", 1, 0.5), ranked("C", 1, 0.9)]);
        let ids: Vec<&str> = out.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
    }

    #[test]
    fn top_unique_truncates_after_dedup() {
        let hits = (0..10).map(|i| ranked("S", i % 4, i as f32 / 10.0));
        let out = top_unique(hits, 3);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].chunk_id, 1);
        assert!((out[0].rank_score - 0.9).abs() < 1e-6);
    }
}
