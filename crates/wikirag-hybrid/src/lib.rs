//! Retrieval-context assembly.
//!
//! Turns the query set of one question into the text handed to the answer
//! model: fan-out retrieval, dedup, neighbor expansion, block merging and
//! serialization. Every stage after the fan-out is a pure function of its
//! input, so identical collaborator outputs give byte-identical context.

use std::sync::Arc;

use wikirag_core::config::RetrievalSettings;
use wikirag_core::traits::{ChunkStore, Embedder, Reranker};
use wikirag_core::types::{Chunk, ContextBlock, Query};

pub mod blocks;
pub mod context;
pub mod dedup;
pub mod fanout;
pub mod neighbors;

pub use blocks::merge_blocks;
pub use context::serialize_context;
pub use dedup::{deduplicate, top_unique};
pub use fanout::{retrieve_all, Collaborators, FanoutParams};
pub use neighbors::{fetch_neighbors, missing_neighbor_keys};

/// Output of [`ContextAssembler::assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    /// Top-N ranked chunks followed by filler neighbors.
    pub chunks: Vec<Chunk>,
    pub blocks: Vec<ContextBlock>,
    /// Serialized context, or the fixed no-context string.
    pub text: String,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

pub struct ContextAssembler {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ChunkStore>,
    reranker: Arc<dyn Reranker>,
    retrieval: RetrievalSettings,
    normalize: bool,
}

impl ContextAssembler {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        reranker: Arc<dyn Reranker>,
        retrieval: RetrievalSettings,
        normalize: bool,
    ) -> Self {
        Self { embedder, store, reranker, retrieval, normalize }
    }

    #[tracing::instrument(skip_all, fields(queries = queries.len()))]
    pub async fn assemble(&self, queries: &[Query], question: &str) -> AssembledContext {
        let with = Collaborators {
            embedder: self.embedder.as_ref(),
            store: self.store.as_ref(),
            reranker: self.reranker.as_ref(),
        };
        let params = FanoutParams::from_settings(&self.retrieval, self.normalize);
        let hits = retrieve_all(with, queries, params).await;

        let mut chunks = top_unique(hits, self.retrieval.top_n);
        if self.retrieval.neighbor_expansion && !chunks.is_empty() {
            let neighbors = fetch_neighbors(self.store.as_ref(), &chunks).await;
            chunks.extend(neighbors);
        }

        let blocks = merge_blocks(chunks.clone());
        let text = serialize_context(&blocks, question);
        tracing::info!(chunks = chunks.len(), blocks = blocks.len(), "context assembled");
        AssembledContext { chunks, blocks, text }
    }
}
