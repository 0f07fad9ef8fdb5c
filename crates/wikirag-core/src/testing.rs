//! In-memory collaborators for tests across the workspace.
//!
//! Enabled for this crate's own tests and for dependents through the
//! `testing` feature.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::traits::{ChatCompleter, ChunkStore, Embedder, Reranker};
use crate::types::{ChatRequest, Chunk, KeysBySource};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Build a chunk with zeroed scores.
pub fn chunk(source_id: &str, chunk_id: u32, text: &str) -> Chunk {
    Chunk {
        source_id: source_id.to_string(),
        chunk_id,
        source_title: format!("Title {source_id}"),
        text: text.to_string(),
        search_score: 0.0,
        rank_score: 0.0,
    }
}

/// Build a chunk carrying a rank score.
pub fn ranked(source_id: &str, chunk_id: u32, rank_score: f32) -> Chunk {
    Chunk { rank_score, ..chunk(source_id, chunk_id, &format!("{source_id}#{chunk_id}")) }
}

/// Replies by system-prompt prefix, in order; records every request.
///
/// When a script runs dry its last reply is repeated. Requests matching no
/// script get `fallback_reply`.
#[derive(Default)]
pub struct ScriptedCompleter {
    scripts: Mutex<Vec<(String, VecDeque<String>, Option<String>)>>,
    fallback_reply: Option<String>,
    unavailable: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails at the transport level.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    /// Every unmatched call gets `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        Self { fallback_reply: Some(reply.into()), ..Self::default() }
    }

    pub fn on(self, system_prefix: &str, replies: &[&str]) -> Self {
        let queue: VecDeque<String> = replies.iter().map(|r| (*r).to_string()).collect();
        lock(&self.scripts).push((system_prefix.to_string(), queue, None));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn calls_with_prefix(&self, system_prefix: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| r.system_prompt().is_some_and(|p| p.starts_with(system_prefix)))
            .count()
    }
}

#[async_trait]
impl ChatCompleter for ScriptedCompleter {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        lock(&self.requests).push(request.clone());
        if self.unavailable {
            return Err(Error::unavailable("llm", "scripted outage"));
        }
        let system = request.system_prompt().unwrap_or_default();
        let mut scripts = lock(&self.scripts);
        for (prefix, queue, last) in scripts.iter_mut() {
            if system.starts_with(prefix.as_str()) {
                if let Some(reply) = queue.pop_front() {
                    *last = Some(reply.clone());
                    return Ok(reply);
                }
                if let Some(reply) = last {
                    return Ok(reply.clone());
                }
            }
        }
        self.fallback_reply
            .clone()
            .ok_or_else(|| Error::unavailable("llm", format!("no script for prompt: {:.40}", system)))
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Deterministic bag-of-bytes vectors. Texts in `failing` make the call fail.
#[derive(Default)]
pub struct StaticEmbedder {
    failing: HashSet<String>,
    fail_batches: bool,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    pub const DIM: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Fail any call embedding more than one text.
    pub fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut v = vec![0f32; Self::DIM];
        for (i, b) in text.bytes().enumerate() {
            v[i % Self::DIM] += f32::from(b) / 255.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, texts: &[String], _normalize: bool) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches && texts.len() > 1 {
            return Err(Error::unavailable("embedding", "batch rejected"));
        }
        if let Some(bad) = texts.iter().find(|t| self.failing.contains(*t)) {
            return Err(Error::unavailable("embedding", format!("cannot embed '{bad}'")));
        }
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Canned search hits per query text plus a keyed corpus for batch fetches.
#[derive(Default)]
pub struct InMemoryStore {
    hits: HashMap<String, Vec<Chunk>>,
    failing: HashSet<String>,
    corpus: Vec<Chunk>,
    fail_fetch: bool,
    search_calls: AtomicUsize,
    fetch_calls: Mutex<Vec<(KeysBySource, usize)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, query: &str, hits: Vec<Chunk>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_corpus(mut self, corpus: Vec<Chunk>) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> Vec<(KeysBySource, usize)> {
        lock(&self.fetch_calls).clone()
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn hybrid_search(
        &self,
        query_text: &str,
        _query_vector: &[f32],
        limit: usize,
        _blend_weight: f32,
    ) -> Result<Vec<Chunk>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(query_text) {
            return Err(Error::unavailable("store", format!("search failed for '{query_text}'")));
        }
        let mut hits = self.hits.get(query_text).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn fetch_by_keys(&self, keys: &KeysBySource, limit: usize) -> Result<Vec<Chunk>> {
        lock(&self.fetch_calls).push((keys.clone(), limit));
        if self.fail_fetch {
            return Err(Error::unavailable("store", "fetch failed"));
        }
        Ok(self
            .corpus
            .iter()
            .filter(|c| keys.get(&c.source_id).is_some_and(|ids| ids.contains(&c.chunk_id)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

/// Scores `(query, text)` pairs from a table; unknown pairs score `default`.
#[derive(Default)]
pub struct TableReranker {
    scores: HashMap<(String, String), f32>,
    default: f32,
    failing: HashSet<String>,
}

impl TableReranker {
    pub fn new(default: f32) -> Self {
        Self { default, ..Self::default() }
    }

    pub fn score(mut self, query: &str, text: &str, score: f32) -> Self {
        self.scores.insert((query.to_string(), text.to_string()), score);
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }
}

#[async_trait]
impl Reranker for TableReranker {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if self.failing.contains(query) {
            return Err(Error::unavailable("rerank", format!("rerank failed for '{query}'")));
        }
        Ok(texts
            .iter()
            .map(|t| *self.scores.get(&(query.to_string(), t.clone())).unwrap_or(&self.default))
            .collect())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}
