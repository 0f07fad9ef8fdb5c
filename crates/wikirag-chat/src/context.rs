use std::sync::Arc;

use wikirag_core::config::Settings;
use wikirag_core::error::Result;
use wikirag_core::traits::{ChatCompleter, ChunkStore, Embedder, Reranker};
use wikirag_embed::{get_default_embedder, HttpReranker};
use wikirag_llm::OpenAiCompatClient;
use wikirag_store::WeaviateStore;

/// Handles to every external service a request needs.
///
/// Built once at startup and shared by reference; all handles are stateless.
#[derive(Clone)]
pub struct RetrievalContext {
    pub completer: Arc<dyn ChatCompleter>,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn ChunkStore>,
    pub reranker: Arc<dyn Reranker>,
}

/// Outcome of one collaborator probe.
#[derive(Debug)]
pub struct ServiceHealth {
    pub service: &'static str,
    pub status: Result<()>,
}

impl RetrievalContext {
    pub fn new(
        completer: Arc<dyn ChatCompleter>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self { completer, embedder, store, reranker }
    }

    /// HTTP clients for every collaborator described by `settings`.
    pub fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self {
            completer: Arc::new(OpenAiCompatClient::new(&settings.llm)?),
            embedder: Arc::from(get_default_embedder(&settings.embedding)?),
            store: Arc::new(WeaviateStore::new(&settings.store)?),
            reranker: Arc::new(HttpReranker::new(&settings.rerank)?),
        })
    }

    /// Probe all collaborators concurrently.
    pub async fn health_report(&self) -> Vec<ServiceHealth> {
        let (llm, store, embedding, rerank) = futures::join!(
            self.completer.health(),
            self.store.health(),
            self.embedder.health(),
            self.reranker.health(),
        );
        vec![
            ServiceHealth { service: "llm", status: llm },
            ServiceHealth { service: "store", status: store },
            ServiceHealth { service: "embedding", status: embedding },
            ServiceHealth { service: "rerank", status: rerank },
        ]
    }

    /// First failing probe, if any.
    pub async fn verify(&self) -> Result<()> {
        for check in self.health_report().await {
            if let Err(e) = check.status {
                tracing::error!(service = check.service, error = %e, "health check failed");
                return Err(e);
            }
        }
        Ok(())
    }
}
