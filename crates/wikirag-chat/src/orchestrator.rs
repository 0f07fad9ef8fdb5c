use std::time::Duration;
use tokio_util::sync::CancellationToken;

use wikirag_core::config::Settings;
use wikirag_core::error::{Error, Result};
use wikirag_core::types::{ChatResponse, Query, RouteDecision, RouteKind};
use wikirag_hybrid::ContextAssembler;
use wikirag_llm::StructuredClient;

use crate::context::RetrievalContext;

/// Per-request state machine: route, then answer directly, ask for
/// clarification, or retrieve and answer from context.
pub struct ChatOrchestrator {
    llm: StructuredClient,
    assembler: ContextAssembler,
    request_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(ctx: &RetrievalContext, settings: &Settings) -> Self {
        Self {
            llm: StructuredClient::new(ctx.completer.clone(), settings.llm.max_retries),
            assembler: ContextAssembler::new(
                ctx.embedder.clone(),
                ctx.store.clone(),
                ctx.reranker.clone(),
                settings.retrieval.clone(),
                settings.embedding.normalize,
            ),
            request_timeout: settings.chat.request_timeout(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Answer one question, bounded by the request timeout.
    pub async fn handle(&self, question: &str, model: &str) -> Result<ChatResponse> {
        self.handle_with_cancel(question, model, &CancellationToken::new()).await
    }

    /// [`handle`](Self::handle) that also stops when `cancel` fires.
    ///
    /// Timeout or cancellation drops every in-flight stage, fan-out included;
    /// no partial answer is returned.
    pub async fn handle_with_cancel(
        &self,
        question: &str,
        model: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatResponse> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!("request cancelled");
                Err(Error::Cancelled)
            }
            outcome = tokio::time::timeout(self.request_timeout, self.respond(question, model)) => {
                outcome.map_err(|_| {
                    tracing::warn!(timeout = ?self.request_timeout, "request timed out");
                    Error::Timeout(self.request_timeout)
                })
            }
        }
    }

    #[tracing::instrument(skip(self), fields(route = tracing::field::Empty))]
    async fn respond(&self, question: &str, model: &str) -> ChatResponse {
        let decision = self.llm.classify_route(question, model).await;
        tracing::Span::current().record("route", tracing::field::display(decision.kind()));
        tracing::info!(route = %decision.kind(), "routed");

        match decision {
            RouteDecision::Clarify { message } => ChatResponse::new(message.into_inner(), vec![], RouteKind::Clarify),
            RouteDecision::Direct => {
                let direct = self.llm.answer_directly(question, model).await;
                tracing::debug!(knows_answer = direct.knows_answer, confidence = direct.confidence, "direct answer");
                ChatResponse::new(direct.answer, vec![], RouteKind::Direct)
            }
            RouteDecision::RagSearch => self.rag_search(question, model).await,
        }
    }

    async fn rag_search(&self, question: &str, model: &str) -> ChatResponse {
        let normalized = self.llm.decompose_query(question, model).await;
        let mut queries: Vec<Query> = normalized.clone();
        for query in &normalized {
            queries.extend(self.llm.expand_query(&query.text, model).await);
        }
        tracing::info!(normalized = normalized.len(), total = queries.len(), "queries prepared");

        let context = self.assembler.assemble(&queries, question).await;
        let answer = self.llm.synthesize_answer(&context.text, model).await;
        let suggestions = self.llm.suggest_followups(&context.text, model).await;
        tracing::info!(is_found = answer.is_found, suggestions = suggestions.len(), "answer ready");

        ChatResponse::new(answer.answer, suggestions, RouteKind::RagSearch)
    }
}
