use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use wikirag_chat::{ChatOrchestrator, RetrievalContext};
use wikirag_core::config::Settings;
use wikirag_core::error::{Error, Result};
use wikirag_core::testing::{chunk, InMemoryStore, ScriptedCompleter, StaticEmbedder, TableReranker};
use wikirag_core::traits::ChatCompleter;
use wikirag_core::types::{ChatRequest, RouteKind};
use wikirag_llm::prompts::{
    CLARIFY_FALLBACK, DECOMPOSE_SYSTEM_PROMPT, DIRECT_SYSTEM_PROMPT, EXPAND_SYSTEM_PROMPT, FOLLOWUP_SYSTEM_PROMPT,
    NO_GROUNDING, ROUTE_SYSTEM_PROMPT, SYNTHESIZE_SYSTEM_PROMPT,
};

const MODEL: &str = "llama3.2";
const QUESTION: &str = "Kto wynalazł telefon?";
const PARAPHRASE: &str = "Twórca telefonu";
const BELL: &str = "Bell opatentował telefon w 1876 roku.";

fn orchestrator(completer: Arc<dyn ChatCompleter>, store: Arc<InMemoryStore>, reranker: TableReranker) -> ChatOrchestrator {
    let ctx = RetrievalContext::new(completer, Arc::new(StaticEmbedder::new()), store, Arc::new(reranker));
    ChatOrchestrator::new(&ctx, &Settings::default())
}

#[tokio::test]
async fn failing_classifier_clarifies_without_retrieval() {
    let completer = Arc::new(ScriptedCompleter::always("this is not JSON"));
    let store = Arc::new(InMemoryStore::new().with_hits(QUESTION, vec![chunk("S_tel", 5, BELL)]));
    let chat = orchestrator(completer.clone(), store.clone(), TableReranker::new(0.5));

    let response = chat.handle(QUESTION, MODEL).await.expect("response");
    assert_eq!(response.route, RouteKind::Clarify);
    assert_eq!(response.answer, CLARIFY_FALLBACK);
    assert!(response.suggested_prompts.is_empty());
    assert_eq!(store.search_calls(), 0);
    assert_eq!(completer.requests().len(), 3, "only the classifier's attempts");
}

#[tokio::test]
async fn clarify_route_returns_the_models_question() {
    let completer = Arc::new(ScriptedCompleter::new().on(
        ROUTE_SYSTEM_PROMPT,
        &[r#"{"user_route": "CLARIFY", "clarify_message": "O jaką postać Ci chodzi?"}"#],
    ));
    let store = Arc::new(InMemoryStore::new());
    let chat = orchestrator(completer, store.clone(), TableReranker::new(0.5));

    let response = chat.handle("kiedy on zmarł?", MODEL).await.expect("response");
    assert_eq!(response.route, RouteKind::Clarify);
    assert_eq!(response.answer, "O jaką postać Ci chodzi?");
    assert_eq!(store.search_calls(), 0);
}

#[tokio::test]
async fn direct_route_answers_without_retrieval() {
    let completer = Arc::new(
        ScriptedCompleter::new()
            .on(ROUTE_SYSTEM_PROMPT, &[r#"{"user_route": "DIRECT", "clarify_message": null}"#])
            .on(DIRECT_SYSTEM_PROMPT, &[r#"{"answer": "5 * 5 = 25", "knows_answer": true, "confidence": 1.0}"#]),
    );
    let store = Arc::new(InMemoryStore::new());
    let chat = orchestrator(completer, store.clone(), TableReranker::new(0.5));

    let response = chat.handle("Ile to jest 5*5?", MODEL).await.expect("response");
    assert_eq!(response.route, RouteKind::Direct);
    assert_eq!(response.answer, "5 * 5 = 25");
    assert!(response.suggested_prompts.is_empty());
    assert_eq!(store.search_calls(), 0);
}

#[tokio::test]
async fn rag_search_answers_from_the_best_scored_chunk() {
    let completer = Arc::new(
        ScriptedCompleter::new()
            .on(ROUTE_SYSTEM_PROMPT, &[r#"{"user_route": "RAG_SEARCH", "clarify_message": null}"#])
            .on(DECOMPOSE_SYSTEM_PROMPT, &[r#"{"normalized_queries": ["Kto wynalazł telefon?"]}"#])
            .on(EXPAND_SYSTEM_PROMPT, &[r#"{"expanded_queries": ["Twórca telefonu"]}"#])
            .on(SYNTHESIZE_SYSTEM_PROMPT, &[r#"{"is_found": true, "answer": "Telefon wynalazł Aleksander Graham Bell."}"#])
            .on(FOLLOWUP_SYSTEM_PROMPT, &[r#"{"questions": ["Kiedy Bell opatentował telefon?"]}"#]),
    );
    let store = Arc::new(
        InMemoryStore::new()
            .with_hits(QUESTION, vec![chunk("S_tel", 5, BELL)])
            .with_hits(PARAPHRASE, vec![chunk("S_tel", 5, BELL), chunk("S_radio", 2, "Radio")])
            .with_corpus(vec![chunk("S_tel", 4, "Historia telefonu."), chunk("S_tel", 6, "Spór z Meuccim.")]),
    );
    let reranker = TableReranker::new(0.05).score(QUESTION, BELL, 0.61).score(PARAPHRASE, BELL, 0.88);
    let chat = orchestrator(completer.clone(), store.clone(), reranker);

    let response = chat.handle(QUESTION, MODEL).await.expect("response");
    assert_eq!(response.route, RouteKind::RagSearch);
    assert_eq!(response.answer, "Telefon wynalazł Aleksander Graham Bell.");
    assert_eq!(response.suggested_prompts, vec!["Kiedy Bell opatentował telefon?".to_string()]);
    assert_eq!(store.search_calls(), 2);

    let synthesis: Vec<ChatRequest> = completer
        .requests()
        .into_iter()
        .filter(|r| r.system_prompt().is_some_and(|p| p.starts_with(SYNTHESIZE_SYSTEM_PROMPT)))
        .collect();
    assert_eq!(synthesis.len(), 1);
    let context = &synthesis[0].messages[1].content;
    assert!(context.contains(&format!("Historia telefonu. {BELL} Spór z Meuccim.")), "{context}");
    assert!(context.ends_with("<question>Kto wynalazł telefon?</question>"));
}

#[tokio::test]
async fn empty_retrieval_reports_missing_grounding() {
    let completer = Arc::new(
        ScriptedCompleter::new()
            .on(ROUTE_SYSTEM_PROMPT, &[r#"{"user_route": "RAG_SEARCH", "clarify_message": null}"#])
            .on(DECOMPOSE_SYSTEM_PROMPT, &[r#"{"normalized_queries": ["Kto wynalazł telefon?"]}"#])
            .on(EXPAND_SYSTEM_PROMPT, &[r#"{"expanded_queries": ["Twórca telefonu"]}"#]),
    );
    let store = Arc::new(InMemoryStore::new());
    let chat = orchestrator(completer.clone(), store, TableReranker::new(0.5));

    let response = chat.handle(QUESTION, MODEL).await.expect("response");
    assert_eq!(response.route, RouteKind::RagSearch);
    assert_eq!(response.answer, NO_GROUNDING);
    assert!(response.suggested_prompts.is_empty());
    assert_eq!(completer.calls_with_prefix(SYNTHESIZE_SYSTEM_PROMPT), 0);
    assert_eq!(completer.calls_with_prefix(FOLLOWUP_SYSTEM_PROMPT), 0);
}

struct SlowCompleter;

#[async_trait]
impl ChatCompleter for SlowCompleter {
    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(r#"{"user_route": "RAG_SEARCH"}"#.to_string())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn slow_requests_time_out() {
    let chat = orchestrator(Arc::new(SlowCompleter), Arc::new(InMemoryStore::new()), TableReranker::new(0.5))
        .with_request_timeout(Duration::from_millis(50));

    let err = chat.handle(QUESTION, MODEL).await.expect_err("timeout");
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(50)), "{err}");
}

#[tokio::test]
async fn cancellation_aborts_in_flight_requests() {
    let chat = orchestrator(Arc::new(SlowCompleter), Arc::new(InMemoryStore::new()), TableReranker::new(0.5));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = chat.handle_with_cancel(QUESTION, MODEL, &token).await.expect_err("cancelled");
    assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn responses_carry_fresh_ids() {
    let completer = Arc::new(ScriptedCompleter::always("nope"));
    let chat = orchestrator(completer, Arc::new(InMemoryStore::new()), TableReranker::new(0.5));

    let a = chat.handle("?", MODEL).await.expect("a");
    let b = chat.handle("?", MODEL).await.expect("b");
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn health_report_covers_every_service() {
    let ctx = RetrievalContext::new(
        Arc::new(ScriptedCompleter::new()),
        Arc::new(StaticEmbedder::new()),
        Arc::new(InMemoryStore::new()),
        Arc::new(TableReranker::new(0.0)),
    );
    let report = ctx.health_report().await;
    let services: Vec<&str> = report.iter().map(|h| h.service).collect();
    assert_eq!(services, vec!["llm", "store", "embedding", "rerank"]);
    ctx.verify().await.expect("all healthy");
}
