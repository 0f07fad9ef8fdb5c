use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wikirag_core::config::LlmSettings;
use wikirag_core::error::Error;
use wikirag_core::traits::ChatCompleter;
use wikirag_core::types::{ChatMessage, ChatRequest};
use wikirag_llm::OpenAiCompatClient;

fn settings(server: &MockServer) -> LlmSettings {
    LlmSettings { base_url: format!("{}/v1", server.uri()), timeout_secs: 5, ..LlmSettings::default() }
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "llama3.2".into(),
        messages: vec![ChatMessage::system("classify"), ChatMessage::user("Kto wynalazł telefon?")],
        temperature: Some(0.0),
        json_mode: true,
    }
}

#[tokio::test]
async fn completion_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer ollama"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "response_format": {"type": "json_object"},
            "messages": [{"role": "system", "content": "classify"}, {"role": "user", "content": "Kto wynalazł telefon?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"user_route\": \"RAG_SEARCH\"}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&settings(&server)).expect("client");
    let reply = client.complete(&request()).await.expect("reply");
    assert_eq!(reply, "{\"user_route\": \"RAG_SEARCH\"}");
}

#[tokio::test]
async fn http_errors_map_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'llama3.2' not found"))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&settings(&server)).expect("client");
    let err = client.complete(&request()).await.expect_err("404");
    assert!(matches!(err, Error::CollaboratorUnavailable { service: "llm", .. }));
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&settings(&server)).expect("client");
    assert!(client.complete(&request()).await.is_err());
}

#[tokio::test]
async fn health_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "llama3.2"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(&settings(&server)).expect("client");
    client.health().await.expect("healthy");
}
