//! Chat-completion client for OpenAI-compatible servers (Ollama, vLLM, llama.cpp).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use wikirag_core::config::LlmSettings;
use wikirag_core::error::{Error, Result};
use wikirag_core::traits::ChatCompleter;
use wikirag_core::types::ChatRequest;

const SERVICE: &str = "llm";

pub struct OpenAiCompatClient {
    client: reqwest::Client,
    completions_url: reqwest::Url,
    models_url: reqwest::Url,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the JSON body for `POST /chat/completions`.
pub fn build_completions_request(request: &ChatRequest) -> Value {
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": request.messages,
        "stream": false,
    });
    if let Some(obj) = body.as_object_mut() {
        if let Some(temp) = request.temperature {
            obj.insert("temperature".into(), serde_json::json!(temp));
        }
        if request.json_mode {
            obj.insert("response_format".into(), serde_json::json!({"type": "json_object"}));
        }
    }
    body
}

fn endpoint(base: &str, path: &str) -> Result<reqwest::Url> {
    let url = format!("{}/{path}", base.trim_end_matches('/'));
    reqwest::Url::parse(&url).map_err(|e| Error::InvalidConfig(format!("llm.base_url '{base}': {e}")))
}

impl OpenAiCompatClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::InvalidConfig(format!("llm client: {e}")))?;
        Ok(Self {
            client,
            completions_url: endpoint(&settings.base_url, "chat/completions")?,
            models_url: endpoint(&settings.base_url, "models")?,
            api_key: Some(settings.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ChatCompleter for OpenAiCompatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .authorized(self.client.post(self.completions_url.clone()))
            .json(&build_completions_request(request))
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(SERVICE, format!("HTTP {}: {body}", status.as_u16())));
        }
        let parsed: CompletionResponse = response.json().await.map_err(|e| Error::unavailable(SERVICE, e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::unavailable(SERVICE, "response carried no message content"))
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .authorized(self.client.get(self.models_url.clone()))
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::unavailable(SERVICE, format!("model listing returned HTTP {}", response.status().as_u16())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikirag_core::types::ChatMessage;

    #[test]
    fn request_body_carries_json_mode_and_temperature() {
        let request = ChatRequest {
            model: "llama3.2".into(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: Some(0.2),
            json_mode: true,
        };
        let body = build_completions_request(&request);
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!((body["temperature"].as_f64().unwrap_or_default() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn default_temperature_is_omitted() {
        let request = ChatRequest { model: "m".into(), messages: vec![], temperature: None, json_mode: false };
        let body = build_completions_request(&request);
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn endpoints_keep_the_version_segment() {
        let url = endpoint("http://localhost:11434/v1/", "chat/completions").expect("url");
        assert_eq!(url.as_str(), "http://localhost:11434/v1/chat/completions");
        assert!(endpoint("not a url", "models").is_err());
    }
}
