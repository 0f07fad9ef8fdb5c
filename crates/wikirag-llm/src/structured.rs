//! Schema-constrained completions with local validation and re-ask.
//!
//! A call site declares its output type ([`StructuredOutput`]), and
//! [`StructuredClient::complete_or_else`] runs the bounded attempt loop and
//! substitutes the call site's fallback if no attempt produces a valid value.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use wikirag_core::error::{Error, Result};
use wikirag_core::traits::ChatCompleter;
use wikirag_core::types::{ChatMessage, ChatRequest};

/// Output of a structured call site.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send {
    /// Semantic checks beyond the schema. `Err` triggers another attempt.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// One structured request: system contract, user payload and sampling.
#[derive(Debug, Clone, Copy)]
pub struct StructuredCall<'a> {
    pub site: &'static str,
    pub system_prompt: &'a str,
    pub user_text: &'a str,
    pub model: &'a str,
    pub temperature: Option<f32>,
}

/// Handle for structured completions; cheap to clone.
#[derive(Clone)]
pub struct StructuredClient {
    completer: Arc<dyn ChatCompleter>,
    max_retries: u32,
}

const SCHEMA_PREAMBLE: &str =
    "Reply with exactly one JSON object, without markdown fences, that validates against this JSON schema:";

pub(crate) fn system_with_schema<T: JsonSchema>(system_prompt: &str) -> String {
    let schema = schemars::schema_for!(T);
    format!("{system_prompt}\n\n{SCHEMA_PREAMBLE}\n{}", schema.as_value())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse and validate one reply.
pub fn parse_reply<T: StructuredOutput>(reply: &str) -> Result<T> {
    let value: T = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| Error::InvalidStructuredOutput(e.to_string()))?;
    value.validate().map_err(Error::InvalidStructuredOutput)?;
    Ok(value)
}

impl StructuredClient {
    pub fn new(completer: Arc<dyn ChatCompleter>, max_retries: u32) -> Self {
        Self { completer, max_retries: max_retries.max(1) }
    }

    /// Up to `max_retries` attempts. Each invalid reply is fed back with its
    /// validation error before the next attempt. Transport errors end the
    /// loop immediately.
    pub async fn complete<T: StructuredOutput>(&self, call: &StructuredCall<'_>) -> Result<T> {
        let mut messages = vec![
            ChatMessage::system(system_with_schema::<T>(call.system_prompt)),
            ChatMessage::user(call.user_text),
        ];
        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            let request = ChatRequest {
                model: call.model.to_string(),
                messages: messages.clone(),
                temperature: call.temperature,
                json_mode: true,
            };
            let reply = self.completer.complete(&request).await?;
            match parse_reply::<T>(&reply) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(site = call.site, attempt, error = %e, "invalid structured output");
                    last_error = e.to_string();
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!(
                        "That reply was rejected: {last_error}. Send the corrected JSON object only."
                    )));
                }
            }
        }
        Err(Error::RetryExhausted { attempts: self.max_retries, last_error })
    }

    /// [`complete`](Self::complete), degrading any failure to `fallback()`.
    pub async fn complete_or_else<T, F>(&self, call: &StructuredCall<'_>, fallback: F) -> T
    where
        T: StructuredOutput,
        F: FnOnce() -> T,
    {
        match self.complete::<T>(call).await {
            Ok(value) => value,
            Err(e) => {
                self.log_fallback(call.site, &e);
                fallback()
            }
        }
    }

    pub(crate) fn log_fallback(&self, site: &'static str, error: &Error) {
        tracing::warn!(site, attempts = self.max_retries, error = %error, "using fallback");
    }
}
