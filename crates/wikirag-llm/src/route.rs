use schemars::JsonSchema;
use serde::Deserialize;

use wikirag_core::types::{RouteDecision, RouteKind};

use crate::prompts::ROUTE_SYSTEM_PROMPT;
use crate::structured::{StructuredCall, StructuredClient, StructuredOutput};

/// Classifier reply as the model writes it.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RouteReply {
    /// DIRECT, CLARIFY or RAG_SEARCH.
    pub user_route: RouteKind,
    /// Follow-up question for the user; required for CLARIFY, null otherwise.
    #[serde(default)]
    pub clarify_message: Option<String>,
}

impl StructuredOutput for RouteReply {
    fn validate(&self) -> Result<(), String> {
        RouteDecision::from_parts(self.user_route, self.clarify_message.clone())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

impl StructuredClient {
    /// Route a question. Never fails: unusable replies become the generic
    /// clarification.
    pub async fn classify_route(&self, question: &str, model: &str) -> RouteDecision {
        let call = StructuredCall {
            site: "route",
            system_prompt: ROUTE_SYSTEM_PROMPT,
            user_text: question,
            model,
            temperature: None,
        };
        match self.complete::<RouteReply>(&call).await {
            Ok(reply) => RouteDecision::from_parts(reply.user_route, reply.clarify_message)
                .unwrap_or_else(|_| RouteDecision::clarify_fallback()),
            Err(e) => {
                self.log_fallback(call.site, &e);
                RouteDecision::clarify_fallback()
            }
        }
    }
}
