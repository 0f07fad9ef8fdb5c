//! Generation over the serialized retrieval context.

use schemars::JsonSchema;
use serde::Deserialize;

use wikirag_core::types::NO_CONTEXT;

use crate::prompts::{ANSWER_FALLBACK, FOLLOWUP_SYSTEM_PROMPT, NO_GROUNDING, SYNTHESIZE_SYSTEM_PROMPT};
use crate::structured::{StructuredCall, StructuredClient, StructuredOutput};

pub const MAX_FOLLOWUPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct GroundedAnswer {
    /// Whether the context contains the answer.
    pub is_found: bool,
    /// Answer grounded in the context, or a note that it is absent.
    #[serde(default)]
    pub answer: String,
}

impl GroundedAnswer {
    pub fn not_grounded() -> Self {
        Self { is_found: false, answer: NO_GROUNDING.to_string() }
    }

    pub fn fallback() -> Self {
        Self { is_found: false, answer: ANSWER_FALLBACK.to_string() }
    }
}

impl StructuredOutput for GroundedAnswer {
    fn validate(&self) -> Result<(), String> {
        if self.is_found && self.answer.trim().is_empty() {
            return Err("answer must not be empty when is_found is true".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Followups {
    /// One to three follow-up questions.
    pub questions: Vec<Option<String>>,
}

impl StructuredOutput for Followups {}

impl StructuredClient {
    pub async fn synthesize_answer(&self, context: &str, model: &str) -> GroundedAnswer {
        if context == NO_CONTEXT {
            return GroundedAnswer::not_grounded();
        }
        let call = StructuredCall {
            site: "synthesize",
            system_prompt: SYNTHESIZE_SYSTEM_PROMPT,
            user_text: context,
            model,
            temperature: Some(0.0),
        };
        let answer = self.complete_or_else(&call, GroundedAnswer::fallback).await;
        if !answer.is_found && answer.answer.trim().is_empty() {
            return GroundedAnswer::not_grounded();
        }
        answer
    }

    pub async fn suggest_followups(&self, context: &str, model: &str) -> Vec<String> {
        if context == NO_CONTEXT {
            return vec![];
        }
        let call = StructuredCall {
            site: "followups",
            system_prompt: FOLLOWUP_SYSTEM_PROMPT,
            user_text: context,
            model,
            temperature: Some(0.2),
        };
        let reply = self.complete_or_else(&call, || Followups { questions: vec![] }).await;
        let mut out: Vec<String> = Vec::with_capacity(MAX_FOLLOWUPS);
        for question in reply.questions.into_iter().flatten() {
            let question = question.trim();
            if question.is_empty() || out.iter().any(|q| q == question) {
                continue;
            }
            out.push(question.to_string());
            if out.len() == MAX_FOLLOWUPS {
                break;
            }
        }
        out
    }
}
