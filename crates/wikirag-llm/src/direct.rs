use schemars::JsonSchema;
use serde::Deserialize;

use crate::prompts::{DIRECT_FALLBACK, DIRECT_SYSTEM_PROMPT};
use crate::structured::{StructuredCall, StructuredClient, StructuredOutput};

const MIN_ANSWER_CHARS: usize = 5;
const MAX_UNSURE_CHARS: usize = 150;

/// Answer given from the model's own knowledge.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct DirectAnswer {
    /// Concise answer in Polish.
    pub answer: String,
    /// Whether the model actually knows the answer.
    pub knows_answer: bool,
    /// Self-assessed confidence between 0.0 and 1.0.
    pub confidence: f32,
}

impl DirectAnswer {
    pub fn fallback() -> Self {
        Self { answer: DIRECT_FALLBACK.to_string(), knows_answer: false, confidence: 0.0 }
    }

    fn is_unsure(&self) -> bool {
        !self.knows_answer || self.confidence < 0.5
    }
}

impl StructuredOutput for DirectAnswer {
    fn validate(&self) -> Result<(), String> {
        if self.answer.trim().chars().count() < MIN_ANSWER_CHARS {
            return Err(format!("answer must have at least {MIN_ANSWER_CHARS} characters"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence must be within [0, 1], got {}", self.confidence));
        }
        if !self.knows_answer && self.confidence > 0.5 {
            return Err("knows_answer is false but confidence is above 0.5".into());
        }
        if self.knows_answer && self.confidence < 0.5 {
            return Err("knows_answer is true but confidence is below 0.5; set knows_answer to false".into());
        }
        if self.is_unsure() && self.answer.chars().count() > MAX_UNSURE_CHARS {
            return Err(format!(
                "an unsure answer must be a short disclaimer of at most {MAX_UNSURE_CHARS} characters"
            ));
        }
        Ok(())
    }
}

impl StructuredClient {
    pub async fn answer_directly(&self, question: &str, model: &str) -> DirectAnswer {
        let call = StructuredCall {
            site: "direct",
            system_prompt: DIRECT_SYSTEM_PROMPT,
            user_text: question,
            model,
            temperature: None,
        };
        self.complete_or_else(&call, DirectAnswer::fallback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str, knows_answer: bool, confidence: f32) -> DirectAnswer {
        DirectAnswer { answer: text.to_string(), knows_answer, confidence }
    }

    #[test]
    fn confident_answers_pass() {
        assert!(answer("2 + 2 = 4", true, 0.95).validate().is_ok());
        assert!(answer("Nie wiem, niestety.", false, 0.1).validate().is_ok());
    }

    #[test]
    fn too_short_answers_fail() {
        assert!(answer(" ok ", true, 0.9).validate().is_err());
    }

    #[test]
    fn knowledge_flag_and_confidence_must_agree() {
        assert!(answer("Chyba tak to było.", false, 0.8).validate().is_err());
        assert!(answer("Chyba tak to było.", true, 0.3).validate().is_err());
        assert!(answer("Chyba tak to było.", true, 1.2).validate().is_err());
    }

    #[test]
    fn unsure_answers_must_be_short() {
        let long = "x".repeat(151);
        assert!(answer(&long, false, 0.0).validate().is_err());
        assert!(answer(&"x".repeat(150), false, 0.0).validate().is_ok());
        assert!(answer(&long, true, 0.9).validate().is_ok());
    }

    #[test]
    fn fallback_is_itself_valid() {
        let fallback = DirectAnswer::fallback();
        assert!(fallback.validate().is_ok());
        assert!(!fallback.knows_answer);
        assert_eq!(fallback.confidence, 0.0);
    }
}
