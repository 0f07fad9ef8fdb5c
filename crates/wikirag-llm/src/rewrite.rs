//! Query decomposition and paraphrasing ahead of retrieval.

use schemars::JsonSchema;
use serde::Deserialize;

use wikirag_core::types::Query;

use crate::prompts::{DECOMPOSE_SYSTEM_PROMPT, EXPAND_SYSTEM_PROMPT};
use crate::structured::{StructuredCall, StructuredClient, StructuredOutput};

pub const MAX_PARAPHRASES: usize = 3;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecomposedQueries {
    /// Self-contained queries, in the order they appear in the input.
    pub normalized_queries: Vec<String>,
}

impl StructuredOutput for DecomposedQueries {
    fn validate(&self) -> Result<(), String> {
        if self.normalized_queries.iter().all(|q| q.trim().is_empty()) {
            return Err("normalized_queries must contain at least one non-empty query".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Paraphrases {
    /// One to three paraphrases of the query.
    pub expanded_queries: Vec<String>,
}

impl StructuredOutput for Paraphrases {
    fn validate(&self) -> Result<(), String> {
        if self.expanded_queries.iter().all(|q| q.trim().is_empty()) {
            return Err("expanded_queries must contain at least one paraphrase".into());
        }
        Ok(())
    }
}

fn non_blank(items: Vec<String>) -> impl Iterator<Item = String> {
    items.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl StructuredClient {
    /// Atomic queries for `question`; the question itself when decomposition fails.
    pub async fn decompose_query(&self, question: &str, model: &str) -> Vec<Query> {
        let call = StructuredCall {
            site: "decompose",
            system_prompt: DECOMPOSE_SYSTEM_PROMPT,
            user_text: question,
            model,
            temperature: Some(0.0),
        };
        match self.complete::<DecomposedQueries>(&call).await {
            Ok(reply) => non_blank(reply.normalized_queries).map(Query::normalized).collect(),
            Err(e) => {
                self.log_fallback(call.site, &e);
                vec![Query::normalized(question)]
            }
        }
    }

    /// Up to [`MAX_PARAPHRASES`] paraphrases of `query`; none when expansion fails.
    pub async fn expand_query(&self, query: &str, model: &str) -> Vec<Query> {
        let call = StructuredCall {
            site: "expand",
            system_prompt: EXPAND_SYSTEM_PROMPT,
            user_text: query,
            model,
            temperature: Some(0.0),
        };
        let reply = self.complete_or_else(&call, || Paraphrases { expanded_queries: vec![] }).await;
        non_blank(reply.expanded_queries)
            .take(MAX_PARAPHRASES)
            .map(Query::paraphrase)
            .collect()
    }
}
