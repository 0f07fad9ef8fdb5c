//! Domain types shared by the routing, retrieval and generation crates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// `rank_score` given to chunks fetched only to keep the reading context
/// continuous. Never compared against real relevance scores.
pub const RANK_SENTINEL: f32 = -999.0;

/// Serialized context used when retrieval produced no blocks. Generation
/// call sites recognise it and skip the model.
pub const NO_CONTEXT: &str = "Brak dostępnego kontekstu.";

/// Missing neighbor keys grouped by `source_id`, chunk ids ascending.
pub type KeysBySource = BTreeMap<String, BTreeSet<u32>>;

/// Identity of a chunk within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub source_id: String,
    pub chunk_id: u32,
}

impl ChunkKey {
    pub fn new(source_id: impl Into<String>, chunk_id: u32) -> Self {
        Self { source_id: source_id.into(), chunk_id }
    }
}

/// A unit of source-document text returned by the chunk store.
///
/// - `source_id`/`chunk_id`: identity, unique within a deduplicated set
/// - `source_title`: title of the parent article
/// - `search_score`: raw hybrid-search score
/// - `rank_score`: cross-encoder relevance, or [`RANK_SENTINEL`] for filler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_id: String,
    pub chunk_id: u32,
    pub source_title: String,
    pub text: String,
    pub search_score: f32,
    pub rank_score: f32,
}

impl Chunk {
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.source_id.clone(), self.chunk_id)
    }

    /// True when the chunk was fetched for continuity rather than relevance.
    pub fn is_filler(&self) -> bool {
        self.rank_score == RANK_SENTINEL
    }
}

/// Where a retrieval query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOrigin {
    Normalized,
    Paraphrase,
}

/// An independent unit of retrieval work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub origin: QueryOrigin,
}

impl Query {
    pub fn normalized(text: impl Into<String>) -> Self {
        Self { text: text.into(), origin: QueryOrigin::Normalized }
    }

    pub fn paraphrase(text: impl Into<String>) -> Self {
        Self { text: text.into(), origin: QueryOrigin::Paraphrase }
    }
}

/// Route tag as exchanged with the classifier and returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteKind {
    Direct,
    Clarify,
    RagSearch,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RouteKind::Direct => "DIRECT",
            RouteKind::Clarify => "CLARIFY",
            RouteKind::RagSearch => "RAG_SEARCH",
        };
        f.write_str(tag)
    }
}

/// A clarification prompt that is guaranteed to contain non-whitespace text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarifyMessage(String);

impl ClarifyMessage {
    /// Generic clarification used when the classifier gives no usable reply.
    pub const FALLBACK: &'static str = "Jestem botem Wikipedii. Twoje pytanie jest dla mnie trochę niejasne. \
Czy mógłbyś je sformułować inaczej lub podać więcej szczegółów?";

    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    pub fn new(message: impl Into<String>) -> Result<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(Error::InvalidStructuredOutput(
                "clarify message must not be blank".to_string(),
            ));
        }
        Ok(Self(message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Outcome of route classification.
///
/// `Clarify` can only be built from a [`ClarifyMessage`], so a blank
/// clarification is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Direct,
    Clarify { message: ClarifyMessage },
    RagSearch,
}

impl RouteDecision {
    /// Validating factory used when decoding classifier output.
    pub fn from_parts(kind: RouteKind, clarify_message: Option<String>) -> Result<Self> {
        match kind {
            RouteKind::Direct => Ok(Self::Direct),
            RouteKind::RagSearch => Ok(Self::RagSearch),
            RouteKind::Clarify => {
                let message = clarify_message.ok_or_else(|| {
                    Error::InvalidStructuredOutput(
                        "route CLARIFY requires a clarify_message".to_string(),
                    )
                })?;
                Ok(Self::Clarify { message: ClarifyMessage::new(message)? })
            }
        }
    }

    pub fn clarify_fallback() -> Self {
        Self::Clarify { message: ClarifyMessage::fallback() }
    }

    pub fn clarify(message: impl Into<String>) -> Result<Self> {
        Ok(Self::Clarify { message: ClarifyMessage::new(message)? })
    }

    pub fn kind(&self) -> RouteKind {
        match self {
            RouteDecision::Direct => RouteKind::Direct,
            RouteDecision::Clarify { .. } => RouteKind::Clarify,
            RouteDecision::RagSearch => RouteKind::RagSearch,
        }
    }

    pub fn clarify_message(&self) -> Option<&str> {
        match self {
            RouteDecision::Clarify { message } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// A contiguous run of chunks from one article, merged for reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    pub source_id: String,
    pub source_title: String,
    pub first_chunk_id: u32,
    pub last_chunk_id: u32,
    pub text: String,
}

impl ContextBlock {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            source_id: chunk.source_id.clone(),
            source_title: chunk.source_title.clone(),
            first_chunk_id: chunk.chunk_id,
            last_chunk_id: chunk.chunk_id,
            text: chunk.text.clone(),
        }
    }

    /// Whether `chunk` directly continues this block.
    pub fn continues_with(&self, chunk: &Chunk) -> bool {
        chunk.source_id == self.source_id
            && self.last_chunk_id.checked_add(1) == Some(chunk.chunk_id)
    }
}

/// Final reply of one chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: Uuid,
    pub answer: String,
    pub suggested_prompts: Vec<String>,
    pub route: RouteKind,
}

impl ChatResponse {
    pub fn new(answer: impl Into<String>, suggested_prompts: Vec<String>, route: RouteKind) -> Self {
        Self { id: Uuid::new_v4(), answer: answer.into(), suggested_prompts, route }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// One request to a chat-completion collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    /// Ask the backend to constrain the reply to a JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    /// First system message, if any. Test doubles dispatch on it.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }
}
