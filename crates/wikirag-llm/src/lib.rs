//! Generation side of the pipeline.
//!
//! [`OpenAiCompatClient`] speaks to the model server; [`StructuredClient`]
//! wraps any [`ChatCompleter`](wikirag_core::traits::ChatCompleter) with the
//! validate/re-ask loop and hosts the six structured call sites:
//! route classification, direct answers, decomposition, paraphrasing,
//! grounded synthesis and follow-up suggestions.

pub mod client;
pub mod direct;
pub mod grounded;
pub mod prompts;
pub mod rewrite;
pub mod route;
pub mod structured;

pub use client::OpenAiCompatClient;
pub use direct::DirectAnswer;
pub use grounded::GroundedAnswer;
pub use structured::{StructuredCall, StructuredClient, StructuredOutput};
