//! Chat request handling on top of the routing, retrieval and generation crates.

pub mod context;
pub mod orchestrator;

pub use context::{RetrievalContext, ServiceHealth};
pub use orchestrator::ChatOrchestrator;
