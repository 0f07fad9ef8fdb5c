use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A generation collaborator returned output that failed parsing or validation.
    #[error("Invalid structured output: {0}")]
    InvalidStructuredOutput(String),

    /// Every attempt at a structured call site produced invalid output.
    #[error("Structured output still invalid after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    /// Transport or protocol failure reaching an external service.
    #[error("{service} unavailable: {reason}")]
    CollaboratorUnavailable { service: &'static str, reason: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub fn unavailable(service: &'static str, reason: impl ToString) -> Self {
        Self::CollaboratorUnavailable { service, reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_retry_exhausted() {
        let err = Error::RetryExhausted { attempts: 3, last_error: "missing field `answer`".into() };
        assert_eq!(
            err.to_string(),
            "Structured output still invalid after 3 attempts: missing field `answer`"
        );
    }

    #[test]
    fn display_unavailable() {
        let err = Error::unavailable("embedding", "connection refused");
        assert_eq!(err.to_string(), "embedding unavailable: connection refused");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
