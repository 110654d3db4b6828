// src/infra/errors.rs — Error types for reviser

use thiserror::Error;

/// Errors raised by collaborators (model, search) and the surrounding app.
#[derive(Error, Debug)]
pub enum ReviserError {
    // Provider errors (some retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Search via '{provider}' failed for query '{query}': {message}")]
    Search {
        provider: String,
        query: String,
        message: String,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    // User errors
    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReviserError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ReviserError::Provider {
                retriable: true,
                ..
            } | ReviserError::RateLimited { .. }
        )
    }
}

/// Errors that end a loop run or prevent one from being assembled.
///
/// `CapExhausted` and `Cancelled` are not errors; they are stop reasons
/// (see `core::driver::StopReason`).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid artifact: sequence index {seq} is already in the ledger")]
    InvalidArtifact { seq: u64 },

    #[error("Stage '{stage}' failed: {cause}")]
    StageFailure {
        stage: String,
        #[source]
        cause: ReviserError,
    },

    #[error("Stage '{0}' is in the sequence but was never registered")]
    UnknownStage(String),

    #[error("Stage sequence is empty")]
    EmptySequence,

    #[error("Loop-back index {index} is outside a sequence of {len} stage(s)")]
    InvalidLoopBack { index: usize, len: usize },
}

impl EngineError {
    /// Name of the failing stage, if the run failed inside one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            EngineError::StageFailure { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider_error() {
        let e = ReviserError::Provider {
            provider: "openai".into(),
            message: "HTTP 503".into(),
            retriable: true,
        };
        assert!(e.is_retriable());
    }

    #[test]
    fn test_rate_limited_is_retriable() {
        let e = ReviserError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 1000,
        };
        assert!(e.is_retriable());
    }

    #[test]
    fn test_search_error_not_retriable() {
        let e = ReviserError::Search {
            provider: "tavily".into(),
            query: "rust".into(),
            message: "unreachable".into(),
        };
        assert!(!e.is_retriable());
        assert!(e.to_string().contains("'rust'"));
    }

    #[test]
    fn test_stage_failure_display_and_source() {
        let e = EngineError::StageFailure {
            stage: "execute_tools".into(),
            cause: ReviserError::MalformedResponse("no tool call".into()),
        };
        assert_eq!(e.stage(), Some("execute_tools"));
        assert!(e.to_string().starts_with("Stage 'execute_tools' failed"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_invalid_artifact_has_no_stage() {
        let e = EngineError::InvalidArtifact { seq: 3 };
        assert!(e.stage().is_none());
        assert!(e.to_string().contains('3'));
    }
}
