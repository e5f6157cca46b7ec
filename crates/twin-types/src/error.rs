use thiserror::Error;

use crate::llm::CompletionError;

/// Errors from conversation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("corrupt session record '{session_id}': {reason}")]
    Corrupt { session_id: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

/// Errors surfaced by a chat exchange.
///
/// Every variant is scoped to a single request; none of them should take the
/// process down.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing sessions degrade to an empty history, so this is never raised
    /// by the orchestrator. Kept so callers can match on the full taxonomy.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("completion failure: {0}")]
    Completion(#[from] CompletionError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("validation failure: {0}")]
    Validation(String),
}

/// Errors from building runtime components out of configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable '{0}' must hold an API key for this provider")]
    MissingApiKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Corrupt {
            session_id: "abc".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "corrupt session record 'abc': expected value at line 1"
        );
    }

    #[test]
    fn test_chat_error_wraps_completion_cause() {
        let err: ChatError = CompletionError::Transport("connection refused".to_string()).into();
        assert!(matches!(err, ChatError::Completion(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_io_error_converts_to_store_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(ref msg) if msg.contains("denied")));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
