//! Error types for wa-inbox
//!
//! This module defines all error types used throughout the inbox engine,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for inbox operations
///
/// Every variant describes a failure that is local to a single request,
/// message, or conversation. None of them is fatal to the process.
#[derive(Error, Debug)]
pub enum InboxError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failures (connection refused, non-success status, stream closed)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request exceeded its time budget
    #[error("Operation timed out after {seconds}s: {operation}")]
    Timeout {
        /// The configured timeout that was exceeded
        seconds: u64,
        /// The operation that timed out
        operation: String,
    },

    /// The backend answered but rejected the request (`success: false`)
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// Malformed or unexpected payload from the backend or push channel
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An in-flight operation was cancelled before it completed
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Referenced conversation is not known to the store
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    /// Referenced session is not present in the session directory
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Referenced message is not present in the open timeline
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for inbox operations
///
/// Uses `anyhow::Error` so that callers can attach context while the
/// concrete [`InboxError`] stays recoverable via `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = InboxError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_transport_error_display() {
        let error = InboxError::Transport("connection refused".to_string());
        assert_eq!(error.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_timeout_error_display() {
        let error = InboxError::Timeout {
            seconds: 20,
            operation: "send message".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Operation timed out after 20s: send message"
        );
    }

    #[test]
    fn test_rejected_error_display() {
        let error = InboxError::Rejected("chat not found".to_string());
        assert_eq!(error.to_string(), "Backend rejected request: chat not found");
    }

    #[test]
    fn test_invalid_payload_display() {
        let error = InboxError::InvalidPayload("missing chatId".to_string());
        assert_eq!(error.to_string(), "Invalid payload: missing chatId");
    }

    #[test]
    fn test_unknown_conversation_display() {
        let error = InboxError::UnknownConversation("123@c.us".to_string());
        assert_eq!(error.to_string(), "Unknown conversation: 123@c.us");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: InboxError = io_error.into();
        assert!(matches!(error, InboxError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: InboxError = json_error.into();
        assert!(matches!(error, InboxError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: InboxError = yaml_error.into();
        assert!(matches!(error, InboxError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InboxError>();
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = InboxError::Cancelled("navigated away".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<InboxError>(),
            Some(InboxError::Cancelled(_))
        ));
    }
}
