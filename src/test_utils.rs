//! Test utilities for wa-inbox
//!
//! Temporary files, assertion helpers and builders for model values used
//! across the unit tests.

use crate::cli::{Cli, Commands};
use crate::models::{Contact, Conversation, Message, MessageStatus, MessageType};
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content and return its path
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// CLI arguments with no overrides
pub fn test_cli() -> Cli {
    Cli {
        config: None,
        verbose: false,
        base_url: None,
        session: None,
        command: Commands::Sessions,
    }
}

/// Conversation keyed by `id`, whose contact id is also `id`
pub fn conversation(id: &str, last_message_time: i64, unread_count: u32) -> Conversation {
    let mut conversation = Conversation::new(Contact::new(id, id.to_uppercase()));
    conversation.last_message_time = last_message_time;
    conversation.unread_count = unread_count;
    conversation
}

/// Server-side message from the contact, status `sent`
pub fn incoming_message(id: &str, timestamp: i64) -> Message {
    Message {
        id: id.to_string(),
        content: format!("message {}", id),
        message_type: MessageType::Text,
        timestamp,
        is_from_me: false,
        status: MessageStatus::Sent,
        media_url: None,
        reply_to: None,
        is_starred: false,
        is_forwarded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InboxError;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: crate::error::Result<()> =
            Err(InboxError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_builders_produce_valid_values() {
        assert!(conversation("a", 10, 2).validate().is_ok());
        assert!(incoming_message("m1", 10).validate().is_ok());
    }
}
