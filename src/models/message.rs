//! Message model and the delivery status state machine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InboxError, Result};

/// Prefix carried by client-generated ids of optimistic messages.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Delivery status of a message.
///
/// Statuses only move forward along `sending < sent < delivered < read`.
/// `failed` can only be entered from `sending` and nothing leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Optimistic entry, network call in flight
    Sending,
    /// Accepted by the backend
    Sent,
    /// Delivered to the recipient's device
    Delivered,
    /// Read by the recipient
    Read,
    /// Send failed; stays visible until the user retries
    Failed,
}

impl MessageStatus {
    fn rank(self) -> Option<u8> {
        match self {
            MessageStatus::Sending => Some(0),
            MessageStatus::Sent => Some(1),
            MessageStatus::Delivered => Some(2),
            MessageStatus::Read => Some(3),
            MessageStatus::Failed => None,
        }
    }

    /// Returns true when moving from `self` to `next` is forward progress.
    ///
    /// # Examples
    ///
    /// ```
    /// use wa_inbox::models::MessageStatus;
    ///
    /// assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
    /// assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Sent));
    /// assert!(!MessageStatus::Failed.can_advance_to(MessageStatus::Read));
    /// ```
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        match (self, next) {
            (MessageStatus::Failed, _) => false,
            (MessageStatus::Sending, MessageStatus::Failed) => true,
            (_, MessageStatus::Failed) => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    /// The more advanced of two statuses under the forward-progress rule.
    pub fn max_progress(self, other: MessageStatus) -> MessageStatus {
        if self.can_advance_to(other) {
            other
        } else {
            self
        }
    }

    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = InboxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sending" => Ok(MessageStatus::Sending),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(InboxError::InvalidPayload(format!(
                "unknown message status: {}",
                other
            ))),
        }
    }
}

/// Kind of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Location,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Video => "video",
            MessageType::Audio => "audio",
            MessageType::Document => "document",
            MessageType::Sticker => "sticker",
            MessageType::Location => "location",
        };
        f.write_str(s)
    }
}

impl MessageType {
    /// Guess the message type from a file name extension, for media sends.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => MessageType::Image,
            "mp4" | "mov" | "3gp" | "mkv" => MessageType::Video,
            "mp3" | "ogg" | "opus" | "m4a" | "wav" => MessageType::Audio,
            _ => MessageType::Document,
        }
    }
}

fn default_status() -> MessageStatus {
    MessageStatus::Sent
}

/// A single chat message.
///
/// Messages created locally by the send pipeline carry a temporary id
/// (see [`Message::is_temporary`]) until the backend confirms them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default = "default_status")]
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub is_forwarded: bool,
}

impl Message {
    /// Build an optimistic outgoing message in the `sending` state.
    ///
    /// # Examples
    ///
    /// ```
    /// use wa_inbox::models::{Message, MessageStatus};
    ///
    /// let msg = Message::outgoing("hello", 1_700_000_000_000);
    /// assert!(msg.is_temporary());
    /// assert!(msg.is_from_me);
    /// assert_eq!(msg.status, MessageStatus::Sending);
    /// ```
    pub fn outgoing(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: temp_message_id(timestamp),
            content: content.into(),
            message_type: MessageType::Text,
            timestamp,
            is_from_me: true,
            status: MessageStatus::Sending,
            media_url: None,
            reply_to: None,
            is_starred: false,
            is_forwarded: false,
        }
    }

    /// Whether this entry still carries a client-generated id
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Apply `next` if it is forward progress; returns whether it changed.
    pub fn advance_status(&mut self, next: MessageStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Reject messages that cannot be placed in a timeline.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(InboxError::InvalidPayload("message id is empty".to_string()).into());
        }
        if self.timestamp <= 0 {
            return Err(InboxError::InvalidPayload(format!(
                "message {} has non-positive timestamp {}",
                self.id, self.timestamp
            ))
            .into());
        }
        Ok(())
    }
}

/// Generate a unique temporary id of the form `temp_<millis>_<suffix>`.
pub fn temp_message_id(timestamp: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}_{}", TEMP_ID_PREFIX, timestamp, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MessageStatus; 5] = [
        MessageStatus::Sending,
        MessageStatus::Sent,
        MessageStatus::Delivered,
        MessageStatus::Read,
        MessageStatus::Failed,
    ];

    #[test]
    fn test_forward_progress_order() {
        assert!(MessageStatus::Sending.can_advance_to(MessageStatus::Sent));
        assert!(MessageStatus::Sending.can_advance_to(MessageStatus::Read));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Read));
    }

    #[test]
    fn test_regressions_rejected() {
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Sending));
    }

    #[test]
    fn test_same_status_is_not_progress() {
        for status in ALL {
            assert!(!status.can_advance_to(status), "{status} -> {status}");
        }
    }

    #[test]
    fn test_failed_is_absorbing() {
        for next in ALL {
            assert!(!MessageStatus::Failed.can_advance_to(next));
        }
    }

    #[test]
    fn test_failed_only_from_sending() {
        assert!(MessageStatus::Sending.can_advance_to(MessageStatus::Failed));
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Failed));
        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Failed));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Failed));
    }

    #[test]
    fn test_max_progress() {
        assert_eq!(
            MessageStatus::Delivered.max_progress(MessageStatus::Sent),
            MessageStatus::Delivered
        );
        assert_eq!(
            MessageStatus::Sent.max_progress(MessageStatus::Read),
            MessageStatus::Read
        );
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("DELIVERED".parse::<MessageStatus>().unwrap(), MessageStatus::Delivered);
        assert!("seen".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_temp_ids_are_unique() {
        let a = temp_message_id(42);
        let b = temp_message_id(42);
        assert!(a.starts_with("temp_42_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_message_deserializes_canonical_schema() {
        let json = r#"{
            "id": "ABC123",
            "content": "hi there",
            "type": "text",
            "timestamp": 1700000000000,
            "isFromMe": false,
            "status": "delivered",
            "replyTo": "XYZ"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "ABC123");
        assert_eq!(msg.status, MessageStatus::Delivered);
        assert_eq!(msg.reply_to.as_deref(), Some("XYZ"));
        assert!(!msg.is_starred);
        assert!(!msg.is_temporary());
    }

    #[test]
    fn test_message_status_defaults_to_sent() {
        let msg: Message =
            serde_json::from_str(r#"{"id":"A","content":"x","timestamp":5}"#).unwrap();
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.message_type, MessageType::Text);
    }

    #[test]
    fn test_validate_rejects_empty_id_and_bad_timestamp() {
        let mut msg = Message::outgoing("x", 10);
        assert!(msg.validate().is_ok());
        msg.timestamp = 0;
        assert!(msg.validate().is_err());
        msg.timestamp = 10;
        msg.id = "  ".to_string();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_message_type_from_file_name() {
        assert_eq!(MessageType::from_file_name("photo.JPG"), MessageType::Image);
        assert_eq!(MessageType::from_file_name("clip.mp4"), MessageType::Video);
        assert_eq!(MessageType::from_file_name("note.ogg"), MessageType::Audio);
        assert_eq!(MessageType::from_file_name("invoice.pdf"), MessageType::Document);
        assert_eq!(MessageType::from_file_name("README"), MessageType::Document);
    }
}
