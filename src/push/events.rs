//! Push channel event types
//!
//! Every frame on the push channel is a JSON envelope
//! `{"event": "<name>", "data": {...}}`. [`parse_push_event`] turns one frame
//! into a validated [`PushEvent`]; frames that fail validation are reported
//! as [`InboxError::InvalidPayload`] so the caller can log and drop them
//! without touching state.
//!
//! # Example
//!
//! ```
//! use wa_inbox::push::events::{parse_push_event, PushEvent};
//!
//! let frame = r#"{"event":"user_typing","data":{"contactId":"15550001@c.us"}}"#;
//! let event = parse_push_event(frame).unwrap().unwrap();
//! assert!(matches!(event, PushEvent::UserTyping(ref t) if t.is_typing));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message, MessageStatus, SessionStatus};

/// Event names understood by the inbox
pub const KNOWN_EVENTS: [&str; 6] = [
    "message",
    "message_status_update",
    "user_typing",
    "user_presence",
    "chats_updated",
    "session_status",
];

/// A new message (incoming, or the echo of one of our own sends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessageEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    pub chat_id: String,
    pub message: Message,
}

/// Delivery status change for a message identified by its server id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    pub message_id: String,
    pub status: MessageStatus,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    pub contact_id: String,
    #[serde(default = "default_true")]
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    pub contact_id: String,
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<i64>,
}

/// The conversation list changed server-side.
///
/// When `chats` is present it is an authoritative snapshot; otherwise the
/// client should refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatsUpdatedEvent {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chats: Option<Vec<Conversation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub session_id: String,
    pub status: SessionStatus,
}

/// A validated push event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    Message(IncomingMessageEvent),
    MessageStatusUpdate(StatusUpdateEvent),
    UserTyping(TypingEvent),
    UserPresence(PresenceEvent),
    ChatsUpdated(ChatsUpdatedEvent),
    SessionStatus(SessionStatusEvent),
}

impl PushEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Message(_) => "message",
            PushEvent::MessageStatusUpdate(_) => "message_status_update",
            PushEvent::UserTyping(_) => "user_typing",
            PushEvent::UserPresence(_) => "user_presence",
            PushEvent::ChatsUpdated(_) => "chats_updated",
            PushEvent::SessionStatus(_) => "session_status",
        }
    }

    /// Session the event is scoped to, when the payload says so
    pub fn session_id(&self) -> Option<&str> {
        match self {
            PushEvent::Message(e) => e.session_id.as_deref(),
            PushEvent::MessageStatusUpdate(e) => e.session_id.as_deref(),
            PushEvent::UserTyping(e) => e.session_id.as_deref(),
            PushEvent::UserPresence(e) => e.session_id.as_deref(),
            PushEvent::ChatsUpdated(e) => e.session_id.as_deref(),
            PushEvent::SessionStatus(e) => Some(e.session_id.as_str()),
        }
    }

    /// Structural checks serde cannot express
    pub fn validate(&self) -> Result<()> {
        fn non_empty(value: &str, field: &str) -> Result<()> {
            if value.trim().is_empty() {
                return Err(InboxError::InvalidPayload(format!("{} is empty", field)).into());
            }
            Ok(())
        }

        match self {
            PushEvent::Message(e) => {
                non_empty(&e.chat_id, "chatId")?;
                e.message.validate()
            }
            PushEvent::MessageStatusUpdate(e) => non_empty(&e.message_id, "messageId"),
            PushEvent::UserTyping(e) => non_empty(&e.contact_id, "contactId"),
            PushEvent::UserPresence(e) => non_empty(&e.contact_id, "contactId"),
            PushEvent::ChatsUpdated(_) => Ok(()),
            PushEvent::SessionStatus(e) => non_empty(&e.session_id, "sessionId"),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
}

/// Parse and validate one push frame.
///
/// Returns `Ok(None)` for well-formed envelopes carrying an event name the
/// inbox does not handle.
///
/// # Errors
///
/// Returns [`InboxError::InvalidPayload`] if the frame is not a JSON
/// envelope, if the data does not match the event's schema, or if it fails
/// validation.
pub fn parse_push_event(frame: &str) -> Result<Option<PushEvent>> {
    let envelope: Envelope = serde_json::from_str(frame)
        .map_err(|e| InboxError::InvalidPayload(format!("not an event envelope: {}", e)))?;

    if !KNOWN_EVENTS.contains(&envelope.event.as_str()) {
        debug!(event = %envelope.event, "Ignoring unhandled push event");
        return Ok(None);
    }

    let event: PushEvent = serde_json::from_str(frame).map_err(|e| {
        InboxError::InvalidPayload(format!("malformed '{}' event: {}", envelope.event, e))
    })?;
    event.validate()?;
    Ok(Some(event))
}
