use serde::{Deserialize, Serialize};

use crate::error::{InboxError, Result};
use crate::models::{Contact, Message};

/// A chat with one contact (or group) within a session.
///
/// The position of a conversation in the inbox list is never stored; it is
/// derived from `last_message_time` by the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    /// Milliseconds since the Unix epoch; zero when the chat has no messages
    #[serde(default)]
    pub last_message_time: i64,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl Conversation {
    /// Empty conversation for `contact`, keyed by the contact id
    pub fn new(contact: Contact) -> Self {
        Self {
            id: contact.id.clone(),
            contact,
            last_message: None,
            last_message_time: 0,
            unread_count: 0,
            is_group: false,
            is_pinned: false,
            is_muted: false,
            is_archived: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(InboxError::InvalidPayload("conversation id is empty".to_string()).into());
        }
        if self.contact.id.trim().is_empty() {
            return Err(InboxError::InvalidPayload(format!(
                "conversation {} has a contact without id",
                self.id
            ))
            .into());
        }
        Ok(())
    }

    /// Preview text for the inbox list
    pub fn preview(&self) -> &str {
        self.last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_from_minimal_json() {
        let json = r#"{"id":"1@c.us","contact":{"id":"1@c.us","name":"Bob"}}"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.unread_count, 0);
        assert_eq!(conv.last_message_time, 0);
        assert!(!conv.is_archived);
        assert_eq!(conv.preview(), "");
        assert!(conv.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_contact_id() {
        let mut conv = Conversation::new(Contact::new("1@c.us", "Bob"));
        conv.contact.id.clear();
        assert!(conv.validate().is_err());
    }
}
