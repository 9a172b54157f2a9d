//! Data model shared by the stores, the backend client and the push channel
//!
//! All wire types use the canonical camelCase schema (`isFromMe`, `content`).

pub mod contact;
pub mod conversation;
pub mod message;
pub mod session;

pub use contact::Contact;
pub use conversation::Conversation;
pub use message::{temp_message_id, Message, MessageStatus, MessageType, TEMP_ID_PREFIX};
pub use session::{Session, SessionStatus};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
