//! Backend API abstraction
//!
//! The inbox never talks to WhatsApp directly. Everything goes through a
//! backend exposing a small REST surface, modelled by the [`InboxBackend`]
//! trait:
//!
//! - [`http::HttpBackend`] -- `reqwest` client for the real backend.
//! - [`fake::FakeBackend`] -- scripted in-process fake (cfg(test) only).
//!
//! Send responses carry an explicit `success` flag; [`SendResponse::into_ack`]
//! turns `success: false` (or a success without an id) into
//! [`InboxError::Rejected`] so every implementation reports rejections the
//! same way.

use serde::{Deserialize, Serialize};

use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message, Session};

pub mod http;

#[cfg(test)]
pub mod fake;

/// Body of `POST /api/messages/send`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub session_id: String,
    pub chat_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// A media file to send through `POST /api/messages/send-media`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub session_id: String,
    pub chat_id: String,
    pub caption: Option<String>,
    pub file_name: String,
    pub bytes: bytes::Bytes,
}

impl MediaUpload {
    /// MIME type guessed from the file extension
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            "mp3" => "audio/mpeg",
            "ogg" | "opus" => "audio/ogg",
            "m4a" => "audio/mp4",
            "pdf" => "application/pdf",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// Response of both send endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A confirmed send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    pub message_id: String,
    pub media_url: Option<String>,
}

impl SendResponse {
    /// Convert to an ack, or a [`InboxError::Rejected`] error.
    ///
    /// # Examples
    ///
    /// ```
    /// use wa_inbox::backend::SendResponse;
    ///
    /// let ok: SendResponse = serde_json::from_str(r#"{"success":true,"messageId":"ABC"}"#).unwrap();
    /// assert_eq!(ok.into_ack().unwrap().message_id, "ABC");
    ///
    /// let rejected: SendResponse =
    ///     serde_json::from_str(r#"{"success":false,"error":"session not ready"}"#).unwrap();
    /// assert!(rejected.into_ack().is_err());
    /// ```
    pub fn into_ack(self) -> Result<SendAck> {
        if !self.success {
            let reason = self
                .error
                .unwrap_or_else(|| "backend reported failure".to_string());
            return Err(InboxError::Rejected(reason).into());
        }
        match self.message_id {
            Some(id) if !id.trim().is_empty() => Ok(SendAck {
                message_id: id,
                media_url: self.media_url,
            }),
            _ => Err(InboxError::Rejected("success response without messageId".to_string()).into()),
        }
    }
}

/// Operations the inbox needs from the backend.
///
/// Implementations must be cheap to share (`Arc<dyn InboxBackend>`); every
/// call is independent and may run concurrently with others.
#[async_trait::async_trait]
pub trait InboxBackend: Send + Sync + std::fmt::Debug {
    /// `GET /api/sessions`
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// `GET /api/sessions/{sessionId}/chats`
    async fn list_conversations(&self, session_id: &str) -> Result<Vec<Conversation>>;

    /// `GET /api/sessions/{sessionId}/chats/{chatId}/messages`
    async fn list_messages(&self, session_id: &str, chat_id: &str) -> Result<Vec<Message>>;

    /// `POST /api/messages/send`
    ///
    /// # Errors
    ///
    /// [`InboxError::Rejected`] when the backend answers `success: false`;
    /// [`InboxError::Transport`] or [`InboxError::Timeout`] when it cannot
    /// be reached.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendAck>;

    /// `POST /api/messages/send-media` (multipart)
    async fn send_media(&self, upload: &MediaUpload) -> Result<SendAck>;
}
