//! HTTP backend client
//!
//! [`HttpBackend`] talks to the backend REST API with `reqwest`. Reads use
//! the request timeout, sends use the (longer) send timeout. List responses
//! are decoded item by item: an entry that does not match the schema is
//! logged and skipped instead of failing the whole list.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wa_inbox::backend::http::HttpBackend;
//! use wa_inbox::backend::InboxBackend;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let backend = HttpBackend::new(
//!     url::Url::parse("http://localhost:3001")?,
//!     Duration::from_secs(15),
//!     Duration::from_secs(20),
//! )?;
//! for session in backend.list_sessions().await? {
//!     println!("{} {}", session.id, session.status);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::backend::{InboxBackend, MediaUpload, SendAck, SendMessageRequest, SendResponse};
use crate::config::BackendConfig;
use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message, Session};

/// `reqwest`-based [`InboxBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: url::Url,
    request_timeout: Duration,
    send_timeout: Duration,
}

impl HttpBackend {
    /// Construct a client for the backend at `base_url`.
    ///
    /// No network I/O is performed at construction time.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::Config`] if `base_url` cannot carry a path or
    /// the HTTP client cannot be initialised.
    pub fn new(base_url: url::Url, request_timeout: Duration, send_timeout: Duration) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(InboxError::Config(format!("{} cannot be used as a base URL", base_url)).into());
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("wa-inbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InboxError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
            send_timeout,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url)
            .map_err(|e| InboxError::Config(format!("invalid base_url {}: {}", config.base_url, e)))?;
        Self::new(base_url, config.request_timeout(), config.send_timeout())
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InboxError::Config(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_send_error(&self, e: reqwest::Error, operation: &str, timeout: Duration) -> anyhow::Error {
        if e.is_timeout() {
            InboxError::Timeout {
                seconds: timeout.as_secs(),
                operation: operation.to_string(),
            }
            .into()
        } else {
            InboxError::Transport(format!("{} failed: {}", operation, e)).into()
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, url: url::Url) -> Result<Vec<T>> {
        let operation = format!("GET {}", url.path());
        debug!(url = %url, "Fetching");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, &operation, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InboxError::Transport(format!("{} returned HTTP {}", operation, status)).into());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InboxError::InvalidPayload(format!("{}: {}", operation, e)))?;
        decode_list(body, &operation)
    }

    async fn read_send_response(&self, response: reqwest::Response, operation: &str) -> Result<SendAck> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e, operation, self.send_timeout))?;

        match serde_json::from_str::<SendResponse>(&text) {
            Ok(parsed) => parsed.into_ack(),
            Err(_) if !status.is_success() => {
                Err(InboxError::Transport(format!("{} returned HTTP {}", operation, status)).into())
            }
            Err(e) => Err(InboxError::InvalidPayload(format!("{}: {}", operation, e)).into()),
        }
    }
}

/// Decode a JSON array, skipping entries that do not match `T`.
fn decode_list<T: DeserializeOwned>(body: serde_json::Value, operation: &str) -> Result<Vec<T>> {
    let serde_json::Value::Array(items) = body else {
        return Err(InboxError::InvalidPayload(format!("{}: expected a JSON array", operation)).into());
    };

    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation, error = %e, "Skipping malformed list entry");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        debug!(operation, kept = decoded.len(), total, "Dropped malformed entries");
    }
    Ok(decoded)
}

#[async_trait::async_trait]
impl InboxBackend for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.get_list(self.endpoint(&["api", "sessions"])?).await
    }

    async fn list_conversations(&self, session_id: &str) -> Result<Vec<Conversation>> {
        self.get_list(self.endpoint(&["api", "sessions", session_id, "chats"])?)
            .await
    }

    async fn list_messages(&self, session_id: &str, chat_id: &str) -> Result<Vec<Message>> {
        self.get_list(self.endpoint(&[
            "api", "sessions", session_id, "chats", chat_id, "messages",
        ])?)
        .await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendAck> {
        let url = self.endpoint(&["api", "messages", "send"])?;
        let operation = "POST /api/messages/send";
        debug!(chat_id = %request.chat_id, "Sending message");

        let response = self
            .client
            .post(url)
            .json(request)
            .timeout(self.send_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, operation, self.send_timeout))?;
        self.read_send_response(response, operation).await
    }

    async fn send_media(&self, upload: &MediaUpload) -> Result<SendAck> {
        let url = self.endpoint(&["api", "messages", "send-media"])?;
        let operation = "POST /api/messages/send-media";
        debug!(chat_id = %upload.chat_id, file = %upload.file_name, bytes = upload.bytes.len(), "Sending media");

        let file = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone())
            .mime_str(upload.content_type())
            .map_err(|e| InboxError::InvalidPayload(format!("invalid MIME type: {}", e)))?;
        let mut form = reqwest::multipart::Form::new()
            .text("sessionId", upload.session_id.clone())
            .text("chatId", upload.chat_id.clone());
        if let Some(caption) = &upload.caption {
            form = form.text("caption", caption.clone());
        }
        form = form.part("file", file);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.send_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e, operation, self.send_timeout))?;
        self.read_send_response(response, operation).await
    }
}
