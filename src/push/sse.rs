//! Server-sent events push channel
//!
//! [`SseChannel`] issues `GET {base}/api/sessions/{sessionId}/events` with
//! `Accept: text/event-stream` and turns the body into push frames with
//! [`parse_sse_stream`]. The last seen `id:` is replayed as `Last-Event-ID`
//! on reconnect.
//!
//! Two framings are accepted:
//!
//! - `data: {"event":"message","data":{...}}` -- the envelope in the data field
//! - `event: message` + `data: {...}` -- the envelope is rebuilt from both fields

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::error::{InboxError, Result};
use crate::push::{FrameStream, PushChannel};

/// SSE connection to one session's event stream.
///
/// # Examples
///
/// ```
/// use wa_inbox::push::sse::SseChannel;
///
/// let base = url::Url::parse("http://localhost:3001").unwrap();
/// let channel = SseChannel::for_session(&base, "sales").unwrap();
/// assert_eq!(channel.url().path(), "/api/sessions/sales/events");
/// # tokio_test::block_on(async {
/// assert!(channel.last_event_id().await.is_none());
/// # });
/// ```
#[derive(Debug)]
pub struct SseChannel {
    client: reqwest::Client,
    url: url::Url,
    last_event_id: Arc<RwLock<Option<String>>>,
}

impl SseChannel {
    /// Channel reading from `url`. No network I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::Config`] if the HTTP client cannot be built.
    pub fn new(url: url::Url) -> Result<Self> {
        // No overall timeout; the event stream stays open indefinitely.
        let client = reqwest::Client::builder()
            .user_agent(concat!("wa-inbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InboxError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url,
            last_event_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Events endpoint of `session_id` under `base_url`
    pub fn for_session(base_url: &url::Url, session_id: &str) -> Result<Self> {
        let mut url = base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InboxError::Config(format!("{} cannot be used as a base URL", base_url)))?
            .pop_if_empty()
            .extend(["api", "sessions", session_id, "events"]);
        Self::new(url)
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    pub async fn last_event_id(&self) -> Option<String> {
        self.last_event_id.read().await.clone()
    }
}

#[async_trait::async_trait]
impl PushChannel for SseChannel {
    fn name(&self) -> &'static str {
        "sse"
    }

    async fn connect(&self) -> Result<FrameStream> {
        let mut req = self
            .client
            .get(self.url.as_str())
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache");
        if let Some(id) = self.last_event_id.read().await.as_deref() {
            req = req.header("Last-Event-ID", id);
        }

        let response = req
            .send()
            .await
            .map_err(|e| InboxError::Transport(format!("SSE request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(InboxError::Transport(format!("SSE stream returned HTTP {}", status)).into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let last_event_id = Arc::clone(&self.last_event_id);
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            parse_sse_stream(byte_stream, tx, last_event_id).await;
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// Parse an SSE byte stream and forward complete events to `frame_tx`.
///
/// Runs until the byte stream ends, a chunk fails, or the receiver of
/// `frame_tx` is dropped. `event: ping`, `data: [PING]` and empty events are
/// dropped. CRLF line endings are normalised.
pub async fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    frame_tx: mpsc::UnboundedSender<String>,
    last_event_id: Arc<RwLock<Option<String>>>,
) {
    use futures::StreamExt;

    let mut raw: Vec<u8> = Vec::new();
    let mut buffer = String::new();
    tokio::pin!(byte_stream);

    loop {
        let chunk = tokio::select! {
            _ = frame_tx.closed() => return,
            chunk = byte_stream.next() => chunk,
        };
        let chunk = match chunk {
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                debug!(error = %e, "SSE stream error");
                break;
            }
            None => break,
        };

        // A chunk may end inside a multi-byte character; keep the tail for the next one.
        raw.extend_from_slice(&chunk);
        let valid = match std::str::from_utf8(&raw) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                debug!("Dropping invalid UTF-8 in SSE stream");
                raw.clear();
                continue;
            }
        };
        buffer.push_str(std::str::from_utf8(&raw[..valid]).unwrap_or_default());
        raw.drain(..valid);
        if buffer.contains('\r') {
            buffer = buffer.replace("\r\n", "\n");
        }

        while let Some(pos) = buffer.find("\n\n") {
            let event_block = buffer[..pos].to_string();
            buffer.drain(..pos + 2);
            if !process_sse_event(&event_block, &frame_tx, &last_event_id).await {
                return;
            }
        }
    }

    if !buffer.trim().is_empty() {
        process_sse_event(&buffer, &frame_tx, &last_event_id).await;
    }
}

/// Handle one event block. Returns false once the receiver is gone.
async fn process_sse_event(
    event_block: &str,
    frame_tx: &mpsc::UnboundedSender<String>,
    last_event_id: &Arc<RwLock<Option<String>>>,
) -> bool {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;
    let mut event_id: Option<&str> = None;

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("id:") {
            event_id = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
        // `retry:` and `:` comment lines are ignored.
    }

    if let Some(id) = event_id {
        *last_event_id.write().await = Some(id.to_string());
    }

    if event_type.is_some_and(|et| et.eq_ignore_ascii_case("ping")) {
        return true;
    }

    let data = data_lines.join("\n");
    if data.is_empty() || data.eq_ignore_ascii_case("[ping]") {
        return true;
    }

    frame_tx.send(to_envelope(event_type, data)).is_ok()
}

/// Rebuild the `{"event","data"}` envelope when the event name travels in
/// the SSE `event:` field.
fn to_envelope(event_type: Option<&str>, data: String) -> String {
    let Some(event_type) = event_type else {
        return data;
    };
    match serde_json::from_str::<serde_json::Value>(&data) {
        Ok(serde_json::Value::Object(map)) if map.contains_key("event") => data,
        Ok(value) => serde_json::json!({ "event": event_type, "data": value }).to_string(),
        Err(_) => data,
    }
}
