//! WebSocket push channel
//!
//! Each text frame is one push envelope. Binary frames are accepted when
//! they hold UTF-8; control frames are handled by `tokio-tungstenite` and a
//! close frame ends the connection.

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use crate::error::{InboxError, Result};
use crate::push::{FrameStream, PushChannel};

#[derive(Debug, Clone)]
pub struct WebSocketChannel {
    url: url::Url,
}

impl WebSocketChannel {
    /// # Errors
    ///
    /// Returns [`InboxError::Config`] unless `url` uses `ws` or `wss`.
    pub fn new(url: url::Url) -> Result<Self> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(InboxError::Config(format!(
                "WebSocket URL must use ws or wss, got {}",
                url
            ))
            .into());
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

/// Payload of a data frame, or None for frames that carry no event
fn frame_text(message: WsMessage) -> Option<String> {
    match message {
        WsMessage::Text(text) => Some(text.as_str().to_string()),
        WsMessage::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(text),
            Err(_) => {
                debug!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                None
            }
        },
        _ => None,
    }
}

#[async_trait::async_trait]
impl PushChannel for WebSocketChannel {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&self) -> Result<FrameStream> {
        let (socket, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| InboxError::Transport(format!("WebSocket connect failed: {}", e)))?;
        debug!(url = %self.url, status = %response.status(), "WebSocket handshake complete");

        let frames = socket
            .take_while(|message| {
                let open = match message {
                    Ok(WsMessage::Close(frame)) => {
                        debug!(?frame, "WebSocket closed by server");
                        false
                    }
                    Ok(_) => true,
                    Err(e) => {
                        debug!(error = %e, "WebSocket read failed");
                        false
                    }
                };
                futures::future::ready(open)
            })
            .filter_map(|message| futures::future::ready(message.ok().and_then(frame_text)));

        Ok(Box::pin(frames))
    }
}
