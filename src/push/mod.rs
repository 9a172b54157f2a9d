//! Push channel abstraction and implementations
//!
//! A [`PushChannel`] opens one connection to the backend's live event feed
//! and yields raw frames (one JSON envelope per item) until the connection
//! drops. Reconnection is not the channel's job: [`pump`] owns the
//! connect / forward / wait / reconnect loop for every implementation.
//!
//! - [`sse::SseChannel`] -- server-sent events over HTTP.
//! - [`websocket::WebSocketChannel`] -- text frames over a WebSocket.
//! - [`fake::FakeChannel`] -- in-process fake used in tests (cfg(test) only).
//!
//! Frames are parsed and validated by [`events::parse_push_event`].

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, PushTransportKind};
use crate::error::{InboxError, Result};

pub mod events;
pub mod sse;
pub mod websocket;

#[cfg(test)]
pub mod fake;

/// Stream of raw push frames from one connection
pub type FrameStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// One connection-oriented source of push frames.
#[async_trait::async_trait]
pub trait PushChannel: Send + Sync + std::fmt::Debug {
    /// Short transport name for logs and metrics (`sse`, `websocket`)
    fn name(&self) -> &'static str;

    /// Open a connection.
    ///
    /// The returned stream ends when the connection is lost.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::InboxError::Transport`] if the connection
    /// cannot be established.
    async fn connect(&self) -> Result<FrameStream>;
}

/// Build the configured push channel for `session_id`.
///
/// Returns `None` when push is disabled and the session relies on polling.
pub fn channel_from_config(
    config: &Config,
    session_id: &str,
) -> Result<Option<Arc<dyn PushChannel>>> {
    let channel: Arc<dyn PushChannel> = match config.push.transport {
        PushTransportKind::None => return Ok(None),
        PushTransportKind::Sse => {
            let base = url::Url::parse(&config.backend.base_url).map_err(|e| {
                InboxError::Config(format!("invalid base_url {}: {}", config.backend.base_url, e))
            })?;
            Arc::new(sse::SseChannel::for_session(&base, session_id)?)
        }
        PushTransportKind::WebSocket => {
            let raw = config.push.websocket_url.as_deref().ok_or_else(|| {
                InboxError::Config("push.websocket_url is required for websocket transport".to_string())
            })?;
            let url = url::Url::parse(raw)
                .map_err(|e| InboxError::Config(format!("invalid websocket_url {}: {}", raw, e)))?;
            Arc::new(websocket::WebSocketChannel::new(url)?)
        }
    };
    Ok(Some(channel))
}

/// Forward frames from `channel` into `frames` until `cancel` fires.
///
/// Connection failures and dropped connections are retried after
/// `reconnect_delay`. Returns when cancelled or when the receiving side of
/// `frames` is gone.
pub async fn pump(
    channel: Arc<dyn PushChannel>,
    reconnect_delay: Duration,
    frames: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    let mut attempt: u64 = 0;
    loop {
        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = channel.connect() => result,
        };

        match connected {
            Ok(mut stream) => {
                info!(transport = channel.name(), attempt, "Push channel connected");
                loop {
                    let frame = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        frame = stream.next() => frame,
                    };
                    match frame {
                        Some(frame) => {
                            if frames.send(frame).await.is_err() {
                                debug!("Push consumer gone, stopping");
                                return;
                            }
                        }
                        None => break,
                    }
                }
                warn!(transport = channel.name(), "Push channel disconnected");
            }
            Err(e) => {
                warn!(transport = channel.name(), error = %e, "Push channel connect failed");
            }
        }

        attempt += 1;
        crate::metrics::record_reconnect(channel.name());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
        debug!(transport = channel.name(), attempt, "Reconnecting push channel");
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeChannel;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pump_forwards_frames_and_reconnects() {
        let (channel, handle) = FakeChannel::new();
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(
            Arc::new(channel),
            Duration::from_secs(5),
            tx,
            cancel.clone(),
        ));

        let conn = handle.next_connection().await;
        conn.send("one".to_string()).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("one"));

        // Dropping the connection sender ends the stream.
        drop(conn);
        let conn = handle.next_connection().await;
        assert_eq!(handle.connects(), 2);
        conn.send("two".to_string()).unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("two"));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_waits_reconnect_delay_after_failure() {
        let (channel, handle) = FakeChannel::new();
        handle.fail_next_connects(1);
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let task = tokio::spawn(pump(
            Arc::new(channel),
            Duration::from_secs(5),
            tx,
            cancel.clone(),
        ));

        let _conn = handle.next_connection().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(handle.connects(), 2);

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_channel_from_config() {
        let mut config = Config::default();
        let channel = channel_from_config(&config, "sales").unwrap().unwrap();
        assert_eq!(channel.name(), "sse");

        config.push.transport = PushTransportKind::None;
        assert!(channel_from_config(&config, "sales").unwrap().is_none());

        config.push.transport = PushTransportKind::WebSocket;
        assert!(channel_from_config(&config, "sales").is_err());
        config.push.websocket_url = Some("ws://localhost:3001/ws".to_string());
        assert_eq!(
            channel_from_config(&config, "sales").unwrap().unwrap().name(),
            "websocket"
        );
    }

    #[tokio::test]
    async fn test_pump_stops_when_cancelled_before_connect() {
        let (channel, _handle) = FakeChannel::new();
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        pump(Arc::new(channel), Duration::from_secs(5), tx, cancel).await;
    }
}
