//! In-process fake push channel for tests
//!
//! Every successful [`PushChannel::connect`] on a [`FakeChannel`] creates a
//! fresh frame channel and hands its sending half to the test through
//! [`FakeChannelHandle::next_connection`]. Dropping that sender ends the
//! connection, which lets tests exercise reconnects.
//!
//! ```text
//! pump -> FakeChannel::connect() --(sender)--> handle.next_connection()
//! test conn.send(frame) -----------------------> FrameStream item
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::{InboxError, Result};
use crate::push::{FrameStream, PushChannel};

#[derive(Debug)]
pub struct FakeChannel {
    connections_tx: mpsc::UnboundedSender<mpsc::UnboundedSender<String>>,
    connects: Arc<AtomicUsize>,
    fail_remaining: Arc<AtomicUsize>,
}

/// Test-side controls for a [`FakeChannel`]
#[derive(Debug)]
pub struct FakeChannelHandle {
    connections_rx: Mutex<mpsc::UnboundedReceiver<mpsc::UnboundedSender<String>>>,
    connects: Arc<AtomicUsize>,
    fail_remaining: Arc<AtomicUsize>,
}

impl FakeChannel {
    pub fn new() -> (Self, FakeChannelHandle) {
        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        let connects = Arc::new(AtomicUsize::new(0));
        let fail_remaining = Arc::new(AtomicUsize::new(0));

        let channel = Self {
            connections_tx,
            connects: Arc::clone(&connects),
            fail_remaining: Arc::clone(&fail_remaining),
        };
        let handle = FakeChannelHandle {
            connections_rx: Mutex::new(connections_rx),
            connects,
            fail_remaining,
        };
        (channel, handle)
    }
}

impl FakeChannelHandle {
    /// Wait for the next successful connect and return its frame sender.
    ///
    /// # Panics
    ///
    /// Panics if the channel was dropped.
    pub async fn next_connection(&self) -> mpsc::UnboundedSender<String> {
        self.connections_rx
            .lock()
            .await
            .recv()
            .await
            .expect("fake channel dropped")
    }

    /// Connect attempts so far, failed ones included
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PushChannel for FakeChannel {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn connect(&self) -> Result<FrameStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(InboxError::Transport("fake connect refused".to_string()).into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.connections_tx
            .send(tx)
            .map_err(|_| InboxError::Transport("fake handle dropped".to_string()))?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
