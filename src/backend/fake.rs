//! In-process fake backend for unit tests
//!
//! [`FakeBackend`] serves canned sessions, conversations and messages and
//! answers sends from a script of [`FakeReply`]s. A [`FakeReply::Gated`]
//! reply parks the send until the test releases it through a oneshot
//! channel, which is how tests interleave push events with an in-flight
//! send.
//!
//! ```text
//! session.send() --> FakeBackend::send_message --> pops next FakeReply
//!                                               \-> records the request
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::backend::{InboxBackend, MediaUpload, SendAck, SendMessageRequest};
use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message, Session};

/// Scripted answer to one send
#[derive(Debug)]
pub enum FakeReply {
    Ack {
        message_id: String,
        media_url: Option<String>,
    },
    Reject(String),
    Transport(String),
    /// Never answers; only a timeout or cancellation ends the send
    Hang,
    /// Waits for the test to provide the real reply
    Gated(oneshot::Receiver<FakeReply>),
}

impl FakeReply {
    pub fn ack(message_id: &str) -> Self {
        FakeReply::Ack {
            message_id: message_id.to_string(),
            media_url: None,
        }
    }

    /// A gated reply and the sender that releases it
    pub fn gated() -> (Self, oneshot::Sender<FakeReply>) {
        let (tx, rx) = oneshot::channel();
        (FakeReply::Gated(rx), tx)
    }
}

#[derive(Debug, Default)]
struct FakeState {
    sessions: Vec<Session>,
    conversations: HashMap<String, Vec<Conversation>>,
    messages: HashMap<String, Vec<Message>>,
    replies: VecDeque<FakeReply>,
    sent: Vec<SendMessageRequest>,
    uploads: Vec<MediaUpload>,
    fail_lists: bool,
    list_delay: Option<Duration>,
}

/// Scripted [`InboxBackend`]
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
    list_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake backend state poisoned")
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.state().sessions = sessions;
    }

    pub fn set_conversations(&self, session_id: &str, conversations: Vec<Conversation>) {
        self.state()
            .conversations
            .insert(session_id.to_string(), conversations);
    }

    pub fn set_messages(&self, chat_id: &str, messages: Vec<Message>) {
        self.state().messages.insert(chat_id.to_string(), messages);
    }

    /// Make every list call fail with a transport error.
    pub fn set_fail_lists(&self, fail: bool) {
        self.state().fail_lists = fail;
    }

    /// Make every `list_conversations` call take `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        self.state().list_delay = Some(delay);
    }

    pub fn push_reply(&self, reply: FakeReply) {
        self.state().replies.push_back(reply);
    }

    pub fn sent(&self) -> Vec<SendMessageRequest> {
        self.state().sent.clone()
    }

    pub fn uploads(&self) -> Vec<MediaUpload> {
        self.state().uploads.clone()
    }

    /// Number of `list_conversations` calls so far
    pub fn conversation_fetches(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_lists(&self) -> Result<()> {
        if self.state().fail_lists {
            return Err(InboxError::Transport("connection refused".to_string()).into());
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<SendAck> {
        let reply = self.state().replies.pop_front();
        let reply = match reply {
            Some(FakeReply::Gated(rx)) => rx
                .await
                .map_err(|_| InboxError::Transport("gate dropped".to_string()))?,
            Some(reply) => reply,
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                FakeReply::ack(&format!("SRV{}", n))
            }
        };

        match reply {
            FakeReply::Ack {
                message_id,
                media_url,
            } => Ok(SendAck {
                message_id,
                media_url,
            }),
            FakeReply::Reject(reason) => Err(InboxError::Rejected(reason).into()),
            FakeReply::Transport(reason) => Err(InboxError::Transport(reason).into()),
            FakeReply::Hang | FakeReply::Gated(_) => futures::future::pending().await,
        }
    }
}

#[async_trait::async_trait]
impl InboxBackend for FakeBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.check_lists()?;
        Ok(self.state().sessions.clone())
    }

    async fn list_conversations(&self, session_id: &str) -> Result<Vec<Conversation>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_lists()?;
        Ok(self
            .state()
            .conversations
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_messages(&self, _session_id: &str, chat_id: &str) -> Result<Vec<Message>> {
        self.check_lists()?;
        Ok(self
            .state()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendAck> {
        self.state().sent.push(request.clone());
        self.resolve().await
    }

    async fn send_media(&self, upload: &MediaUpload) -> Result<SendAck> {
        self.state().uploads.push(upload.clone());
        self.resolve().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str) -> SendMessageRequest {
        SendMessageRequest {
            session_id: "s1".to_string(),
            chat_id: "c1".to_string(),
            content: content.to_string(),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn test_default_reply_generates_ids() {
        let backend = FakeBackend::new();
        let first = backend.send_message(&request("a")).await.unwrap();
        let second = backend.send_message(&request("b")).await.unwrap();
        assert_eq!(first.message_id, "SRV1");
        assert_eq!(second.message_id, "SRV2");
        assert_eq!(backend.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_gated_reply_waits_for_release() {
        let backend = std::sync::Arc::new(FakeBackend::new());
        let (reply, release) = FakeReply::gated();
        backend.push_reply(reply);

        let task = {
            let backend = backend.clone();
            tokio::spawn(async move { backend.send_message(&request("a")).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        release.send(FakeReply::ack("X")).unwrap();
        assert_eq!(task.await.unwrap().unwrap().message_id, "X");
    }

    #[tokio::test]
    async fn test_failing_lists() {
        let backend = FakeBackend::new();
        backend.set_fail_lists(true);
        assert!(backend.list_conversations("s1").await.is_err());
        assert_eq!(backend.conversation_fetches(), 1);
    }
}
