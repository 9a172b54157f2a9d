//! Live inbox session
//!
//! [`InboxSession`] ties one WhatsApp session's [`InboxStore`] to the
//! backend and the push channel. It owns:
//!
//! - the store, behind a single `tokio::sync::Mutex` that is never held
//!   across network I/O;
//! - a broadcast channel of [`InboxUpdate`]s for observers;
//! - a [`CancellationToken`] for every background task, plus a child token
//!   for the open conversation that in-flight sends and history fetches
//!   hang off.
//!
//! Switching conversation cancels the previous conversation's token, so a
//! late send result or history fetch is dropped instead of landing in the
//! wrong timeline. Dropping the session cancels everything.
//!
//! ```text
//! push pump --frames--> run loop --apply_event--> InboxStore --updates--> subscribers
//!                        |  ^                          ^
//!             poll tick -+  +- typing deadline         +-- send tasks (ack / fail)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{InboxBackend, MediaUpload, SendAck, SendMessageRequest};
use crate::config::Config;
use crate::error::{InboxError, Result};
use crate::metrics::{record_dropped_event, record_push_event, SendMetrics};
use crate::models::{now_millis, Contact, Conversation, Message, MessageType};
use crate::push::events::parse_push_event;
use crate::push::{pump, PushChannel};
use crate::store::{InboxStore, InboxUpdate};

/// Timing and sizing of one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub send_timeout: Duration,
    pub poll_interval: Duration,
    pub typing_timeout: Duration,
    pub reconnect_delay: Duration,
    pub update_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(5),
            typing_timeout: Duration::from_millis(3000),
            reconnect_delay: Duration::from_secs(5),
            update_capacity: 256,
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            send_timeout: config.backend.send_timeout(),
            poll_interval: config.inbox.poll_interval(),
            typing_timeout: config.inbox.typing_timeout(),
            reconnect_delay: config.push.reconnect_delay(),
            update_capacity: config.inbox.update_channel_capacity,
        }
    }
}

/// How a send ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Acknowledged; the entry now carries the server id
    Sent { message_id: String },
    /// Rejected, unreachable or timed out; the entry is marked failed
    Failed { reason: String },
    /// The conversation was closed first; the result was discarded
    Cancelled,
}

/// A send whose optimistic entry is already in the timeline
#[derive(Debug)]
pub struct PendingSend {
    chat_id: String,
    temp_id: String,
    handle: JoinHandle<SendOutcome>,
}

impl PendingSend {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Temporary id of the optimistic entry
    pub fn temp_id(&self) -> &str {
        &self.temp_id
    }

    /// Wait for the backend's answer.
    pub async fn outcome(self) -> SendOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => SendOutcome::Cancelled,
            Err(e) => SendOutcome::Failed {
                reason: format!("send task failed: {}", e),
            },
        }
    }
}

/// What was handed to the backend, kept so a failed send can be retried
#[derive(Debug, Clone)]
enum Outgoing {
    Text {
        content: String,
        reply_to: Option<String>,
    },
    Media {
        file_name: String,
        bytes: Bytes,
        caption: Option<String>,
    },
}

impl Outgoing {
    fn kind(&self) -> &'static str {
        match self {
            Outgoing::Text { .. } => "text",
            Outgoing::Media { .. } => "media",
        }
    }

    fn optimistic_message(&self) -> Message {
        match self {
            Outgoing::Text { content, reply_to } => {
                let mut message = Message::outgoing(content.clone(), now_millis());
                message.reply_to = reply_to.clone();
                message
            }
            Outgoing::Media {
                file_name, caption, ..
            } => {
                let mut message =
                    Message::outgoing(caption.clone().unwrap_or_default(), now_millis());
                message.message_type = MessageType::from_file_name(file_name);
                message
            }
        }
    }
}

/// Everything guarded by the session lock
#[derive(Debug)]
struct SessionState {
    store: InboxStore,
    /// Child of the session token for the open conversation
    conversation: CancellationToken,
    /// Payloads of failed sends in the open conversation, by temporary id
    failed: HashMap<String, Outgoing>,
}

impl SessionState {
    /// Drop payloads whose failed entry was replaced by a delivered copy.
    fn forget_settled_failures(&mut self) {
        if self.failed.is_empty() {
            return;
        }
        let Some(timeline) = self.store.timeline() else {
            self.failed.clear();
            return;
        };
        self.failed.retain(|temp_id, _| timeline.get(temp_id).is_some());
    }
}

/// Background poll bookkeeping for the run loop
#[derive(Debug, Default)]
struct SyncSlot {
    running: bool,
    queued: bool,
}

impl SyncSlot {
    /// Returns true when the caller should start a poll now.
    fn request(&mut self) -> bool {
        if self.running {
            self.queued = true;
            false
        } else {
            self.running = true;
            true
        }
    }

    /// Returns true when a queued request should start now.
    fn finished(&mut self) -> bool {
        if std::mem::take(&mut self.queued) {
            true
        } else {
            self.running = false;
            false
        }
    }
}

#[derive(Debug)]
struct Shared {
    session_id: String,
    backend: Arc<dyn InboxBackend>,
    options: SessionOptions,
    state: Mutex<SessionState>,
    updates: broadcast::Sender<InboxUpdate>,
    cancel: CancellationToken,
}

/// Client-side state of one WhatsApp session kept in sync with the backend
#[derive(Debug)]
pub struct InboxSession {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl InboxSession {
    /// Create an idle session. Nothing is fetched until
    /// [`InboxSession::load_conversations`] or [`InboxSession::start`].
    pub fn new(
        session_id: impl Into<String>,
        backend: Arc<dyn InboxBackend>,
        options: SessionOptions,
    ) -> Self {
        let session_id = session_id.into();
        let cancel = CancellationToken::new();
        let (updates, _) = broadcast::channel(options.update_capacity.max(1));
        let state = SessionState {
            store: InboxStore::new(session_id.clone(), options.typing_timeout),
            conversation: cancel.child_token(),
            failed: HashMap::new(),
        };

        Self {
            shared: Arc::new(Shared {
                session_id,
                backend,
                options,
                state: Mutex::new(state),
                updates,
                cancel,
            }),
            tasks: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboxUpdate> {
        self.shared.updates.subscribe()
    }

    /// Token cancelled when the session shuts down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Spawn the event loop: push frames (if `channel` is set), polling and
    /// typing expiry.
    pub fn start(&mut self, channel: Option<Arc<dyn PushChannel>>) {
        let shared = Arc::clone(&self.shared);
        self.tasks.push(tokio::spawn(shared.run(channel)));
    }

    /// Cancel every background task and wait for them to stop.
    pub async fn shutdown(mut self) {
        self.shared.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "Session task ended abnormally");
            }
        }
        info!(session_id = %self.shared.session_id, "Inbox session shut down");
    }

    /// Fetch the conversation list.
    ///
    /// A transport failure leaves an empty list and an error banner; calling
    /// this again is the manual retry.
    pub async fn load_conversations(&self) -> Vec<Conversation> {
        let fetched = self
            .shared
            .backend
            .list_conversations(&self.shared.session_id)
            .await;

        let mut state = self.shared.state.lock().await;
        let updates = match fetched {
            Ok(conversations) => state.store.replace_conversations(conversations),
            Err(e) => {
                warn!(session_id = %self.shared.session_id, error = %e, "Failed to load conversations");
                state
                    .store
                    .set_load_error(format!("Could not load conversations: {}", e))
            }
        };
        let snapshot = state
            .store
            .conversations()
            .ordered()
            .into_iter()
            .cloned()
            .collect();
        drop(state);
        self.shared.publish(updates);
        snapshot
    }

    /// Open `chat_id`: mark it read, cancel work for the previous
    /// conversation and load the history.
    ///
    /// # Errors
    ///
    /// [`InboxError::UnknownConversation`] if the chat is not in the list,
    /// [`InboxError::Cancelled`] if another conversation was opened before the
    /// history arrived, or the fetch error.
    pub async fn select_conversation(&self, chat_id: &str) -> Result<()> {
        let token = {
            let mut state = self.shared.state.lock().await;
            let switching = state.store.active_chat_id() != Some(chat_id);
            let updates = state.store.select_conversation(chat_id)?;
            if switching {
                state.conversation.cancel();
                state.conversation = self.shared.cancel.child_token();
                state.failed.clear();
            }
            self.shared.publish(updates);
            if !switching {
                return Ok(());
            }
            state.conversation.clone()
        };
        debug!(chat_id, "Conversation selected, loading history");

        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(InboxError::Cancelled(format!("history of {}", chat_id)).into());
            }
            result = self.shared.backend.list_messages(&self.shared.session_id, chat_id) => result,
        };

        match fetched {
            Ok(messages) => {
                let updates = self
                    .shared
                    .state
                    .lock()
                    .await
                    .store
                    .load_timeline(chat_id, messages);
                self.shared.publish(updates);
                Ok(())
            }
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to load messages");
                self.shared.publish(vec![InboxUpdate::Error(format!(
                    "Could not load messages: {}",
                    e
                ))]);
                Err(e)
            }
        }
    }

    /// Close the open conversation and cancel its in-flight work.
    pub async fn deselect_conversation(&self) {
        let mut state = self.shared.state.lock().await;
        state.conversation.cancel();
        state.conversation = self.shared.cancel.child_token();
        state.failed.clear();
        if let Some(chat_id) = state.store.deselect_conversation() {
            debug!(chat_id = %chat_id, "Conversation closed");
        }
    }

    pub async fn mark_read(&self, chat_id: &str) {
        let updates = self.shared.state.lock().await.store.mark_read(chat_id);
        self.shared.publish(updates);
    }

    /// Send text to the open conversation.
    ///
    /// The optimistic entry is in the timeline and published before this
    /// returns; the network call runs in the background.
    pub async fn send(&self, content: &str, reply_to: Option<String>) -> Result<PendingSend> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InboxError::InvalidPayload("message content is empty".to_string()).into());
        }
        self.shared
            .dispatch(Outgoing::Text {
                content: content.to_string(),
                reply_to,
            })
            .await
    }

    /// Send a file to the open conversation through the media endpoint.
    pub async fn send_media(
        &self,
        file_name: impl Into<String>,
        bytes: Bytes,
        caption: Option<String>,
    ) -> Result<PendingSend> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(InboxError::InvalidPayload("media file name is empty".to_string()).into());
        }
        self.shared
            .dispatch(Outgoing::Media {
                file_name,
                bytes,
                caption: caption.filter(|c| !c.trim().is_empty()),
            })
            .await
    }

    /// Replace a failed entry with a fresh send of the same content.
    ///
    /// # Errors
    ///
    /// [`InboxError::UnknownMessage`] unless `temp_id` is a failed entry of
    /// the open conversation.
    pub async fn retry(&self, temp_id: &str) -> Result<PendingSend> {
        self.shared.retry(temp_id).await
    }

    pub async fn set_pinned(&self, chat_id: &str, pinned: bool) -> Result<()> {
        let updates = self.shared.state.lock().await.store.set_pinned(chat_id, pinned)?;
        self.shared.publish(updates);
        Ok(())
    }

    pub async fn set_muted(&self, chat_id: &str, muted: bool) -> Result<()> {
        let updates = self.shared.state.lock().await.store.set_muted(chat_id, muted)?;
        self.shared.publish(updates);
        Ok(())
    }

    pub async fn set_archived(&self, chat_id: &str, archived: bool) -> Result<()> {
        let updates = self
            .shared
            .state
            .lock()
            .await
            .store
            .set_archived(chat_id, archived)?;
        self.shared.publish(updates);
        Ok(())
    }

    /// Apply one raw push frame. Malformed frames are dropped.
    pub async fn apply_frame(&self, frame: &str) -> Vec<InboxUpdate> {
        self.shared.handle_frame(frame).await
    }

    /// Inbox conversations in display order
    pub async fn conversations(&self) -> Vec<Conversation> {
        let state = self.shared.state.lock().await;
        state
            .store
            .conversations()
            .ordered()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn archived_conversations(&self) -> Vec<Conversation> {
        let state = self.shared.state.lock().await;
        state
            .store
            .conversations()
            .archived()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn error_banner(&self) -> Option<String> {
        let state = self.shared.state.lock().await;
        state.store.conversations().error_banner().map(str::to_string)
    }

    pub async fn active_chat_id(&self) -> Option<String> {
        let state = self.shared.state.lock().await;
        state.store.active_chat_id().map(str::to_string)
    }

    /// Messages of the open conversation, oldest first
    pub async fn timeline(&self) -> Vec<Message> {
        let state = self.shared.state.lock().await;
        state
            .store
            .timeline()
            .map(|t| t.messages().to_vec())
            .unwrap_or_default()
    }

    /// Contact of `chat_id` with live presence flags
    pub async fn contact_view(&self, chat_id: &str) -> Option<Contact> {
        let state = self.shared.state.lock().await;
        state.store.contact_view(chat_id, Instant::now())
    }

    pub async fn typing_contacts(&self) -> Vec<String> {
        let state = self.shared.state.lock().await;
        state.store.presence().typing_contacts(Instant::now())
    }
}

impl Drop for InboxSession {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

impl Shared {
    fn publish(&self, updates: Vec<InboxUpdate>) {
        for update in updates {
            // No subscribers is fine.
            let _ = self.updates.send(update);
        }
    }

    async fn dispatch(self: &Arc<Self>, payload: Outgoing) -> Result<PendingSend> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, payload)
    }

    async fn retry(self: &Arc<Self>, temp_id: &str) -> Result<PendingSend> {
        let mut state = self.state.lock().await;
        let chat_id = state
            .store
            .active_chat_id()
            .map(str::to_string)
            .ok_or_else(|| InboxError::UnknownMessage(temp_id.to_string()))?;
        let failed = state.store.take_failed(&chat_id, temp_id)?;
        let payload = state.failed.remove(temp_id).unwrap_or(Outgoing::Text {
            content: failed.content,
            reply_to: failed.reply_to,
        });
        info!(chat_id = %chat_id, temp_id, "Retrying failed send");
        self.publish(vec![InboxUpdate::TimelineChanged {
            chat_id: chat_id.clone(),
        }]);
        self.begin(&mut state, payload)
    }

    /// Append the optimistic entry and spawn the backend call.
    fn begin(self: &Arc<Self>, state: &mut SessionState, payload: Outgoing) -> Result<PendingSend> {
        let chat_id = state
            .store
            .active_chat_id()
            .map(str::to_string)
            .ok_or_else(|| InboxError::UnknownConversation("no conversation is open".to_string()))?;

        let message = payload.optimistic_message();
        let temp_id = message.id.clone();
        let updates = state.store.begin_send(&chat_id, message)?;
        self.publish(updates);
        debug!(chat_id = %chat_id, temp_id = %temp_id, kind = payload.kind(), "Optimistic entry appended");

        let metrics = SendMetrics::new(payload.kind());
        let token = state.conversation.clone();
        let handle = tokio::spawn(Arc::clone(self).drive_send(
            chat_id.clone(),
            temp_id.clone(),
            payload,
            token,
            metrics,
        ));

        Ok(PendingSend {
            chat_id,
            temp_id,
            handle,
        })
    }

    async fn drive_send(
        self: Arc<Self>,
        chat_id: String,
        temp_id: String,
        payload: Outgoing,
        token: CancellationToken,
        metrics: SendMetrics,
    ) -> SendOutcome {
        let send_timeout = self.options.send_timeout;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(chat_id = %chat_id, temp_id = %temp_id, "Send cancelled before the backend answered");
                metrics.record_outcome("cancelled");
                return SendOutcome::Cancelled;
            }
            result = tokio::time::timeout(send_timeout, self.call_backend(&chat_id, &payload)) => result,
        };
        let result: Result<SendAck> = match result {
            Ok(result) => result,
            Err(_) => Err(InboxError::Timeout {
                seconds: send_timeout.as_secs(),
                operation: format!("send to {}", chat_id),
            }
            .into()),
        };

        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            debug!(chat_id = %chat_id, temp_id = %temp_id, "Discarding send result for a closed conversation");
            metrics.record_outcome("cancelled");
            return SendOutcome::Cancelled;
        }

        match result {
            Ok(ack) => {
                let updates =
                    state
                        .store
                        .complete_send(&chat_id, &temp_id, &ack.message_id, ack.media_url);
                drop(state);
                self.publish(updates);
                metrics.record_outcome("sent");
                info!(
                    chat_id = %chat_id,
                    temp_id = %temp_id,
                    message_id = %ack.message_id,
                    elapsed_ms = metrics.elapsed().as_millis() as u64,
                    "Message sent"
                );
                SendOutcome::Sent {
                    message_id: ack.message_id,
                }
            }
            Err(e) => {
                let outcome = match e.downcast_ref::<InboxError>() {
                    Some(InboxError::Timeout { .. }) => "timeout",
                    _ => "failed",
                };
                warn!(chat_id = %chat_id, temp_id = %temp_id, error = %e, "Send failed");
                let updates = state.store.fail_send(&chat_id, &temp_id);
                state.failed.insert(temp_id, payload);
                drop(state);
                self.publish(updates);
                metrics.record_outcome(outcome);
                SendOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn call_backend(&self, chat_id: &str, payload: &Outgoing) -> Result<SendAck> {
        match payload {
            Outgoing::Text { content, reply_to } => {
                let request = SendMessageRequest {
                    session_id: self.session_id.clone(),
                    chat_id: chat_id.to_string(),
                    content: content.clone(),
                    reply_to: reply_to.clone(),
                };
                self.backend.send_message(&request).await
            }
            Outgoing::Media {
                file_name,
                bytes,
                caption,
            } => {
                let upload = MediaUpload {
                    session_id: self.session_id.clone(),
                    chat_id: chat_id.to_string(),
                    caption: caption.clone(),
                    file_name: file_name.clone(),
                    bytes: bytes.clone(),
                };
                self.backend.send_media(&upload).await
            }
        }
    }

    /// Apply a frame and run the refetch it asks for before returning.
    async fn handle_frame(&self, frame: &str) -> Vec<InboxUpdate> {
        let updates = self.apply_frame_now(frame).await;
        if updates.contains(&InboxUpdate::RefreshRequested) {
            self.refresh_conversations().await;
        }
        updates
    }

    async fn apply_frame_now(&self, frame: &str) -> Vec<InboxUpdate> {
        let event = match parse_push_event(frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                record_dropped_event("unknown_event");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed push frame");
                record_dropped_event("invalid_payload");
                return Vec::new();
            }
        };

        let name = event.name();
        let updates = {
            let mut state = self.state.lock().await;
            let updates = state.store.apply_event(event, Instant::now());
            state.forget_settled_failures();
            updates
        };
        record_push_event(name);
        self.publish(updates.clone());
        updates
    }

    /// Authoritative refetch of the list. Failures keep the current list.
    async fn refresh_conversations(&self) {
        match self.backend.list_conversations(&self.session_id).await {
            Ok(conversations) => {
                let updates = self
                    .state
                    .lock()
                    .await
                    .store
                    .replace_conversations(conversations);
                self.publish(updates);
            }
            Err(e) => debug!(error = %e, "Conversation refresh failed, keeping current list"),
        }
    }

    async fn poll(&self) {
        self.refresh_conversations().await;

        let active = {
            let state = self.state.lock().await;
            state
                .store
                .active_chat_id()
                .map(|id| (id.to_string(), state.conversation.clone()))
        };
        let Some((chat_id, token)) = active else {
            return;
        };
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            result = self.backend.list_messages(&self.session_id, &chat_id) => result,
        };
        match fetched {
            Ok(messages) => {
                let updates = {
                    let mut state = self.state.lock().await;
                    let updates = state.store.merge_timeline(&chat_id, messages);
                    state.forget_settled_failures();
                    updates
                };
                self.publish(updates);
            }
            Err(e) => debug!(chat_id = %chat_id, error = %e, "Timeline poll failed"),
        }
    }

    /// Run one poll in the background, bounded by the session token.
    fn spawn_sync(self: &Arc<Self>, done: mpsc::Sender<()>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => {}
                _ = shared.poll() => {}
            }
            let _ = done.send(()).await;
        });
    }

    async fn run(self: Arc<Self>, channel: Option<Arc<dyn PushChannel>>) {
        let (frame_tx, mut frame_rx) = mpsc::channel(self.options.update_capacity.max(1));
        let pump_task = channel.map(|channel| {
            info!(session_id = %self.session_id, transport = channel.name(), "Starting push channel");
            tokio::spawn(pump(
                channel,
                self.options.reconnect_delay,
                frame_tx,
                self.cancel.child_token(),
            ))
        });
        let mut push_open = pump_task.is_some();

        let period = self.options.poll_interval;
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // At most one poll or refetch runs at a time; requests made while it
        // runs are coalesced into one follow-up.
        let (sync_done_tx, mut sync_done) = mpsc::channel(1);
        let mut sync = SyncSlot::default();

        loop {
            let deadline = self.state.lock().await.store.next_typing_deadline();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                frame = frame_rx.recv(), if push_open => match frame {
                    Some(frame) => {
                        let updates = self.apply_frame_now(&frame).await;
                        if updates.contains(&InboxUpdate::RefreshRequested) && sync.request() {
                            self.spawn_sync(sync_done_tx.clone());
                        }
                    }
                    None => {
                        debug!("Push channel stopped, polling only");
                        push_open = false;
                    }
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let updates = self.state.lock().await.store.expire_typing(Instant::now());
                    self.publish(updates);
                }
                Some(()) = sync_done.recv() => {
                    if sync.finished() {
                        self.spawn_sync(sync_done_tx.clone());
                    }
                }
                _ = poll.tick() => {
                    if sync.request() {
                        self.spawn_sync(sync_done_tx.clone());
                    } else {
                        debug!("Previous poll still running");
                    }
                }
            }
        }

        if let Some(task) = pump_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Push pump ended abnormally");
            }
        }
        debug!(session_id = %self.session_id, "Session loop stopped");
    }
}
