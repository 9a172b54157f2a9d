//! Inbox state and the reducer that mutates it
//!
//! [`InboxStore`] bundles the conversation list, the timeline of the open
//! conversation and the presence tracker for one session. It does no I/O:
//! every method takes already-fetched data or a validated event, mutates
//! state synchronously and returns the [`InboxUpdate`]s observers should see.
//! The session wraps it in a single mutex, so each call is one short critical
//! section.

pub mod conversations;
pub mod presence;
pub mod timeline;

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{InboxError, Result};
use crate::models::{Contact, Conversation, Message, MessageStatus, SessionStatus};
use crate::push::events::PushEvent;

pub use conversations::{ConversationStore, IncomingOutcome};
pub use presence::{PresenceTracker, DEFAULT_TYPING_TIMEOUT};
pub use timeline::{MessageTimeline, Reconcile, StatusOutcome, Upsert};

/// Notification published after a state change
#[derive(Debug, Clone, PartialEq)]
pub enum InboxUpdate {
    /// The conversation list (content or order) changed
    ConversationsChanged,
    /// Messages were added, removed or replaced in the open timeline
    TimelineChanged { chat_id: String },
    /// A message moved along the status state machine
    MessageStatusChanged {
        chat_id: String,
        message_id: String,
        status: MessageStatus,
    },
    /// Typing or online state of a contact changed
    PresenceChanged { contact_id: String },
    SessionStatusChanged {
        session_id: String,
        status: SessionStatus,
    },
    /// The list is stale and must be refetched
    RefreshRequested,
    /// User-visible error
    Error(String),
}

/// All client-side state of one inbox session
#[derive(Debug)]
pub struct InboxStore {
    session_id: String,
    conversations: ConversationStore,
    timeline: Option<MessageTimeline>,
    presence: PresenceTracker,
}

impl InboxStore {
    pub fn new(session_id: impl Into<String>, typing_timeout: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            conversations: ConversationStore::new(),
            timeline: None,
            presence: PresenceTracker::new(typing_timeout),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn timeline(&self) -> Option<&MessageTimeline> {
        self.timeline.as_ref()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Id of the conversation whose timeline is open
    pub fn active_chat_id(&self) -> Option<&str> {
        self.timeline.as_ref().map(MessageTimeline::chat_id)
    }

    fn active_timeline_mut(&mut self, chat_id: &str) -> Option<&mut MessageTimeline> {
        self.timeline.as_mut().filter(|t| t.chat_id() == chat_id)
    }

    /// Replace the conversation list with an authoritative snapshot.
    pub fn replace_conversations(&mut self, conversations: Vec<Conversation>) -> Vec<InboxUpdate> {
        self.conversations.clear_error();
        let kept = self.conversations.replace_all(conversations);
        debug!(session_id = %self.session_id, kept, "Conversation list replaced");
        vec![InboxUpdate::ConversationsChanged]
    }

    /// Empty the list and raise the error banner after a failed load.
    pub fn set_load_error(&mut self, message: impl Into<String>) -> Vec<InboxUpdate> {
        let message = message.into();
        self.conversations.set_load_error(message.clone());
        vec![InboxUpdate::ConversationsChanged, InboxUpdate::Error(message)]
    }

    /// Open `chat_id`: mark it read and start a fresh, empty timeline.
    ///
    /// Re-selecting the open conversation keeps its timeline.
    pub fn select_conversation(&mut self, chat_id: &str) -> Result<Vec<InboxUpdate>> {
        if self.conversations.get(chat_id).is_none() {
            return Err(InboxError::UnknownConversation(chat_id.to_string()).into());
        }

        let mut updates = Vec::new();
        if self.conversations.mark_read(chat_id) {
            updates.push(InboxUpdate::ConversationsChanged);
        }
        if self.active_chat_id() != Some(chat_id) {
            self.timeline = Some(MessageTimeline::new(chat_id));
            updates.push(InboxUpdate::TimelineChanged {
                chat_id: chat_id.to_string(),
            });
        }
        Ok(updates)
    }

    /// Close the open timeline, if any.
    pub fn deselect_conversation(&mut self) -> Option<String> {
        self.timeline.take().map(|t| t.chat_id().to_string())
    }

    /// Fill the timeline with fetched history.
    ///
    /// A fetch that completes after the user moved to another conversation
    /// is discarded.
    pub fn load_timeline(&mut self, chat_id: &str, messages: Vec<Message>) -> Vec<InboxUpdate> {
        match self.active_timeline_mut(chat_id) {
            Some(timeline) => {
                timeline.load(messages);
                vec![InboxUpdate::TimelineChanged {
                    chat_id: chat_id.to_string(),
                }]
            }
            None => {
                debug!(chat_id, "Discarding history for a conversation that is no longer open");
                Vec::new()
            }
        }
    }

    /// Fold a polled history fetch into the open timeline.
    ///
    /// Unlike [`InboxStore::load_timeline`] nothing is dropped: known
    /// messages only move forward, missing ones are inserted.
    pub fn merge_timeline(&mut self, chat_id: &str, messages: Vec<Message>) -> Vec<InboxUpdate> {
        let Some(timeline) = self.active_timeline_mut(chat_id) else {
            return Vec::new();
        };
        let mut changed = false;
        let mut adopted = Vec::new();
        for message in messages {
            if message.validate().is_err() {
                continue;
            }
            if let Some(temp_id) = timeline.adopt_failed(&message) {
                adopted.push((temp_id, message));
                changed = true;
                continue;
            }
            changed |= timeline.upsert(message) != Upsert::Unchanged;
        }

        let mut updates = Vec::new();
        for (temp_id, message) in adopted {
            if self
                .conversations
                .adopt_last_message(chat_id, &temp_id, &message)
                && !updates.contains(&InboxUpdate::ConversationsChanged)
            {
                updates.push(InboxUpdate::ConversationsChanged);
            }
        }
        if changed {
            updates.push(InboxUpdate::TimelineChanged {
                chat_id: chat_id.to_string(),
            });
        }
        updates
    }

    pub fn mark_read(&mut self, chat_id: &str) -> Vec<InboxUpdate> {
        if self.conversations.mark_read(chat_id) {
            vec![InboxUpdate::ConversationsChanged]
        } else {
            Vec::new()
        }
    }

    /// Apply a pushed message (incoming, or the echo of our own send).
    pub fn apply_incoming_message(
        &mut self,
        chat_id: &str,
        message: Message,
        now: Instant,
    ) -> Vec<InboxUpdate> {
        let mut updates = Vec::new();

        if let Some(timeline) = self.active_timeline_mut(chat_id) {
            if let Some(temp_id) = timeline.adopt_failed(&message) {
                updates.push(InboxUpdate::TimelineChanged {
                    chat_id: chat_id.to_string(),
                });
                if self
                    .conversations
                    .adopt_last_message(chat_id, &temp_id, &message)
                {
                    updates.push(InboxUpdate::ConversationsChanged);
                }
                return updates;
            }
            let id = message.id.clone();
            match timeline.upsert(message.clone()) {
                Upsert::Inserted => updates.push(InboxUpdate::TimelineChanged {
                    chat_id: chat_id.to_string(),
                }),
                Upsert::Updated => {
                    let status = timeline.get(&id).map(|m| m.status).unwrap_or(message.status);
                    updates.push(InboxUpdate::MessageStatusChanged {
                        chat_id: chat_id.to_string(),
                        message_id: id,
                        status,
                    });
                    return updates;
                }
                Upsert::Unchanged => {
                    debug!(chat_id, message_id = %id, "Duplicate message push ignored");
                    return updates;
                }
            }
        }

        match self.conversations.apply_incoming_message(chat_id, &message) {
            IncomingOutcome::Applied => updates.push(InboxUpdate::ConversationsChanged),
            IncomingOutcome::Duplicate => {}
            IncomingOutcome::UnknownConversation => {
                debug!(chat_id, "Message for a conversation not in the list, requesting refresh");
                updates.push(InboxUpdate::RefreshRequested);
            }
        }

        if !message.is_from_me {
            let contact_id = self
                .conversations
                .get(chat_id)
                .map(|c| c.contact.id.clone())
                .unwrap_or_else(|| chat_id.to_string());
            if self.presence.is_typing(&contact_id, now) && self.presence.stop_typing(&contact_id) {
                updates.push(InboxUpdate::PresenceChanged { contact_id });
            }
        }
        updates
    }

    /// Append the optimistic entry of a send to the open timeline.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::UnknownConversation`] when `chat_id` is not the
    /// open conversation.
    pub fn begin_send(&mut self, chat_id: &str, message: Message) -> Result<Vec<InboxUpdate>> {
        let timeline = self
            .active_timeline_mut(chat_id)
            .ok_or_else(|| InboxError::UnknownConversation(chat_id.to_string()))?;
        timeline.push_optimistic(message.clone());

        let mut updates = vec![InboxUpdate::TimelineChanged {
            chat_id: chat_id.to_string(),
        }];
        if self.conversations.apply_incoming_message(chat_id, &message) == IncomingOutcome::Applied {
            updates.push(InboxUpdate::ConversationsChanged);
        }
        Ok(updates)
    }

    /// Reconcile an acknowledged send with its server id.
    pub fn complete_send(
        &mut self,
        chat_id: &str,
        temp_id: &str,
        server_id: &str,
        media_url: Option<String>,
    ) -> Vec<InboxUpdate> {
        let Some(timeline) = self.active_timeline_mut(chat_id) else {
            debug!(chat_id, temp_id, "Discarding ack for a conversation that is no longer open");
            return Vec::new();
        };

        let outcome = timeline.reconcile(temp_id, server_id, MessageStatus::Sent, media_url);
        let status = timeline.get(server_id).map(|m| m.status);
        debug!(chat_id, temp_id, server_id, ?outcome, "Send acknowledged");

        let mut updates = Vec::new();
        match (outcome, status) {
            (Reconcile::Replaced | Reconcile::Merged, Some(status)) => {
                if self
                    .conversations
                    .reconcile_last_message(chat_id, temp_id, server_id, status)
                {
                    updates.push(InboxUpdate::ConversationsChanged);
                }
                updates.push(InboxUpdate::TimelineChanged {
                    chat_id: chat_id.to_string(),
                });
                updates.push(InboxUpdate::MessageStatusChanged {
                    chat_id: chat_id.to_string(),
                    message_id: server_id.to_string(),
                    status,
                });
            }
            _ => {}
        }
        updates
    }

    /// Mark an optimistic entry as failed.
    pub fn fail_send(&mut self, chat_id: &str, temp_id: &str) -> Vec<InboxUpdate> {
        let Some(timeline) = self.active_timeline_mut(chat_id) else {
            debug!(chat_id, temp_id, "Discarding failure for a conversation that is no longer open");
            return Vec::new();
        };
        if !timeline.mark_failed(temp_id) {
            return Vec::new();
        }

        let mut updates = vec![InboxUpdate::MessageStatusChanged {
            chat_id: chat_id.to_string(),
            message_id: temp_id.to_string(),
            status: MessageStatus::Failed,
        }];
        if self
            .conversations
            .apply_last_message_status(chat_id, temp_id, MessageStatus::Failed)
        {
            updates.push(InboxUpdate::ConversationsChanged);
        }
        updates
    }

    /// Remove a failed entry so it can be sent again; returns it.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::UnknownMessage`] if `temp_id` is not a failed
    /// entry of the open `chat_id` timeline.
    pub fn take_failed(&mut self, chat_id: &str, temp_id: &str) -> Result<Message> {
        let timeline = self
            .active_timeline_mut(chat_id)
            .ok_or_else(|| InboxError::UnknownConversation(chat_id.to_string()))?;
        match timeline.get(temp_id) {
            Some(m) if m.status == MessageStatus::Failed => {}
            _ => return Err(InboxError::UnknownMessage(temp_id.to_string()).into()),
        }
        timeline
            .remove(temp_id)
            .ok_or_else(|| InboxError::UnknownMessage(temp_id.to_string()).into())
    }

    /// Apply a pushed status update.
    ///
    /// Statuses for messages the open timeline does not hold yet are buffered
    /// until the matching ack reconciles them.
    pub fn apply_status(
        &mut self,
        chat_id: Option<&str>,
        message_id: &str,
        status: MessageStatus,
    ) -> Vec<InboxUpdate> {
        let mut updates = Vec::new();

        let timeline_matches = match (&self.timeline, chat_id) {
            (Some(timeline), Some(chat_id)) => timeline.chat_id() == chat_id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if timeline_matches {
            if let Some(timeline) = self.timeline.as_mut() {
                match timeline.apply_status(message_id, status) {
                    StatusOutcome::Advanced => updates.push(InboxUpdate::MessageStatusChanged {
                        chat_id: timeline.chat_id().to_string(),
                        message_id: message_id.to_string(),
                        status,
                    }),
                    StatusOutcome::Buffered => {
                        debug!(message_id, %status, "Buffered status for unknown message")
                    }
                    StatusOutcome::Ignored => {}
                }
            }
        }

        let summary_chat = chat_id
            .map(str::to_string)
            .or_else(|| {
                self.conversations
                    .chat_with_last_message(message_id)
                    .map(str::to_string)
            });
        if let Some(summary_chat) = summary_chat {
            if self
                .conversations
                .apply_last_message_status(&summary_chat, message_id, status)
            {
                updates.push(InboxUpdate::ConversationsChanged);
            }
        }
        updates
    }

    /// Apply one validated push event.
    ///
    /// Events scoped to a different session are dropped.
    pub fn apply_event(&mut self, event: PushEvent, now: Instant) -> Vec<InboxUpdate> {
        if let Some(session_id) = event.session_id() {
            if session_id != self.session_id && !matches!(event, PushEvent::SessionStatus(_)) {
                debug!(
                    event = event.name(),
                    session_id,
                    active = %self.session_id,
                    "Dropping event for another session"
                );
                return Vec::new();
            }
        }

        match event {
            PushEvent::Message(e) => self.apply_incoming_message(&e.chat_id, e.message, now),
            PushEvent::MessageStatusUpdate(e) => {
                self.apply_status(e.chat_id.as_deref(), &e.message_id, e.status)
            }
            PushEvent::UserTyping(e) => {
                let changed = if e.is_typing {
                    self.presence.on_typing(&e.contact_id, now)
                } else {
                    self.presence.stop_typing(&e.contact_id)
                };
                if changed {
                    vec![InboxUpdate::PresenceChanged {
                        contact_id: e.contact_id,
                    }]
                } else {
                    Vec::new()
                }
            }
            PushEvent::UserPresence(e) => {
                let changed = self
                    .presence
                    .on_presence(&e.contact_id, e.is_online, e.last_seen);
                if changed || !e.is_online {
                    vec![InboxUpdate::PresenceChanged {
                        contact_id: e.contact_id,
                    }]
                } else {
                    Vec::new()
                }
            }
            PushEvent::ChatsUpdated(e) => match e.chats {
                Some(chats) => self.replace_conversations(chats),
                None => vec![InboxUpdate::RefreshRequested],
            },
            PushEvent::SessionStatus(e) => {
                if e.session_id == self.session_id && e.status != SessionStatus::Ready {
                    warn!(session_id = %e.session_id, status = %e.status, "Session is not ready");
                }
                vec![InboxUpdate::SessionStatusChanged {
                    session_id: e.session_id,
                    status: e.status,
                }]
            }
        }
    }

    /// Earliest moment a typing indicator will lapse
    pub fn next_typing_deadline(&self) -> Option<Instant> {
        self.presence.next_deadline()
    }

    /// Clear typing indicators whose deadline has passed.
    pub fn expire_typing(&mut self, now: Instant) -> Vec<InboxUpdate> {
        self.presence
            .expire(now)
            .into_iter()
            .map(|contact_id| InboxUpdate::PresenceChanged { contact_id })
            .collect()
    }

    /// Contact of `chat_id` with presence flags derived at `now`
    pub fn contact_view(&self, chat_id: &str, now: Instant) -> Option<Contact> {
        self.conversations
            .get(chat_id)
            .map(|c| self.presence.contact_view(&c.contact, now))
    }

    pub fn set_pinned(&mut self, chat_id: &str, pinned: bool) -> Result<Vec<InboxUpdate>> {
        Ok(Self::changed(self.conversations.set_pinned(chat_id, pinned)?))
    }

    pub fn set_muted(&mut self, chat_id: &str, muted: bool) -> Result<Vec<InboxUpdate>> {
        Ok(Self::changed(self.conversations.set_muted(chat_id, muted)?))
    }

    pub fn set_archived(&mut self, chat_id: &str, archived: bool) -> Result<Vec<InboxUpdate>> {
        Ok(Self::changed(self.conversations.set_archived(chat_id, archived)?))
    }

    fn changed(changed: bool) -> Vec<InboxUpdate> {
        if changed {
            vec![InboxUpdate::ConversationsChanged]
        } else {
            Vec::new()
        }
    }
}
