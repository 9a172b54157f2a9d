//! Message timeline for the open conversation
//!
//! The timeline keeps messages sorted by timestamp (ascending, stable for
//! equal timestamps) and owns the reconciliation of optimistic entries with
//! server-confirmed ones. Every mutation here goes through the
//! forward-progress rule of [`MessageStatus`], so replaying or reordering
//! events can never move a message backwards or duplicate it.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Message, MessageStatus};

/// Upper bound on statuses held for messages the timeline has not seen yet
pub const MAX_EARLY_STATUSES: usize = 64;

/// How far apart a failed entry and a server copy of it may be timestamped
const ECHO_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Result of inserting or updating a message by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The message was new and has been inserted
    Inserted,
    /// The message already existed and some field changed
    Updated,
    /// The message already existed and nothing changed
    Unchanged,
}

/// Result of applying a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The status moved forward
    Advanced,
    /// The event was a regression or a repeat
    Ignored,
    /// The message is not in the timeline yet; the status was kept for later
    Buffered,
}

/// Result of reconciling an optimistic entry with the server id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// The temporary id was replaced in place
    Replaced,
    /// The server copy was already present; the temporary entry was folded into it
    Merged,
    /// No temporary entry with that id (already reconciled, or timeline reloaded)
    Missing,
    /// The temporary entry had already failed and stays failed
    Rejected,
}

/// Ordered list of messages for one conversation
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    chat_id: String,
    messages: Vec<Message>,
    early_statuses: HashMap<String, MessageStatus>,
}

impl MessageTimeline {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            messages: Vec::new(),
            early_statuses: HashMap::new(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    fn insert_sorted(&mut self, message: Message) {
        let idx = self
            .messages
            .partition_point(|m| m.timestamp <= message.timestamp);
        self.messages.insert(idx, message);
    }

    /// Replace the timeline with a fresh fetch.
    ///
    /// Fetched messages are de-duplicated by id (keeping the most advanced
    /// status). Optimistic entries that are still temporary survive the
    /// reload so an in-flight send does not vanish from view.
    pub fn load(&mut self, fetched: Vec<Message>) {
        let pending: Vec<Message> = self
            .messages
            .drain(..)
            .filter(Message::is_temporary)
            .collect();

        for message in fetched {
            if let Err(e) = message.validate() {
                debug!(chat_id = %self.chat_id, error = %e, "Skipping invalid fetched message");
                continue;
            }
            self.upsert(message);
        }
        for message in pending {
            if message.status == MessageStatus::Failed
                && self.messages.iter().any(|m| is_server_copy(&message, m))
            {
                debug!(chat_id = %self.chat_id, temp_id = %message.id, "Failed entry was delivered after all");
                continue;
            }
            self.insert_sorted(message);
        }
        self.settle_early_statuses();
    }

    /// Append an optimistic entry created by the send pipeline.
    pub fn push_optimistic(&mut self, message: Message) {
        debug_assert!(message.is_temporary());
        self.insert_sorted(message);
    }

    /// Insert a message, or merge it into the existing entry with the same id.
    pub fn upsert(&mut self, mut message: Message) -> Upsert {
        if let Some(idx) = self.position(&message.id) {
            let existing = &mut self.messages[idx];
            let mut changed = existing.advance_status(message.status);
            if existing.media_url.is_none() && message.media_url.is_some() {
                existing.media_url = message.media_url.take();
                changed = true;
            }
            if message.is_starred != existing.is_starred {
                existing.is_starred = message.is_starred;
                changed = true;
            }
            return if changed {
                Upsert::Updated
            } else {
                Upsert::Unchanged
            };
        }

        if let Some(early) = self.early_statuses.remove(&message.id) {
            message.status = message.status.max_progress(early);
        }
        self.insert_sorted(message);
        Upsert::Inserted
    }

    /// Apply a pushed status event for `message_id`.
    pub fn apply_status(&mut self, message_id: &str, status: MessageStatus) -> StatusOutcome {
        if let Some(idx) = self.position(message_id) {
            return if self.messages[idx].advance_status(status) {
                StatusOutcome::Advanced
            } else {
                debug!(
                    message_id,
                    current = %self.messages[idx].status,
                    incoming = %status,
                    "Ignoring non-forward status update"
                );
                StatusOutcome::Ignored
            };
        }

        // Only an in-flight send can still learn its server id.
        if !self.has_pending_sends() {
            return StatusOutcome::Ignored;
        }
        if self.early_statuses.len() >= MAX_EARLY_STATUSES
            && !self.early_statuses.contains_key(message_id)
        {
            debug!(message_id, "Early status buffer full, dropping status");
            return StatusOutcome::Ignored;
        }
        let slot = self
            .early_statuses
            .entry(message_id.to_string())
            .or_insert(status);
        *slot = slot.max_progress(status);
        StatusOutcome::Buffered
    }

    /// Swap the temporary id of an optimistic entry for the server id.
    ///
    /// `status` is the status reported by the ack (normally `sent`). Any
    /// status pushed for `server_id` before the ack arrived is folded in, and
    /// the final status is the most advanced of all of them.
    pub fn reconcile(
        &mut self,
        temp_id: &str,
        server_id: &str,
        status: MessageStatus,
        media_url: Option<String>,
    ) -> Reconcile {
        let Some(temp_idx) = self.position(temp_id) else {
            return Reconcile::Missing;
        };
        if self.messages[temp_idx].status == MessageStatus::Failed {
            return Reconcile::Rejected;
        }

        let early = self.early_statuses.remove(server_id);

        if let Some(server_idx) = self.position(server_id) {
            let temp = self.messages.remove(temp_idx);
            let server_idx = if server_idx > temp_idx {
                server_idx - 1
            } else {
                server_idx
            };
            let existing = &mut self.messages[server_idx];
            existing.advance_status(temp.status.max_progress(status));
            if let Some(early) = early {
                existing.advance_status(early);
            }
            if existing.media_url.is_none() {
                existing.media_url = media_url.or(temp.media_url);
            }
            self.settle_early_statuses();
            return Reconcile::Merged;
        }

        let entry = &mut self.messages[temp_idx];
        entry.id = server_id.to_string();
        entry.advance_status(status);
        if let Some(early) = early {
            entry.advance_status(early);
        }
        if media_url.is_some() {
            entry.media_url = media_url;
        }
        self.settle_early_statuses();
        Reconcile::Replaced
    }

    /// Flip an optimistic entry to `failed`. The entry is never removed.
    pub fn mark_failed(&mut self, temp_id: &str) -> bool {
        let changed = match self.position(temp_id) {
            Some(idx) => self.messages[idx].advance_status(MessageStatus::Failed),
            None => false,
        };
        self.settle_early_statuses();
        changed
    }

    /// Replace a failed entry with the server's copy of the same message.
    ///
    /// A send that timed out can still reach the recipient; when its echo
    /// (or a polled copy) shows up, the failed entry becomes that message
    /// instead of sitting next to it. Returns the temporary id that was
    /// replaced.
    pub fn adopt_failed(&mut self, message: &Message) -> Option<String> {
        if message.is_temporary() || !message.is_from_me || self.position(&message.id).is_some() {
            return None;
        }
        let idx = self.messages.iter().position(|m| {
            m.is_temporary() && m.status == MessageStatus::Failed && is_server_copy(m, message)
        })?;
        let failed = self.messages.remove(idx);
        let mut adopted = message.clone();
        if adopted.media_url.is_none() {
            adopted.media_url = failed.media_url;
        }
        if let Some(early) = self.early_statuses.remove(&adopted.id) {
            adopted.status = adopted.status.max_progress(early);
        }
        debug!(chat_id = %self.chat_id, temp_id = %failed.id, server_id = %adopted.id, "Failed entry adopted by server copy");
        self.insert_sorted(adopted);
        Some(failed.id)
    }

    /// Whether any optimistic entry is still waiting for its ack
    pub fn has_pending_sends(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.is_temporary() && m.status == MessageStatus::Sending)
    }

    /// Number of statuses buffered for messages not yet in the timeline
    pub fn early_status_count(&self) -> usize {
        self.early_statuses.len()
    }

    fn settle_early_statuses(&mut self) {
        if !self.early_statuses.is_empty() && !self.has_pending_sends() {
            self.early_statuses.clear();
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let removed = self.position(id).map(|idx| self.messages.remove(idx));
        self.settle_early_statuses();
        removed
    }

    /// True when timestamps are in ascending order
    pub fn is_sorted(&self) -> bool {
        self.messages
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

/// Whether `server` is the delivered copy of the optimistic entry `temp`
fn is_server_copy(temp: &Message, server: &Message) -> bool {
    !server.is_temporary()
        && server.is_from_me
        && server.message_type == temp.message_type
        && server.content == temp.content
        && (server.timestamp - temp.timestamp).abs() <= ECHO_WINDOW_MS
}
