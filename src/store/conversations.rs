//! Conversation store: the inbox list of one session
//!
//! Conversations are keyed by id and there is at most one per contact id.
//! The display order is derived on demand from `last_message_time`; it is
//! never stored, so every mutation keeps the ordering invariant for free.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message, MessageStatus};

/// Result of applying an incoming message to the conversation list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingOutcome {
    /// Summary and unread count updated
    Applied,
    /// The message is already the last message of the conversation
    Duplicate,
    /// No conversation with that id; nothing changed
    UnknownConversation,
}

/// Local, optimistic user choices that win over refreshed server data
/// until the server reports the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LocalFlags {
    pinned: Option<bool>,
    muted: Option<bool>,
    archived: Option<bool>,
}

impl LocalFlags {
    fn is_empty(&self) -> bool {
        self.pinned.is_none() && self.muted.is_none() && self.archived.is_none()
    }

    /// Apply to a refreshed conversation, dropping flags the server now agrees with.
    fn apply(&mut self, conversation: &mut Conversation) {
        fn settle(flag: &mut Option<bool>, server: &mut bool) {
            if let Some(local) = *flag {
                if local == *server {
                    *flag = None;
                } else {
                    *server = local;
                }
            }
        }
        settle(&mut self.pinned, &mut conversation.is_pinned);
        settle(&mut self.muted, &mut conversation.is_muted);
        settle(&mut self.archived, &mut conversation.is_archived);
    }
}

/// Message ids remembered per conversation for duplicate detection
pub const RECENT_MESSAGE_IDS: usize = 64;

/// What the user has read locally, since the backend keeps its own count.
///
/// `baseline` is the unread count that was cleared. A refreshed count is
/// reduced by it, so only messages the server counted after the read show
/// up. The mark is dropped once the server reports zero itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ReadMark {
    baseline: u32,
}

impl ReadMark {
    /// Apply to a refreshed conversation. Returns false once the mark is settled.
    fn apply(&self, conversation: &mut Conversation) -> bool {
        if conversation.unread_count == 0 {
            return false;
        }
        conversation.unread_count = conversation.unread_count.saturating_sub(self.baseline);
        true
    }
}

/// In-memory conversation list for one session
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    conversations: HashMap<String, Conversation>,
    overrides: HashMap<String, LocalFlags>,
    read_marks: HashMap<String, ReadMark>,
    recent_ids: HashMap<String, VecDeque<String>>,
    error_banner: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, chat_id: &str) -> Option<&Conversation> {
        self.conversations.get(chat_id)
    }

    /// User-visible error from the last failed load, if any
    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    /// Empty the list and show `message` with a manual retry affordance.
    pub fn set_load_error(&mut self, message: impl Into<String>) {
        self.conversations.clear();
        self.error_banner = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error_banner = None;
    }

    /// Replace the whole list with an authoritative snapshot.
    ///
    /// Invalid entries are dropped. When several entries share a contact id,
    /// the one with the most recent message wins. Local pin/mute/archive
    /// choices and read marks are re-applied on top. Returns the number of
    /// conversations kept.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) -> usize {
        let mut by_contact: HashMap<String, Conversation> = HashMap::new();
        for conversation in conversations {
            if let Err(e) = conversation.validate() {
                warn!(error = %e, "Dropping invalid conversation from snapshot");
                continue;
            }
            match by_contact.get(&conversation.contact.id) {
                Some(existing) if existing.last_message_time > conversation.last_message_time => {
                    debug!(
                        contact_id = %conversation.contact.id,
                        "Duplicate contact in snapshot, keeping most recent"
                    );
                }
                _ => {
                    by_contact.insert(conversation.contact.id.clone(), conversation);
                }
            }
        }

        self.conversations.clear();
        for (_, mut conversation) in by_contact {
            self.apply_local_state(&mut conversation);
            self.conversations.insert(conversation.id.clone(), conversation);
        }
        let conversations = &self.conversations;
        self.overrides.retain(|_, flags| !flags.is_empty());
        self.read_marks.retain(|id, _| conversations.contains_key(id));
        self.recent_ids.retain(|id, _| conversations.contains_key(id));
        self.error_banner = None;
        self.conversations.len()
    }

    fn apply_local_state(&mut self, conversation: &mut Conversation) {
        if let Some(flags) = self.overrides.get_mut(&conversation.id) {
            flags.apply(conversation);
        }
        let settled = self
            .read_marks
            .get(&conversation.id)
            .is_some_and(|mark| !mark.apply(conversation));
        if settled {
            debug!(chat_id = %conversation.id, "Server unread count caught up with local read");
            self.read_marks.remove(&conversation.id);
        }
        if let Some(last) = &conversation.last_message {
            remember(
                self.recent_ids.entry(conversation.id.clone()).or_default(),
                &last.id,
            );
        }
    }

    /// Insert or replace a single conversation, evicting any other
    /// conversation for the same contact.
    pub fn upsert(&mut self, mut conversation: Conversation) -> Result<()> {
        conversation.validate()?;
        let contact_id = conversation.contact.id.clone();
        let id = conversation.id.clone();
        self.conversations
            .retain(|key, existing| *key == id || existing.contact.id != contact_id);
        self.apply_local_state(&mut conversation);
        self.conversations.insert(id, conversation);
        Ok(())
    }

    /// Non-archived conversations, most recent first
    pub fn ordered(&self) -> Vec<&Conversation> {
        self.sorted(|c| !c.is_archived)
    }

    /// Archived conversations, most recent first
    pub fn archived(&self) -> Vec<&Conversation> {
        self.sorted(|c| c.is_archived)
    }

    fn sorted(&self, keep: impl Fn(&Conversation) -> bool) -> Vec<&Conversation> {
        let mut list: Vec<&Conversation> = self
            .conversations
            .values()
            .filter(|c| keep(*c))
            .collect();
        list.sort_by(|a, b| {
            b.last_message_time
                .cmp(&a.last_message_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Fold an incoming message into the conversation summary.
    ///
    /// The unread count grows only for messages not sent by us. Older
    /// messages (history, late echoes) never replace a newer summary. A
    /// message seen recently (a replay after reconnect) changes nothing.
    pub fn apply_incoming_message(&mut self, chat_id: &str, message: &Message) -> IncomingOutcome {
        let Some(conversation) = self.conversations.get_mut(chat_id) else {
            return IncomingOutcome::UnknownConversation;
        };
        let recent = self.recent_ids.entry(chat_id.to_string()).or_default();
        let is_last = conversation
            .last_message
            .as_ref()
            .is_some_and(|last| last.id == message.id);
        if is_last || recent.contains(&message.id) {
            return IncomingOutcome::Duplicate;
        }
        remember(recent, &message.id);

        if message.timestamp >= conversation.last_message_time {
            conversation.last_message = Some(message.clone());
            conversation.last_message_time = message.timestamp;
        }
        if !message.is_from_me {
            conversation.unread_count = conversation.unread_count.saturating_add(1);
        }
        IncomingOutcome::Applied
    }

    /// Zero the unread count. Returns whether anything changed.
    ///
    /// The read is remembered so later refreshes do not bring the count back.
    pub fn mark_read(&mut self, chat_id: &str) -> bool {
        match self.conversations.get_mut(chat_id) {
            Some(conversation) if conversation.unread_count > 0 => {
                let mark = self.read_marks.entry(chat_id.to_string()).or_default();
                mark.baseline = mark.baseline.saturating_add(conversation.unread_count);
                conversation.unread_count = 0;
                true
            }
            _ => false,
        }
    }

    /// Id of the conversation whose last message is `message_id`
    pub fn chat_with_last_message(&self, message_id: &str) -> Option<&str> {
        self.conversations
            .values()
            .find(|c| c.last_message.as_ref().is_some_and(|m| m.id == message_id))
            .map(|c| c.id.as_str())
    }

    /// Keep the summary's copy of the last message in step with the timeline.
    pub fn apply_last_message_status(
        &mut self,
        chat_id: &str,
        message_id: &str,
        status: MessageStatus,
    ) -> bool {
        self.conversations
            .get_mut(chat_id)
            .and_then(|c| c.last_message.as_mut())
            .filter(|last| last.id == message_id)
            .is_some_and(|last| last.advance_status(status))
    }

    /// Rename the summary's optimistic last message to its server id.
    pub fn reconcile_last_message(
        &mut self,
        chat_id: &str,
        temp_id: &str,
        server_id: &str,
        status: MessageStatus,
    ) -> bool {
        let Some(last) = self
            .conversations
            .get_mut(chat_id)
            .and_then(|c| c.last_message.as_mut())
            .filter(|last| last.id == temp_id)
        else {
            return false;
        };
        last.id = server_id.to_string();
        last.advance_status(status);
        remember(
            self.recent_ids.entry(chat_id.to_string()).or_default(),
            server_id,
        );
        true
    }

    /// Swap a failed optimistic last message for the server's copy of it.
    pub fn adopt_last_message(&mut self, chat_id: &str, temp_id: &str, message: &Message) -> bool {
        let Some(last) = self
            .conversations
            .get_mut(chat_id)
            .and_then(|c| c.last_message.as_mut())
            .filter(|last| last.id == temp_id)
        else {
            return false;
        };
        *last = message.clone();
        remember(
            self.recent_ids.entry(chat_id.to_string()).or_default(),
            &message.id,
        );
        true
    }

    pub fn set_pinned(&mut self, chat_id: &str, pinned: bool) -> Result<bool> {
        let conversation = self.get_mut_or_err(chat_id)?;
        let changed = conversation.is_pinned != pinned;
        conversation.is_pinned = pinned;
        self.overrides.entry(chat_id.to_string()).or_default().pinned = Some(pinned);
        Ok(changed)
    }

    pub fn set_muted(&mut self, chat_id: &str, muted: bool) -> Result<bool> {
        let conversation = self.get_mut_or_err(chat_id)?;
        let changed = conversation.is_muted != muted;
        conversation.is_muted = muted;
        self.overrides.entry(chat_id.to_string()).or_default().muted = Some(muted);
        Ok(changed)
    }

    pub fn set_archived(&mut self, chat_id: &str, archived: bool) -> Result<bool> {
        let conversation = self.get_mut_or_err(chat_id)?;
        let changed = conversation.is_archived != archived;
        conversation.is_archived = archived;
        self.overrides.entry(chat_id.to_string()).or_default().archived = Some(archived);
        Ok(changed)
    }

    fn get_mut_or_err(&mut self, chat_id: &str) -> Result<&mut Conversation> {
        self.conversations
            .get_mut(chat_id)
            .ok_or_else(|| InboxError::UnknownConversation(chat_id.to_string()).into())
    }
}

fn remember(recent: &mut VecDeque<String>, id: &str) {
    if recent.iter().any(|seen| seen == id) {
        return;
    }
    if recent.len() == RECENT_MESSAGE_IDS {
        recent.pop_front();
    }
    recent.push_back(id.to_string());
}
