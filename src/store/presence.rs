//! Presence and typing tracker
//!
//! Typing indicators decay: each `on_typing` sets a deadline
//! `typing_timeout` in the future, and a repeated event for the same contact
//! moves that deadline (debounce, not accumulation). Expiry is explicit via
//! [`PresenceTracker::expire`], which the session loop calls when the next
//! deadline passes. Online status never decays; only an explicit offline
//! event clears it.
//!
//! Time is passed in by the caller as a [`tokio::time::Instant`] so that the
//! decay can be driven by a paused Tokio clock in tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{now_millis, Contact};

/// Default typing decay observed in the WhatsApp clients
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct PresenceTracker {
    typing_timeout: Duration,
    typing: HashMap<String, Instant>,
    online: HashSet<String>,
    last_seen: HashMap<String, i64>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TIMEOUT)
    }
}

impl PresenceTracker {
    pub fn new(typing_timeout: Duration) -> Self {
        Self {
            typing_timeout,
            typing: HashMap::new(),
            online: HashSet::new(),
            last_seen: HashMap::new(),
        }
    }

    pub fn typing_timeout(&self) -> Duration {
        self.typing_timeout
    }

    /// Record a typing event. Returns true if the contact was not typing before.
    pub fn on_typing(&mut self, contact_id: &str, now: Instant) -> bool {
        let was_typing = self.is_typing(contact_id, now);
        self.typing
            .insert(contact_id.to_string(), now + self.typing_timeout);
        !was_typing
    }

    /// Clear the typing flag immediately (explicit stop, or a message arrived).
    pub fn stop_typing(&mut self, contact_id: &str) -> bool {
        self.typing.remove(contact_id).is_some()
    }

    /// Record an online/offline event. Returns whether the online state changed.
    ///
    /// Going offline stamps `last_seen` with `last_seen` from the payload, or
    /// the current wall-clock time when the payload has none.
    pub fn on_presence(&mut self, contact_id: &str, is_online: bool, last_seen: Option<i64>) -> bool {
        if is_online {
            self.online.insert(contact_id.to_string())
        } else {
            self.last_seen
                .insert(contact_id.to_string(), last_seen.unwrap_or_else(now_millis));
            self.typing.remove(contact_id);
            self.online.remove(contact_id)
        }
    }

    pub fn is_typing(&self, contact_id: &str, now: Instant) -> bool {
        self.typing
            .get(contact_id)
            .is_some_and(|deadline| *deadline > now)
    }

    pub fn is_online(&self, contact_id: &str) -> bool {
        self.online.contains(contact_id)
    }

    pub fn last_seen(&self, contact_id: &str) -> Option<i64> {
        self.last_seen.get(contact_id).copied()
    }

    /// Contacts currently typing, sorted by id
    pub fn typing_contacts(&self, now: Instant) -> Vec<String> {
        let mut ids: Vec<String> = self
            .typing
            .iter()
            .filter(|(_, deadline)| **deadline > now)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Earliest pending typing deadline, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.typing.values().min().copied()
    }

    /// Drop typing entries whose deadline has passed; returns their ids sorted.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let mut expired: Vec<String> = self
            .typing
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.typing.remove(id);
        }
        expired.sort();
        expired
    }

    /// Copy of `contact` with the derived presence flags filled in
    pub fn contact_view(&self, contact: &Contact, now: Instant) -> Contact {
        let mut view = contact.clone();
        view.is_online = self.is_online(&contact.id);
        view.is_typing = self.is_typing(&contact.id, now);
        if let Some(seen) = self.last_seen(&contact.id) {
            view.last_seen = Some(seen);
        }
        view
    }

    pub fn clear(&mut self) {
        self.typing.clear();
        self.online.clear();
        self.last_seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(3000);

    #[test]
    fn test_typing_clears_after_timeout() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        assert!(tracker.on_typing("alice", t0));

        assert!(tracker.is_typing("alice", t0 + Duration::from_millis(2999)));
        assert!(!tracker.is_typing("alice", t0 + TIMEOUT));
        assert_eq!(tracker.expire(t0 + TIMEOUT), vec!["alice".to_string()]);
        assert!(tracker.next_deadline().is_none());
    }

    #[test]
    fn test_repeated_typing_restarts_deadline() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        tracker.on_typing("alice", t0);
        let t1 = t0 + Duration::from_millis(2000);
        assert!(!tracker.on_typing("alice", t1), "already typing");

        // Would have expired at t0 + 3000 without the second event.
        assert!(tracker.expire(t0 + Duration::from_millis(3500)).is_empty());
        assert!(tracker.is_typing("alice", t0 + Duration::from_millis(4999)));
        assert_eq!(tracker.next_deadline(), Some(t1 + TIMEOUT));
        assert_eq!(tracker.expire(t1 + TIMEOUT), vec!["alice".to_string()]);
    }

    #[test]
    fn test_debounce_does_not_accumulate() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        for _ in 0..10 {
            tracker.on_typing("alice", t0);
        }
        assert_eq!(tracker.next_deadline(), Some(t0 + TIMEOUT));
    }

    #[test]
    fn test_expire_only_elapsed_entries() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        tracker.on_typing("alice", t0);
        tracker.on_typing("bob", t0 + Duration::from_millis(1000));

        assert_eq!(tracker.expire(t0 + TIMEOUT), vec!["alice".to_string()]);
        assert_eq!(
            tracker.typing_contacts(t0 + TIMEOUT),
            vec!["bob".to_string()]
        );
    }

    #[test]
    fn test_presence_has_no_decay() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        assert!(tracker.on_presence("alice", true, None));
        assert!(!tracker.on_presence("alice", true, None));
        let later = Instant::now() + Duration::from_secs(3600);
        tracker.expire(later);
        assert!(tracker.is_online("alice"));
    }

    #[test]
    fn test_offline_records_last_seen() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        tracker.on_presence("alice", true, None);
        assert!(tracker.on_presence("alice", false, Some(1234)));
        assert!(!tracker.is_online("alice"));
        assert_eq!(tracker.last_seen("alice"), Some(1234));

        let before = now_millis();
        tracker.on_presence("bob", false, None);
        assert!(tracker.last_seen("bob").unwrap() >= before);
    }

    #[test]
    fn test_stop_typing_clears_immediately() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        tracker.on_typing("alice", t0);
        assert!(tracker.stop_typing("alice"));
        assert!(!tracker.is_typing("alice", t0));
        assert!(!tracker.stop_typing("alice"));
    }

    #[test]
    fn test_contact_view_fills_derived_flags() {
        let mut tracker = PresenceTracker::new(TIMEOUT);
        let t0 = Instant::now();
        tracker.on_presence("alice", true, None);
        tracker.on_typing("alice", t0);

        let mut contact = Contact::new("alice", "Alice");
        contact.is_typing = false;
        let view = tracker.contact_view(&contact, t0);
        assert!(view.is_online);
        assert!(view.is_typing);

        let view = tracker.contact_view(&contact, t0 + TIMEOUT);
        assert!(!view.is_typing);
    }
}
