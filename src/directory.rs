//! Cached session directory
//!
//! Sessions are owned by the external WhatsApp runtime. The directory keeps
//! a read-only copy of `GET /api/sessions`, answers lookups, and picks the
//! session an inbox should attach to. The only local mutation is a pushed
//! `session_status` change.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::backend::InboxBackend;
use crate::error::{InboxError, Result};
use crate::models::{Session, SessionStatus};

#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: Vec<Session>,
    fetched_at: Option<DateTime<Utc>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with the backend's current session list.
    ///
    /// On failure the previous cache is kept.
    pub async fn refresh(&mut self, backend: &dyn InboxBackend) -> Result<&[Session]> {
        let sessions = backend.list_sessions().await?;
        info!(count = sessions.len(), "Session directory refreshed");
        self.sessions = sessions;
        self.fetched_at = Some(Utc::now());
        Ok(&self.sessions)
    }

    pub fn list(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// When the cache was last filled, if ever
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Record a pushed status change. Returns whether anything changed.
    pub fn apply_status(&mut self, session_id: &str, status: SessionStatus) -> bool {
        match self.sessions.iter_mut().find(|s| s.id == session_id) {
            Some(session) if session.status != status => {
                debug!(session_id, from = %session.status, to = %status, "Session status changed");
                session.status = status;
                true
            }
            Some(_) => false,
            None => {
                debug!(session_id, %status, "Status for a session not in the directory");
                false
            }
        }
    }

    /// The session to attach to.
    ///
    /// An explicit `preferred` id must exist. Without one, the first ready
    /// session wins.
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::UnknownSession`] if `preferred` is not listed or
    /// no session is ready.
    pub fn resolve(&self, preferred: Option<&str>) -> Result<&Session> {
        match preferred {
            Some(id) => self
                .get(id)
                .ok_or_else(|| InboxError::UnknownSession(id.to_string()).into()),
            None => self
                .sessions
                .iter()
                .find(|s| s.is_ready())
                .ok_or_else(|| InboxError::UnknownSession("no ready session".to_string()).into()),
        }
    }
}
