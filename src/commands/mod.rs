//! Command handlers for the wa-inbox CLI
//!
//! Each subcommand builds an [`HttpBackend`] from the loaded configuration,
//! resolves the session to work on through the [`SessionDirectory`], and
//! prints its result to stdout. Logs go to stderr.

use std::sync::Arc;

use chrono::{Local, TimeZone};
use colored::{ColoredString, Colorize};

use crate::backend::http::HttpBackend;
use crate::backend::InboxBackend;
use crate::config::Config;
use crate::directory::SessionDirectory;
use crate::error::Result;
use crate::models::{MessageStatus, Session, SessionStatus};

pub mod inbox;
pub mod send;
pub mod watch;

/// Backend client for `config`
pub fn connect(config: &Config) -> Result<Arc<dyn InboxBackend>> {
    Ok(Arc::new(HttpBackend::from_config(&config.backend)?))
}

/// Resolve the session to attach to: `inbox.session_id` if configured,
/// otherwise the first ready session.
pub async fn resolve_session(config: &Config, backend: &dyn InboxBackend) -> Result<Session> {
    let mut directory = SessionDirectory::new();
    directory.refresh(backend).await?;
    let session = directory
        .resolve(config.inbox.session_id.as_deref())?
        .clone();
    if !session.is_ready() {
        tracing::warn!(
            session_id = %session.id,
            status = %session.status,
            "Session is not ready; sends will be rejected"
        );
    }
    Ok(session)
}

/// Local time of a millisecond timestamp, `-` when out of range
pub(crate) fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}

pub(crate) fn colored_session_status(status: SessionStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        SessionStatus::Ready => label.green(),
        SessionStatus::Initializing | SessionStatus::QrCode => label.yellow(),
        SessionStatus::Disconnected | SessionStatus::AuthFailure => label.red(),
    }
}

pub(crate) fn colored_message_status(status: MessageStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        MessageStatus::Sending => label.dimmed(),
        MessageStatus::Sent | MessageStatus::Delivered => label.normal(),
        MessageStatus::Read => label.blue(),
        MessageStatus::Failed => label.red(),
    }
}
