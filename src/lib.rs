//! wa-inbox - real-time inbox synchronization engine
//!
//! This library keeps a client-side view of one WhatsApp business session
//! consistent with a remote backend: the conversation list, the timeline of
//! the open conversation, optimistic sends and contact presence.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `models`: Wire types (sessions, conversations, messages, contacts)
//! - `store`: The synchronous reducer holding all inbox state
//! - `session`: `InboxSession`, which drives the store from the backend, the push channel and polling
//! - `backend`: Backend REST API abstraction and its `reqwest` client
//! - `push`: Push channel transports (SSE, WebSocket) and event parsing
//! - `directory`: Cached session directory
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wa_inbox::backend::http::HttpBackend;
//! use wa_inbox::{Config, InboxSession, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let backend = Arc::new(HttpBackend::from_config(&config.backend)?);
//!     let inbox = InboxSession::new("sales", backend, SessionOptions::from(&config));
//!     for conversation in inbox.load_conversations().await {
//!         println!("{} ({} unread)", conversation.contact.display_name(), conversation.unread_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod push;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use directory::SessionDirectory;
pub use error::{InboxError, Result};
pub use session::{InboxSession, PendingSend, SendOutcome, SessionOptions};
pub use store::{InboxStore, InboxUpdate};

#[cfg(test)]
pub mod test_utils;
