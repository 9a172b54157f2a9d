//! Command-line interface definition for wa-inbox
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wa-inbox - WhatsApp inbox sync client
///
/// Lists sessions, conversations and messages from a WhatsApp backend,
/// sends messages through the optimistic pipeline and follows the live
/// push channel.
#[derive(Parser, Debug, Clone)]
#[command(name = "wa-inbox")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/inbox.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Session to operate on (defaults to inbox.session_id, then the first ready session)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List sessions known to the backend
    Sessions,

    /// List conversations of the session
    Chats {
        /// Show archived conversations instead of the inbox
        #[arg(long)]
        archived: bool,
    },

    /// Show the message timeline of a conversation
    Messages {
        /// Conversation id
        chat_id: String,

        /// Only show the last N messages
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Send a text or media message
    Send {
        /// Conversation id
        chat_id: String,

        /// Text to send (the caption when --file is given)
        content: Option<String>,

        /// Send this file as media
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Id of the message being replied to
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// Follow the push channel and print inbox updates
    Watch {
        /// Open this conversation and print its timeline changes too
        #[arg(long)]
        chat: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_sessions() {
        let cli = Cli::try_parse_from(["wa-inbox", "sessions"]).unwrap();
        assert!(matches!(cli.command, Commands::Sessions));
        assert_eq!(cli.config.as_deref(), Some("config/inbox.yaml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "wa-inbox",
            "-v",
            "--base-url",
            "http://backend:3001",
            "--session",
            "sales",
            "chats",
            "--archived",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.base_url.as_deref(), Some("http://backend:3001"));
        assert_eq!(cli.session.as_deref(), Some("sales"));
        assert!(matches!(cli.command, Commands::Chats { archived: true }));
    }

    #[test]
    fn test_cli_parse_messages_default_limit() {
        let cli = Cli::try_parse_from(["wa-inbox", "messages", "15550001@c.us"]).unwrap();
        match cli.command {
            Commands::Messages { chat_id, limit } => {
                assert_eq!(chat_id, "15550001@c.us");
                assert_eq!(limit, 50);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_send_media() {
        let cli = Cli::try_parse_from([
            "wa-inbox",
            "send",
            "15550001@c.us",
            "look at this",
            "--file",
            "photo.jpg",
        ])
        .unwrap();
        match cli.command {
            Commands::Send {
                content,
                file,
                reply_to,
                ..
            } => {
                assert_eq!(content.as_deref(), Some("look at this"));
                assert_eq!(file, Some(PathBuf::from("photo.jpg")));
                assert!(reply_to.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_watch() {
        let cli = Cli::try_parse_from(["wa-inbox", "watch", "--chat", "abc"]).unwrap();
        assert!(matches!(cli.command, Commands::Watch { chat: Some(ref c) } if c == "abc"));
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["wa-inbox"]).is_err());
    }
}
