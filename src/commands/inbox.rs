//! Read-only listings: sessions, conversations and message history

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::commands::{
    colored_message_status, colored_session_status, connect, format_timestamp, resolve_session,
    truncate,
};
use crate::config::Config;
use crate::directory::SessionDirectory;
use crate::error::{InboxError, Result};
use crate::models::{Conversation, Message};
use crate::session::{InboxSession, SessionOptions};

/// `wa-inbox sessions`
pub async fn list_sessions(config: &Config) -> Result<()> {
    let backend = connect(config)?;
    let mut directory = SessionDirectory::new();
    let sessions = directory.refresh(backend.as_ref()).await?;

    if sessions.is_empty() {
        println!("{}", "No sessions found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["ID".bold(), "Name".bold(), "Status".bold(), "Phone".bold()]);
    for session in sessions {
        table.add_row(row![
            session.id.cyan(),
            session.name,
            colored_session_status(session.status),
            session.phone_number.as_deref().unwrap_or("-")
        ]);
    }

    println!("\nSessions:");
    table.printstd();
    println!();
    Ok(())
}

/// `wa-inbox chats`
pub async fn list_chats(config: &Config, archived: bool) -> Result<()> {
    let backend = connect(config)?;
    let session = resolve_session(config, backend.as_ref()).await?;
    let inbox = InboxSession::new(session.id.clone(), backend, SessionOptions::from(config));

    inbox.load_conversations().await;
    if let Some(banner) = inbox.error_banner().await {
        eprintln!("Run the command again to retry.");
        return Err(InboxError::Transport(banner).into());
    }

    let conversations = if archived {
        inbox.archived_conversations().await
    } else {
        inbox.conversations().await
    };
    if conversations.is_empty() {
        println!("{}", "No conversations.".yellow());
        return Ok(());
    }

    println!("\nConversations in {}:", session.name.bold());
    conversation_table(&conversations).printstd();
    println!();
    Ok(())
}

fn conversation_table(conversations: &[Conversation]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "Chat".bold(),
        "Contact".bold(),
        "Last Message".bold(),
        "When".bold(),
        "Unread".bold()
    ]);

    for conversation in conversations {
        let mut name = conversation.contact.display_name().to_string();
        if conversation.is_pinned {
            name.push_str(" (pinned)");
        }
        if conversation.is_muted {
            name.push_str(" (muted)");
        }
        let unread = if conversation.unread_count > 0 {
            conversation.unread_count.to_string().green().bold()
        } else {
            "-".normal()
        };
        table.add_row(row![
            conversation.id.cyan(),
            name,
            truncate(conversation.preview(), 40),
            format_timestamp(conversation.last_message_time),
            unread
        ]);
    }
    table
}

/// `wa-inbox messages <chat>`
pub async fn show_messages(config: &Config, chat_id: &str, limit: usize) -> Result<()> {
    let backend = connect(config)?;
    let session = resolve_session(config, backend.as_ref()).await?;
    let inbox = InboxSession::new(session.id, backend, SessionOptions::from(config));

    inbox.load_conversations().await;
    inbox.select_conversation(chat_id).await?;
    let timeline = inbox.timeline().await;
    if timeline.is_empty() {
        println!("{}", "No messages.".yellow());
        return Ok(());
    }

    let skip = timeline.len().saturating_sub(limit);
    for message in &timeline[skip..] {
        println!("{}", render_message(message));
    }
    Ok(())
}

pub(crate) fn render_message(message: &Message) -> String {
    let who = if message.is_from_me {
        "me".blue().bold()
    } else {
        "them".normal()
    };
    let mut body = message.content.clone();
    if let Some(url) = &message.media_url {
        body = format!("[{}] {} {}", message.message_type, url, body);
    }
    let status = if message.is_from_me {
        format!(" [{}]", colored_message_status(message.status))
    } else {
        String::new()
    };
    format!(
        "{} {:>4}: {}{}",
        format_timestamp(message.timestamp).dimmed(),
        who,
        body.trim_end(),
        status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageStatus;
    use crate::test_utils::{conversation, incoming_message};

    #[test]
    fn test_render_message_marks_own_status() {
        colored::control::set_override(false);
        let mut message = incoming_message("m1", 1_700_000_000_000);
        message.content = "hello".to_string();
        assert!(!render_message(&message).contains('['));

        message.is_from_me = true;
        message.status = MessageStatus::Read;
        let line = render_message(&message);
        assert!(line.contains("me"));
        assert!(line.ends_with("hello [read]"));
    }

    #[test]
    fn test_conversation_table_has_row_per_chat() {
        let table = conversation_table(&[conversation("a", 1000, 3), conversation("b", 500, 0)]);
        assert_eq!(table.len(), 3);
    }
}
