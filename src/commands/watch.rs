//! `wa-inbox watch`: follow the push channel and print inbox updates
//!
//! Runs until Ctrl-C. With `--chat`, the conversation is opened and new
//! messages and status changes in it are printed as they arrive.

use std::collections::HashSet;

use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;

use crate::commands::inbox::render_message;
use crate::commands::{colored_message_status, colored_session_status, connect};
use crate::config::Config;
use crate::directory::SessionDirectory;
use crate::error::Result;
use crate::push::channel_from_config;
use crate::session::{InboxSession, SessionOptions};
use crate::store::InboxUpdate;

pub async fn run_watch(config: &Config, chat: Option<String>) -> Result<()> {
    let backend = connect(config)?;
    let mut directory = SessionDirectory::new();
    directory.refresh(backend.as_ref()).await?;
    let session = directory
        .resolve(config.inbox.session_id.as_deref())?
        .clone();

    let mut inbox = InboxSession::new(session.id.clone(), backend, SessionOptions::from(config));
    let mut updates = inbox.subscribe();

    let conversations = inbox.load_conversations().await;
    if let Some(banner) = inbox.error_banner().await {
        println!("{}", banner.red());
    }
    let unread: u32 = conversations.iter().map(|c| c.unread_count).sum();
    println!(
        "Watching {} ({}) - {} conversations, {} unread. Ctrl-C to stop.",
        session.name.bold(),
        colored_session_status(session.status),
        conversations.len(),
        unread
    );

    let mut printed: HashSet<String> = HashSet::new();
    if let Some(chat_id) = &chat {
        inbox.select_conversation(chat_id).await?;
        for message in inbox.timeline().await {
            println!("{}", render_message(&message));
            printed.insert(message.id);
        }
    }

    let channel = channel_from_config(config, &session.id)?;
    if channel.is_none() {
        println!("{}", "Push disabled, polling only.".yellow());
    }
    inbox.start(channel);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(update) => {
                    print_update(&inbox, &mut directory, &mut printed, update).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Watcher fell behind, some updates were skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    inbox.shutdown().await;
    Ok(())
}

async fn print_update(
    inbox: &InboxSession,
    directory: &mut SessionDirectory,
    printed: &mut HashSet<String>,
    update: InboxUpdate,
) {
    match update {
        InboxUpdate::TimelineChanged { .. } => {
            for message in inbox.timeline().await {
                if message.is_temporary() || printed.contains(&message.id) {
                    continue;
                }
                println!("{}", render_message(&message));
                printed.insert(message.id);
            }
        }
        InboxUpdate::MessageStatusChanged {
            message_id, status, ..
        } => {
            println!("  {} -> {}", message_id.dimmed(), colored_message_status(status));
        }
        InboxUpdate::PresenceChanged { contact_id } => {
            let typing = inbox.typing_contacts().await;
            if typing.contains(&contact_id) {
                println!("  {} is typing...", contact_id.cyan());
            }
        }
        InboxUpdate::SessionStatusChanged { session_id, status } => {
            if directory.apply_status(&session_id, status) {
                println!("Session {} is now {}", session_id.bold(), colored_session_status(status));
            }
        }
        InboxUpdate::Error(message) => println!("{}", message.red()),
        InboxUpdate::ConversationsChanged | InboxUpdate::RefreshRequested => {}
    }
}
