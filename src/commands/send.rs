//! `wa-inbox send`: one message through the optimistic pipeline

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::{connect, resolve_session};
use crate::config::Config;
use crate::error::{InboxError, Result};
use crate::session::{InboxSession, PendingSend, SendOutcome, SessionOptions};

/// Send `content` (or `file` with `content` as caption) to `chat_id` and
/// wait for the backend's answer.
pub async fn send_message(
    config: &Config,
    chat_id: &str,
    content: Option<String>,
    file: Option<PathBuf>,
    reply_to: Option<String>,
) -> Result<()> {
    if content.is_none() && file.is_none() {
        return Err(InboxError::InvalidPayload(
            "nothing to send: give message text or --file".to_string(),
        )
        .into());
    }

    let backend = connect(config)?;
    let session = resolve_session(config, backend.as_ref()).await?;
    let inbox = InboxSession::new(session.id, backend, SessionOptions::from(config));
    inbox.load_conversations().await;
    inbox.select_conversation(chat_id).await?;

    let pending = match file {
        Some(path) => {
            let (file_name, bytes) = read_media(&path).await?;
            if reply_to.is_some() {
                tracing::warn!("--reply-to is ignored for media sends");
            }
            inbox.send_media(file_name, bytes, content).await?
        }
        None => {
            let text = content.unwrap_or_default();
            inbox.send(&text, reply_to).await?
        }
    };

    report(pending).await
}

async fn read_media(path: &Path) -> Result<(String, bytes::Bytes)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| InboxError::Config(format!("{} is not a file", path.display())))?;
    let bytes = tokio::fs::read(path).await?;
    Ok((file_name, bytes::Bytes::from(bytes)))
}

async fn report(pending: PendingSend) -> Result<()> {
    println!("{} {}", "sending".dimmed(), pending.temp_id());
    match pending.outcome().await {
        SendOutcome::Sent { message_id } => {
            println!("{} {}", "sent".green(), message_id);
            Ok(())
        }
        SendOutcome::Failed { reason } => {
            println!("{} {}", "failed".red(), reason);
            Err(InboxError::Transport(format!("message not sent: {}", reason)).into())
        }
        SendOutcome::Cancelled => Err(InboxError::Cancelled("send".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_file, temp_dir};

    #[tokio::test]
    async fn test_send_requires_content_or_file() {
        let result = send_message(&Config::default(), "a", None, None, None).await;
        crate::test_utils::assert_error_contains(result, "nothing to send");
    }

    #[tokio::test]
    async fn test_read_media_uses_file_name() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "photo.jpg", "not really a jpeg");
        let (name, bytes) = read_media(&path).await.unwrap();
        assert_eq!(name, "photo.jpg");
        assert_eq!(bytes.len(), 17);
    }

    #[tokio::test]
    async fn test_read_media_missing_file() {
        let dir = temp_dir();
        assert!(read_media(&dir.path().join("missing.png")).await.is_err());
    }
}
