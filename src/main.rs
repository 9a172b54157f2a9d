//! wa-inbox - WhatsApp inbox sync client
//!
#![doc = "Main entry point for the wa-inbox command-line client."]

use anyhow::Result;
use clap::Parser;

use wa_inbox::cli::{Cli, Commands};
use wa_inbox::commands;
use wa_inbox::config::Config;
use wa_inbox::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load and validate configuration
    let config_path = cli.config.as_deref().unwrap_or("config/inbox.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    init_logging(&config.logging)?;
    tracing::debug!(base_url = %config.backend.base_url, "Configuration loaded");

    // Execute command
    match cli.command {
        Commands::Sessions => {
            commands::inbox::list_sessions(&config).await?;
        }
        Commands::Chats { archived } => {
            commands::inbox::list_chats(&config, archived).await?;
        }
        Commands::Messages { chat_id, limit } => {
            commands::inbox::show_messages(&config, &chat_id, limit).await?;
        }
        Commands::Send {
            chat_id,
            content,
            file,
            reply_to,
        } => {
            tracing::info!(chat_id = %chat_id, media = file.is_some(), "Sending message");
            commands::send::send_message(&config, &chat_id, content, file, reply_to).await?;
        }
        Commands::Watch { chat } => {
            tracing::info!("Starting watch mode");
            commands::watch::run_watch(&config, chat).await?;
        }
    }
    Ok(())
}
