//! Configuration management for wa-inbox
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{InboxError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for wa-inbox
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// working configuration pointing at a local backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Push channel settings
    #[serde(default)]
    pub push: PushConfig,
    /// Inbox behaviour (session, polling, typing decay)
    #[serde(default)]
    pub inbox: InboxConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://localhost:3001`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for read requests (sessions, chats, messages)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Timeout for a single send; on expiry the message is marked failed
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_send_timeout() -> u64 {
    20
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            send_timeout_seconds: default_send_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

/// Push transport selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PushTransportKind {
    /// Server-sent events from the backend's session event stream
    #[default]
    Sse,
    /// WebSocket at `push.websocket_url`
    WebSocket,
    /// No push channel; rely on polling only
    None,
}

impl std::str::FromStr for PushTransportKind {
    type Err = InboxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sse" => Ok(PushTransportKind::Sse),
            "websocket" | "ws" => Ok(PushTransportKind::WebSocket),
            "none" | "off" => Ok(PushTransportKind::None),
            other => Err(InboxError::Config(format!(
                "Invalid push transport: {}. Must be one of: sse, websocket, none",
                other
            ))),
        }
    }
}

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub transport: PushTransportKind,

    /// WebSocket endpoint, required when `transport` is `websocket`
    #[serde(default)]
    pub websocket_url: Option<String>,

    /// Delay before reconnecting a dropped push connection
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_seconds: u64,
}

fn default_reconnect_delay() -> u64 {
    5
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            transport: PushTransportKind::default(),
            websocket_url: None,
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

impl PushConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }
}

/// Inbox behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    /// Session to open when none is given on the command line
    #[serde(default)]
    pub session_id: Option<String>,

    /// Interval between authoritative conversation list refreshes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// How long a typing indicator lasts without a repeat event
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_timeout_ms: u64,

    /// Capacity of the update broadcast channel
    #[serde(default = "default_update_capacity")]
    pub update_channel_capacity: usize,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_typing_timeout_ms() -> u64 {
    3000
}

fn default_update_capacity() -> usize {
    256
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            poll_interval_seconds: default_poll_interval(),
            typing_timeout_ms: default_typing_timeout_ms(),
            update_channel_capacity: default_update_capacity(),
        }
    }
}

impl InboxConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (e.g. `wa_inbox=info`); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default)]
    pub json_format: bool,

    /// Log file path (if None, STDERR only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "wa_inbox=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InboxError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| InboxError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("WA_INBOX_BASE_URL") {
            self.backend.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("WA_INBOX_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid WA_INBOX_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("WA_INBOX_SEND_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.send_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid WA_INBOX_SEND_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(transport) = std::env::var("WA_INBOX_PUSH_TRANSPORT") {
            match transport.parse() {
                Ok(kind) => self.push.transport = kind,
                Err(e) => tracing::warn!("Ignoring WA_INBOX_PUSH_TRANSPORT: {}", e),
            }
        }

        if let Ok(url) = std::env::var("WA_INBOX_WEBSOCKET_URL") {
            self.push.websocket_url = Some(url);
        }

        if let Ok(session_id) = std::env::var("WA_INBOX_SESSION_ID") {
            self.inbox.session_id = Some(session_id);
        }

        if let Ok(interval) = std::env::var("WA_INBOX_POLL_INTERVAL_SECONDS") {
            if let Ok(value) = interval.parse() {
                self.inbox.poll_interval_seconds = value;
            } else {
                tracing::warn!("Invalid WA_INBOX_POLL_INTERVAL_SECONDS: {}", interval);
            }
        }

        if let Ok(typing) = std::env::var("WA_INBOX_TYPING_TIMEOUT_MS") {
            if let Ok(value) = typing.parse() {
                self.inbox.typing_timeout_ms = value;
            } else {
                tracing::warn!("Invalid WA_INBOX_TYPING_TIMEOUT_MS: {}", typing);
            }
        }

        if let Ok(level) = std::env::var("WA_INBOX_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("WA_INBOX_JSON_LOGS") {
            self.logging.json_format = matches!(
                json_logs.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(log_file) = std::env::var("WA_INBOX_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(log_file));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.backend.base_url = base_url.clone();
        }
        if let Some(session) = &cli.session {
            self.inbox.session_id = Some(session.clone());
        }
        if cli.verbose {
            self.logging.level = "wa_inbox=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`InboxError::Config`] naming the first offending field
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.backend.base_url).map_err(|e| {
            InboxError::Config(format!(
                "backend.base_url is not a valid URL ({}): {}",
                self.backend.base_url, e
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(InboxError::Config(format!(
                "backend.base_url must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        if self.backend.request_timeout_seconds == 0 {
            return Err(InboxError::Config(
                "backend.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.backend.send_timeout_seconds == 0 {
            return Err(InboxError::Config(
                "backend.send_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.push.transport == PushTransportKind::WebSocket {
            let Some(ws) = &self.push.websocket_url else {
                return Err(InboxError::Config(
                    "push.websocket_url is required when push.transport is websocket".to_string(),
                )
                .into());
            };
            let ws = url::Url::parse(ws).map_err(|e| {
                InboxError::Config(format!("push.websocket_url is not a valid URL: {}", e))
            })?;
            if !matches!(ws.scheme(), "ws" | "wss") {
                return Err(InboxError::Config(format!(
                    "push.websocket_url must use ws or wss, got {}",
                    ws.scheme()
                ))
                .into());
            }
        }

        if self.push.reconnect_delay_seconds == 0 {
            return Err(InboxError::Config(
                "push.reconnect_delay_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.inbox.poll_interval_seconds == 0 {
            return Err(InboxError::Config(
                "inbox.poll_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.inbox.typing_timeout_ms == 0 {
            return Err(InboxError::Config(
                "inbox.typing_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.inbox.update_channel_capacity == 0 {
            return Err(InboxError::Config(
                "inbox.update_channel_capacity must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(session_id) = &self.inbox.session_id {
            if session_id.trim().is_empty() {
                return Err(
                    InboxError::Config("inbox.session_id cannot be empty".to_string()).into(),
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_error_contains, create_test_file, temp_dir, test_cli};
    use serial_test::serial;

    const ENV_VARS: [&str; 11] = [
        "WA_INBOX_BASE_URL",
        "WA_INBOX_REQUEST_TIMEOUT_SECONDS",
        "WA_INBOX_SEND_TIMEOUT_SECONDS",
        "WA_INBOX_PUSH_TRANSPORT",
        "WA_INBOX_WEBSOCKET_URL",
        "WA_INBOX_SESSION_ID",
        "WA_INBOX_POLL_INTERVAL_SECONDS",
        "WA_INBOX_TYPING_TIMEOUT_MS",
        "WA_INBOX_LOG_LEVEL",
        "WA_INBOX_JSON_LOGS",
        "WA_INBOX_LOG_FILE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:3001");
        assert_eq!(config.backend.send_timeout(), Duration::from_secs(20));
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.push.transport, PushTransportKind::Sse);
        assert_eq!(config.push.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.inbox.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.inbox.typing_timeout(), Duration::from_millis(3000));
        assert_eq!(config.logging.level, "wa_inbox=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
backend:
  base_url: https://inbox.example.com
  send_timeout_seconds: 30
push:
  transport: websocket
  websocket_url: wss://inbox.example.com/ws
inbox:
  session_id: sales
  typing_timeout_ms: 5000
logging:
  json_format: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.backend.base_url, "https://inbox.example.com");
        assert_eq!(config.backend.send_timeout_seconds, 30);
        assert_eq!(config.backend.request_timeout_seconds, 15);
        assert_eq!(config.push.transport, PushTransportKind::WebSocket);
        assert_eq!(config.inbox.session_id.as_deref(), Some("sales"));
        assert_eq!(config.inbox.poll_interval_seconds, 5);
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.inbox.typing_timeout_ms, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.backend.send_timeout_seconds = 0;
        assert_error_contains(config.validate(), "send_timeout_seconds");

        let mut config = Config::default();
        config.backend.request_timeout_seconds = 0;
        assert_error_contains(config.validate(), "request_timeout_seconds");

        let mut config = Config::default();
        config.inbox.typing_timeout_ms = 0;
        assert_error_contains(config.validate(), "typing_timeout_ms");

        let mut config = Config::default();
        config.inbox.poll_interval_seconds = 0;
        assert_error_contains(config.validate(), "poll_interval_seconds");
    }

    #[test]
    fn test_validation_rejects_bad_urls() {
        let mut config = Config::default();
        config.backend.base_url = "not a url".to_string();
        assert_error_contains(config.validate(), "base_url");

        config.backend.base_url = "ftp://example.com".to_string();
        assert_error_contains(config.validate(), "http or https");
    }

    #[test]
    fn test_websocket_transport_requires_url() {
        let mut config = Config::default();
        config.push.transport = PushTransportKind::WebSocket;
        assert_error_contains(config.validate(), "websocket_url is required");

        config.push.websocket_url = Some("http://example.com/ws".to_string());
        assert_error_contains(config.validate(), "ws or wss");

        config.push.websocket_url = Some("ws://localhost:3001/ws".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_push_transport_from_str() {
        assert_eq!(
            "WebSocket".parse::<PushTransportKind>().unwrap(),
            PushTransportKind::WebSocket
        );
        assert_eq!(
            "off".parse::<PushTransportKind>().unwrap(),
            PushTransportKind::None
        );
        assert!("carrier-pigeon".parse::<PushTransportKind>().is_err());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        clear_env();
        let config = Config::load("nonexistent.yaml", &test_cli()).unwrap();
        assert_eq!(config.backend.base_url, "http://localhost:3001");
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let dir = temp_dir();
        let path = create_test_file(
            &dir,
            "inbox.yaml",
            "backend:\n  base_url: http://10.0.0.5:3001\ninbox:\n  session_id: support\n",
        );
        let config = Config::load(path.to_str().unwrap(), &test_cli()).unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.5:3001");
        assert_eq!(config.inbox.session_id.as_deref(), Some("support"));
    }

    #[test]
    #[serial]
    fn test_load_rejects_malformed_file() {
        clear_env();
        let dir = temp_dir();
        let path = create_test_file(&dir, "bad.yaml", "backend: [unclosed");
        let err = Config::load(path.to_str().unwrap(), &test_cli()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("WA_INBOX_BASE_URL", "http://backend:9000");
        std::env::set_var("WA_INBOX_SEND_TIMEOUT_SECONDS", "7");
        std::env::set_var("WA_INBOX_PUSH_TRANSPORT", "none");
        std::env::set_var("WA_INBOX_TYPING_TIMEOUT_MS", "oops");
        std::env::set_var("WA_INBOX_JSON_LOGS", "true");

        let config = Config::load("nonexistent.yaml", &test_cli()).unwrap();
        clear_env();

        assert_eq!(config.backend.base_url, "http://backend:9000");
        assert_eq!(config.backend.send_timeout_seconds, 7);
        assert_eq!(config.push.transport, PushTransportKind::None);
        assert_eq!(config.inbox.typing_timeout_ms, 3000, "invalid value ignored");
        assert!(config.logging.json_format);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        clear_env();
        std::env::set_var("WA_INBOX_SESSION_ID", "from-env");
        let mut cli = test_cli();
        cli.session = Some("from-cli".to_string());
        cli.verbose = true;

        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        clear_env();

        assert_eq!(config.inbox.session_id.as_deref(), Some("from-cli"));
        assert_eq!(config.logging.level, "wa_inbox=debug");
    }

    #[test]
    fn test_example_config_parses() {
        let contents = std::fs::read_to_string("config/inbox.yaml")
            .expect("Failed to read example config/inbox.yaml");
        let config: Config =
            serde_yaml::from_str(&contents).expect("Failed to parse config/inbox.yaml");
        assert!(config.validate().is_ok());
        assert_eq!(config.push.transport, PushTransportKind::Sse);
    }
}
