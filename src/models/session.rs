use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a WhatsApp session, owned by the external runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    QrCode,
    Ready,
    Disconnected,
    AuthFailure,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::QrCode => "qr_code",
            SessionStatus::Ready => "ready",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::AuthFailure => "auth_failure",
        };
        f.write_str(s)
    }
}

/// Read-only cached copy of a session from the session directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Session {
    /// Only ready sessions can send messages
    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }
}
