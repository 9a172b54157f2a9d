use serde::{Deserialize, Serialize};

/// A WhatsApp contact (or group) as seen by the inbox.
///
/// `is_online`, `is_typing` and `last_seen` are derived from the presence
/// tracker when a view is built; payload values for them are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub is_business: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Contact {
    /// Minimal contact with only an id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone_number: String::new(),
            is_online: false,
            is_typing: false,
            last_seen: None,
            is_business: false,
            is_verified: false,
            tags: Vec::new(),
        }
    }

    /// Name for display: the contact name, falling back to the phone number
    /// and then the raw id.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.phone_number.trim().is_empty() {
            &self.phone_number
        } else {
            &self.id
        }
    }
}
