use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wa_inbox::backend::http::HttpBackend;

#[allow(dead_code)]
pub fn make_backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(
        url::Url::parse(base_url).expect("valid url"),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .expect("backend")
}

#[allow(dead_code)]
pub fn shared_backend(base_url: &str) -> Arc<HttpBackend> {
    Arc::new(make_backend(base_url))
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("inbox.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn chat_json(id: &str, last_message_time: i64, unread: u32) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "contact": {"id": id, "name": id.to_uppercase(), "phoneNumber": "+15550000"},
        "lastMessageTime": last_message_time,
        "unreadCount": unread,
    })
}

#[allow(dead_code)]
pub fn message_json(id: &str, timestamp: i64, from_me: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "content": format!("text of {}", id),
        "type": "text",
        "timestamp": timestamp,
        "isFromMe": from_me,
        "status": "delivered",
    })
}
