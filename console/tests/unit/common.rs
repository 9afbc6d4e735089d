//! Shared fixtures

use std::sync::Arc;
use std::time::Duration;

use dockrune_console::app::options::ConsoleOptions;
use dockrune_console::app::state::ConsoleState;
use dockrune_console::storage::local::{LocalStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
use secrecy::SecretString;
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";

pub fn options(base_url: &str) -> ConsoleOptions {
    let mut options = ConsoleOptions::default().with_api_base_url(base_url);
    options.request_timeout = Duration::from_secs(5);
    options
}

/// Console state over in-memory storage, not signed in
pub fn console(base_url: &str) -> (ConsoleState, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let state = ConsoleState::with_storage(&options(base_url), storage.clone()).unwrap();
    (state, storage)
}

/// Console state with a live session
pub fn signed_in(base_url: &str) -> ConsoleState {
    let (state, _) = console(base_url);
    state
        .session_state
        .set(SecretString::from(TOKEN.to_string()), "admin".to_string());
    state
}

pub async fn persist_session(storage: &dyn LocalStorage, token: &str, user: &str) {
    storage.set_item(TOKEN_KEY, token).await.unwrap();
    storage.set_item(USER_KEY, user).await.unwrap();
}

/// A deployment record as the server serialises it
pub fn record_json(id: &str, status: &str, started_at: &str) -> Value {
    let completed = match status {
        "success" | "failed" => "2025-03-01T10:02:00Z",
        _ => "0001-01-01T00:00:00Z",
    };
    json!({
        "ID": id,
        "Owner": "ejfox",
        "Repo": "site",
        "Ref": "main",
        "SHA": "0123456789abcdef",
        "Environment": "production",
        "Status": status,
        "StartedAt": started_at,
        "CompletedAt": completed,
        "URL": "",
        "Port": 0,
        "ProjectType": "node",
        "Error": ""
    })
}
