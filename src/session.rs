//! Session ids and chat history kept in [`Storage`].

use crate::storage::Storage;
use crate::types::ChatMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tracing::warn;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Storage key of `key` for one user, so users sharing a store never see each
/// other's sessions or history.
pub fn user_key(key: &str, user_id: &str) -> String {
    format!("{key}_{user_id}")
}

/// Return the session id of `(key, user_id)`, creating and storing one on
/// first use.
pub fn get_session_id(store: &dyn Storage, key: &str, user_id: &str) -> String {
    let stored_under = user_key(key, user_id);
    if let Some(stored) = store.get(&stored_under).filter(|id| !id.is_empty()) {
        return stored;
    }

    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let session_id = format!("{key}_{user_id}_{millis}_{seq}");
    if let Err(err) = store.set(&stored_under, &session_id) {
        warn!(key = %stored_under, error = %err, "failed to persist session id");
    }
    session_id
}

/// Forget the session id so the next [`get_session_id`] starts a new one.
pub fn clear_session(store: &dyn Storage, key: &str, user_id: &str) {
    let stored_under = user_key(key, user_id);
    if let Err(err) = store.remove(&stored_under) {
        warn!(key = %stored_under, error = %err, "failed to clear session id");
    }
}

pub fn save_messages(store: &dyn Storage, key: &str, messages: &[ChatMessage]) {
    let serialized = match serde_json::to_string(messages) {
        Ok(json) => json,
        Err(err) => {
            warn!(key, error = %err, "failed to serialize messages");
            return;
        }
    };
    if let Err(err) = store.set(key, &serialized) {
        warn!(key, error = %err, "failed to save messages");
    }
}

/// Load stored history; missing or unreadable data yields an empty list.
pub fn load_messages(store: &dyn Storage, key: &str) -> Vec<ChatMessage> {
    let Some(raw) = store.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(messages) => messages,
        Err(err) => {
            warn!(key, error = %err, "failed to load messages");
            Vec::new()
        }
    }
}

pub fn clear_messages(store: &dyn Storage, key: &str) {
    if let Err(err) = store.remove(key) {
        warn!(key, error = %err, "failed to clear messages");
    }
}
