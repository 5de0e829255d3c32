//! A single session's attribute bag.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

/// Snapshot of a session's attributes.
pub type SessionValues = HashMap<String, Value>;

/// Fields guarded by the record lock.
#[derive(Debug)]
struct RecordState {
    data: SessionValues,
    /// Unix timestamp (seconds) of the last access.
    last_active_time: i64,
}

/// A session record: an id plus a locked key/value bag.
///
/// Every accessor except [`session_id`](Self::session_id) and
/// [`last_active_time`](Self::last_active_time) refreshes the activity
/// timestamp. Records are locked independently of each other and of the
/// table that owns them.
#[derive(Debug)]
pub struct SessionRecord {
    session_id: String,
    state: Mutex<RecordState>,
}

impl SessionRecord {
    /// Create an empty record.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_data(session_id, SessionValues::new())
    }

    /// Create a record pre-populated with `data`.
    pub fn with_data(session_id: impl Into<String>, data: SessionValues) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(RecordState {
                data,
                last_active_time: now(),
            }),
        }
    }

    /// The id this record was created under.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();
        state.last_active_time = now();
        state.data.get(key).cloned()
    }

    /// Store a value, replacing any previous one under `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state.lock();
        state.last_active_time = now();
        state.data.insert(key.into(), value.into());
    }

    /// Remove a value. Unknown keys are ignored.
    pub fn delete(&self, key: &str) {
        let mut state = self.state.lock();
        state.last_active_time = now();
        state.data.remove(key);
    }

    /// Copy of every key/value pair.
    pub fn get_all(&self) -> SessionValues {
        let mut state = self.state.lock();
        state.last_active_time = now();
        state.data.clone()
    }

    /// Remove every value, keeping the id.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.last_active_time = now();
        state.data.clear();
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Check if the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Unix timestamp of the last access. Does not count as an access.
    pub fn last_active_time(&self) -> i64 {
        self.state.lock().last_active_time
    }

    /// Whether the record has been idle for at least `lifetime_secs` at `now`.
    pub fn is_expired_at(&self, now: i64, lifetime_secs: i64) -> bool {
        now.saturating_sub(self.last_active_time()) >= lifetime_secs
    }

    #[cfg(test)]
    pub(crate) fn set_last_active_time(&self, ts: i64) {
        self.state.lock().last_active_time = ts;
    }
}

/// Current Unix time in seconds.
pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}
