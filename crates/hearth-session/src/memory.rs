//! In-memory session provider.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use crate::config::{MEMORY_PROVIDER, MemoryConfig, ProviderConfig, SweepMode};
use crate::error::Result;
use crate::provider::{SessionProvider, StoreHandle};
use crate::record::{self, SessionRecord};

/// Session table held entirely in process memory.
///
/// The table maps session ids to [`SessionRecord`]s behind a reader/writer
/// lock; each record carries its own lock, so work on one session never
/// blocks another. All state is lost when the provider is dropped.
///
/// Lock order is always table, then record. Record accessors never take the
/// table lock.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    sessions: RwLock<HashMap<String, Arc<SessionRecord>>>,
    config: RwLock<MemoryConfig>,
}

impl MemoryProvider {
    /// Create an empty provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty provider with the given configuration.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            config: RwLock::new(config),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> MemoryConfig {
        self.config.read().clone()
    }

    /// Validate and apply a provider configuration.
    pub fn init(&self, config: &ProviderConfig) -> Result<()> {
        if let Err(e) = config.ensure_provider(MEMORY_PROVIDER) {
            warn!(provider = %config.name(), "Rejected session provider config");
            return Err(e);
        }
        let memory: MemoryConfig = config.options()?;

        {
            let mut sessions = self.sessions.write();
            let additional = memory.initial_capacity.saturating_sub(sessions.len());
            sessions.reserve(additional);
        }

        info!(
            initial_capacity = memory.initial_capacity,
            sweep_mode = ?memory.sweep_mode,
            "Memory session provider initialized"
        );
        *self.config.write() = memory;
        Ok(())
    }

    /// Whether a session is stored under `session_id`.
    pub fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Get the record for `session_id`, creating an empty one if absent.
    ///
    /// Concurrent first reads of the same id all receive the same record.
    pub fn read(&self, session_id: &str) -> Arc<SessionRecord> {
        if let Some(record) = self.sessions.read().get(session_id) {
            trace!(session_id = %session_id, "Session found");
            return Arc::clone(record);
        }

        let mut sessions = self.sessions.write();
        match sessions.entry(session_id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                debug!(session_id = %session_id, "Session created");
                Arc::clone(entry.insert(Arc::new(SessionRecord::new(session_id))))
            }
        }
    }

    /// Move the session under `old_id` to `new_id`, keeping a copy of its data.
    ///
    /// The removal of `old_id` and the insertion of `new_id` happen under one
    /// exclusive lock, so no table operation sees both or neither. A record
    /// already stored under `new_id` is replaced. If `old_id` is unknown this
    /// is the same as [`read`](Self::read) on `new_id`.
    ///
    /// Handles to the old record stay usable but are detached from the table.
    pub fn regenerate(&self, old_id: &str, new_id: &str) -> Arc<SessionRecord> {
        if old_id == new_id {
            return self.read(new_id);
        }

        let mut sessions = self.sessions.write();
        match sessions.remove(old_id) {
            Some(old) => {
                let record = Arc::new(SessionRecord::with_data(new_id, old.get_all()));
                sessions.insert(new_id.to_string(), Arc::clone(&record));
                debug!(old_id = %old_id, new_id = %new_id, "Session regenerated");
                record
            }
            None => {
                trace!(old_id = %old_id, new_id = %new_id, "Regenerating unknown session, starting fresh");
                Arc::clone(
                    sessions
                        .entry(new_id.to_string())
                        .or_insert_with(|| Arc::new(SessionRecord::new(new_id))),
                )
            }
        }
    }

    /// Remove the session under `session_id`. Unknown ids are ignored.
    pub fn destroy(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            debug!(session_id = %session_id, "Session destroyed");
        }
    }

    /// Number of stored sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ids of all stored sessions, in no particular order.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Evict sessions idle for at least `lifetime_secs`, measured against the
    /// current time. Returns the number evicted.
    pub fn sweep(&self, lifetime_secs: i64) -> usize {
        self.sweep_at(record::now(), lifetime_secs)
    }

    /// Evict sessions idle for at least `lifetime_secs` as of `now` (Unix seconds).
    ///
    /// Candidates are collected from a snapshot taken under the shared lock;
    /// each record's lock is taken briefly to read its timestamp, which does
    /// not count as an access. Each candidate is checked again under the
    /// exclusive lock, so a session accessed after the snapshot is kept. With
    /// [`SweepMode::First`] at most one session is evicted per call.
    pub fn sweep_at(&self, now: i64, lifetime_secs: i64) -> usize {
        let mode = self.config.read().sweep_mode;

        let snapshot: Vec<(String, i64)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, record)| (id.clone(), record.last_active_time()))
            .collect();

        let candidates: Vec<String> = snapshot
            .into_iter()
            .filter(|(_, last_active)| now.saturating_sub(*last_active) >= lifetime_secs)
            .map(|(id, _)| id)
            .collect();

        if candidates.is_empty() {
            return 0;
        }

        let mut evicted = 0;
        let mut sessions = self.sessions.write();
        for session_id in candidates {
            let still_expired = sessions
                .get(&session_id)
                .is_some_and(|record| record.is_expired_at(now, lifetime_secs));
            if !still_expired {
                continue;
            }

            sessions.remove(&session_id);
            debug!(session_id = %session_id, "Evicting expired session");
            evicted += 1;

            if mode == SweepMode::First {
                break;
            }
        }

        if evicted > 0 {
            debug!(count = evicted, remaining = sessions.len(), "Swept expired sessions");
        }

        evicted
    }
}

impl SessionProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        MEMORY_PROVIDER
    }

    fn init(&self, config: &ProviderConfig) -> Result<()> {
        MemoryProvider::init(self, config)
    }

    fn sweep(&self, lifetime_secs: i64) -> usize {
        MemoryProvider::sweep(self, lifetime_secs)
    }

    fn exists(&self, session_id: &str) -> bool {
        MemoryProvider::exists(self, session_id)
    }

    fn read(&self, session_id: &str) -> StoreHandle {
        MemoryProvider::read(self, session_id)
    }

    fn regenerate(&self, old_id: &str, new_id: &str) -> StoreHandle {
        MemoryProvider::regenerate(self, old_id, new_id)
    }

    fn destroy(&self, session_id: &str) -> Result<()> {
        MemoryProvider::destroy(self, session_id);
        Ok(())
    }

    fn count(&self) -> usize {
        MemoryProvider::count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::Value;

    #[test]
    fn test_read_creates_once() {
        let provider = MemoryProvider::new();
        assert!(!provider.exists("s1"));

        let first = provider.read("s1");
        let second = provider.read("s1");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(provider.exists("s1"));
        assert_eq!(provider.count(), 1);
    }

    #[test]
    fn test_read_same_data_visible() {
        let provider = MemoryProvider::new();
        provider.read("s1").set("user", "alice");

        assert_eq!(provider.read("s1").get("user"), Some(Value::from("alice")));
    }

    #[test]
    fn test_distinct_ids_do_not_interfere() {
        let provider = MemoryProvider::new();
        let a = provider.read("a");
        let b = provider.read("b");

        a.set("k", "from-a");
        b.set("k", "from-b");
        b.flush();

        assert_eq!(a.get("k"), Some(Value::from("from-a")));
        assert_eq!(b.get("k"), None);
        assert_eq!(provider.count(), 2);
    }

    #[test]
    fn test_regenerate_moves_data() {
        let provider = MemoryProvider::new();
        let old = provider.read("old");
        old.set("user", "alice");
        old.set("visits", 3);
        let before = old.get_all();

        let new = provider.regenerate("old", "new");

        assert!(!provider.exists("old"));
        assert!(provider.exists("new"));
        assert_eq!(new.session_id(), "new");
        assert_eq!(provider.read("new").get_all(), before);
        assert_eq!(provider.count(), 1);
    }

    #[test]
    fn test_regenerate_unknown_old_id_starts_fresh() {
        let provider = MemoryProvider::new();
        let record = provider.regenerate("ghost", "fresh");

        assert!(!provider.exists("ghost"));
        assert!(provider.exists("fresh"));
        assert!(record.is_empty());
        assert!(Arc::ptr_eq(&record, &provider.read("fresh")));
    }

    #[test]
    fn test_regenerate_unknown_old_id_keeps_existing_new() {
        let provider = MemoryProvider::new();
        provider.read("fresh").set("k", "v");

        let record = provider.regenerate("ghost", "fresh");
        assert_eq!(record.get("k"), Some(Value::from("v")));
    }

    #[test]
    fn test_regenerate_replaces_existing_new_id() {
        let provider = MemoryProvider::new();
        provider.read("old").set("owner", "old");
        provider.read("new").set("owner", "new");

        provider.regenerate("old", "new");

        assert_eq!(provider.count(), 1);
        assert_eq!(provider.read("new").get("owner"), Some(Value::from("old")));
    }

    #[test]
    fn test_regenerate_same_id_is_read() {
        let provider = MemoryProvider::new();
        let original = provider.read("s1");
        original.set("k", "v");

        let record = provider.regenerate("s1", "s1");

        assert!(Arc::ptr_eq(&original, &record));
        assert_eq!(provider.count(), 1);
    }

    #[test]
    fn test_regenerate_detaches_old_handle() {
        let provider = MemoryProvider::new();
        let old = provider.read("old");
        old.set("k", "before");

        provider.regenerate("old", "new");
        old.set("k", "after");

        assert_eq!(provider.read("new").get("k"), Some(Value::from("before")));
    }

    #[test]
    fn test_destroy_idempotent() {
        let provider = MemoryProvider::new();
        provider.read("s1");

        provider.destroy("s1");
        provider.destroy("s1");
        provider.destroy("never-existed");

        assert!(!provider.exists("s1"));
        assert!(provider.is_empty());
    }

    #[test]
    fn test_session_ids() {
        let provider = MemoryProvider::new();
        provider.read("b");
        provider.read("a");

        let mut ids = provider.session_ids();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sweep_evicts_all_expired() {
        let provider = MemoryProvider::new();
        for id in ["s1", "s2", "s3"] {
            provider.read(id).set_last_active_time(1_000);
        }
        provider.read("live").set_last_active_time(1_050);

        let evicted = provider.sweep_at(1_100, 100);

        assert_eq!(evicted, 3);
        assert_eq!(provider.session_ids(), vec!["live"]);
    }

    #[test]
    fn test_sweep_boundary_is_inclusive() {
        let provider = MemoryProvider::new();
        provider.read("edge").set_last_active_time(1_000);
        provider.read("inside").set_last_active_time(1_001);

        assert_eq!(provider.sweep_at(1_060, 60), 1);
        assert!(!provider.exists("edge"));
        assert!(provider.exists("inside"));
    }

    #[test]
    fn test_sweep_does_not_refresh_survivors() {
        let provider = MemoryProvider::new();
        provider.read("s1").set_last_active_time(1_000);

        assert_eq!(provider.sweep_at(1_050, 100), 0);
        // Only the timestamp was read; the session still expires on schedule.
        assert_eq!(provider.sessions.read()["s1"].last_active_time(), 1_000);
        assert_eq!(provider.sweep_at(1_100, 100), 1);
    }

    #[test]
    fn test_sweep_nothing_expired() {
        let provider = MemoryProvider::new();
        provider.read("s1");
        provider.read("s2");

        assert_eq!(provider.sweep(3_600), 0);
        assert_eq!(provider.count(), 2);
    }

    #[test]
    fn test_sweep_zero_lifetime_evicts_everything() {
        let provider = MemoryProvider::new();
        provider.read("s1");
        provider.read("s2");

        assert_eq!(provider.sweep(0), 2);
        assert!(provider.is_empty());
    }

    #[test]
    fn test_sweep_first_mode_evicts_one() {
        let provider = MemoryProvider::with_config(
            MemoryConfig::new().with_sweep_mode(SweepMode::First),
        );
        for id in ["s1", "s2", "s3"] {
            provider.read(id).set_last_active_time(0);
        }

        assert_eq!(provider.sweep_at(1_000, 10), 1);
        assert_eq!(provider.count(), 2);
        assert_eq!(provider.sweep_at(1_000, 10), 1);
        assert_eq!(provider.sweep_at(1_000, 10), 1);
        assert_eq!(provider.sweep_at(1_000, 10), 0);
    }

    #[test]
    fn test_init_applies_config() {
        let provider = MemoryProvider::new();
        let config: ProviderConfig = MemoryConfig::new()
            .with_initial_capacity(128)
            .with_sweep_mode(SweepMode::First)
            .into();

        provider.init(&config).unwrap();

        assert_eq!(provider.config().initial_capacity, 128);
        assert_eq!(provider.config().sweep_mode, SweepMode::First);
    }

    #[test]
    fn test_init_mismatch_keeps_previous_config() {
        let provider =
            MemoryProvider::with_config(MemoryConfig::new().with_sweep_mode(SweepMode::First));

        let err = provider
            .init(&ProviderConfig::new("redis").with_option("sweep_mode", "all"))
            .unwrap_err();

        assert!(matches!(err, Error::ConfigMismatch { .. }));
        assert_eq!(provider.config().sweep_mode, SweepMode::First);
    }

    #[test]
    fn test_init_invalid_options_keeps_previous_config() {
        let provider = MemoryProvider::new();
        let err = provider
            .init(&ProviderConfig::new("memory").with_option("initial_capacity", "lots"))
            .unwrap_err();

        assert!(matches!(err, Error::InvalidOptions { .. }));
        assert_eq!(provider.config(), MemoryConfig::default());
    }

    #[test]
    fn test_init_keeps_sessions() {
        let provider = MemoryProvider::new();
        provider.read("s1").set("k", "v");

        provider.init(&ProviderConfig::default()).unwrap();

        assert_eq!(provider.read("s1").get("k"), Some(Value::from("v")));
    }
}
