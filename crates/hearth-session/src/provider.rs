//! The provider contract and explicit provider selection.
//!
//! A session framework talks to storage through [`SessionProvider`] and to a
//! single session through [`SessionStore`]. Backends are chosen by name from a
//! [`ProviderRegistry`] that the application builds and hands to the
//! framework at wiring time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::{MEMORY_PROVIDER, ProviderConfig};
use crate::error::{Error, Result};
use crate::memory::MemoryProvider;
use crate::record::{SessionRecord, SessionValues};

/// Handle to one session's attributes.
pub type StoreHandle = Arc<dyn SessionStore>;

/// Operations on a single session.
///
/// None of these fail: unknown keys read as `None` and deleting them is a
/// no-op.
pub trait SessionStore: Send + Sync {
    /// The id the session is stored under.
    fn session_id(&self) -> &str;

    /// Look up a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value, replacing any previous one.
    fn set(&self, key: String, value: Value);

    /// Remove a value.
    fn delete(&self, key: &str);

    /// Copy of every key/value pair.
    fn get_all(&self) -> SessionValues;

    /// Remove every value, keeping the session.
    fn flush(&self);
}

impl SessionStore for SessionRecord {
    fn session_id(&self) -> &str {
        SessionRecord::session_id(self)
    }

    fn get(&self, key: &str) -> Option<Value> {
        SessionRecord::get(self, key)
    }

    fn set(&self, key: String, value: Value) {
        SessionRecord::set(self, key, value)
    }

    fn delete(&self, key: &str) {
        SessionRecord::delete(self, key)
    }

    fn get_all(&self) -> SessionValues {
        SessionRecord::get_all(self)
    }

    fn flush(&self) {
        SessionRecord::flush(self)
    }
}

/// A pluggable session storage backend.
pub trait SessionProvider: Send + Sync {
    /// Discriminator a [`ProviderConfig`] must carry to configure this provider.
    fn name(&self) -> &'static str;

    /// Apply a configuration.
    ///
    /// Fails with [`Error::ConfigMismatch`] if `config` targets another
    /// provider; the active configuration is left unchanged on failure.
    fn init(&self, config: &ProviderConfig) -> Result<()>;

    /// Evict sessions idle for at least `lifetime_secs`. Returns the number evicted.
    fn sweep(&self, lifetime_secs: i64) -> usize;

    /// Whether a session is stored under `session_id`.
    fn exists(&self, session_id: &str) -> bool;

    /// Get the session under `session_id`, creating an empty one if absent.
    fn read(&self, session_id: &str) -> StoreHandle;

    /// Move the session under `old_id` to `new_id`, keeping its data.
    ///
    /// Behaves like [`read`](Self::read) on `new_id` when `old_id` is unknown.
    fn regenerate(&self, old_id: &str, new_id: &str) -> StoreHandle;

    /// Remove the session under `session_id`, if any.
    fn destroy(&self, session_id: &str) -> Result<()>;

    /// Number of stored sessions.
    fn count(&self) -> usize;
}

/// Constructor for a fresh, unconfigured provider.
pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn SessionProvider> + Send + Sync>;

/// Name-to-factory table used to pick a backend from configuration.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in providers.
    pub fn with_defaults() -> Self {
        Self::new().register(MEMORY_PROVIDER, || {
            Arc::new(MemoryProvider::new()) as Arc<dyn SessionProvider>
        })
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn SessionProvider> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct the provider named by `config` and initialize it.
    pub fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn SessionProvider>> {
        let factory = self
            .factories
            .get(config.name())
            .ok_or_else(|| Error::UnknownProvider(config.name().to_string()))?;

        let provider = factory();
        provider.init(config)?;
        debug!(provider = %config.name(), "Session provider built");
        Ok(provider)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
