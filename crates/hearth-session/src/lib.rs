//! In-memory session store.
//!
//! This crate maps opaque session ids to mutable key/value bags and keeps
//! them alive while they are in use:
//! - Get-or-create lookup with at most one record per id
//! - Id regeneration that moves a session's data to a new id atomically
//! - Idle expiration through an explicit [`sweep`](MemoryProvider::sweep)
//! - Optional background sweeping on a tokio timer
//!
//! # Example
//!
//! ```rust
//! use hearth_session::{ProviderConfig, ProviderRegistry, SessionProvider, SessionStore};
//! use serde_json::json;
//!
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.build(&ProviderConfig::default()).unwrap();
//!
//! let session = provider.read("s1");
//! session.set("user".to_string(), json!("alice"));
//!
//! let rotated = provider.regenerate("s1", "s2");
//! assert_eq!(rotated.get("user"), Some(json!("alice")));
//! assert!(!provider.exists("s1"));
//! ```

mod config;
mod error;
mod memory;
mod provider;
mod record;
mod scheduler;

pub use config::{
    DEFAULT_INITIAL_CAPACITY, MEMORY_PROVIDER, MemoryConfig, ProviderConfig, SweepMode,
};
pub use error::{Error, Result};
pub use memory::MemoryProvider;
pub use provider::{ProviderFactory, ProviderRegistry, SessionProvider, SessionStore, StoreHandle};
pub use record::{SessionRecord, SessionValues};
pub use scheduler::{SweeperHandle, spawn_sweeper};
