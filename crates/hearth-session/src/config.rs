//! Provider configuration.
//!
//! A [`ProviderConfig`] names the provider it belongs to and carries that
//! provider's options as an untyped table. Providers check the name first and
//! then decode the options into their own config type with
//! [`ProviderConfig::options`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Discriminator of the in-memory provider.
pub const MEMORY_PROVIDER: &str = "memory";

/// Default capacity reserved for the session table at init.
pub const DEFAULT_INITIAL_CAPACITY: usize = 0;

/// Configuration addressed to one provider.
///
/// ```toml
/// provider = "memory"
/// initial_capacity = 1024
/// sweep_mode = "all"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the provider this config is meant for.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Provider-specific options, decoded by the provider itself.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

fn default_provider() -> String {
    MEMORY_PROVIDER.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        MemoryConfig::default().into()
    }
}

impl ProviderConfig {
    /// Create a config for the named provider with no options.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            options: Map::new(),
        }
    }

    /// Set a single option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Name of the provider this config targets.
    pub fn name(&self) -> &str {
        &self.provider
    }

    /// Fail with [`Error::ConfigMismatch`] unless this config targets `expected`.
    pub fn ensure_provider(&self, expected: &str) -> Result<()> {
        if self.provider == expected {
            Ok(())
        } else {
            Err(Error::ConfigMismatch {
                expected: expected.to_string(),
                found: self.provider.clone(),
            })
        }
    }

    /// Decode the options table into a provider's typed config.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|e| {
            Error::InvalidOptions {
                provider: self.provider.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// How many expired records a single sweep evicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Evict every expired record found in the scan.
    #[default]
    All,
    /// Evict only the first expired record found, leaving the rest for
    /// later sweeps.
    First,
}

/// Options of the in-memory provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Table capacity to reserve when the provider is initialized.
    pub initial_capacity: usize,

    /// Eviction policy for [`sweep`](crate::MemoryProvider::sweep).
    pub sweep_mode: SweepMode,
}

impl MemoryConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity reserved at init.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the sweep eviction policy.
    pub fn with_sweep_mode(mut self, mode: SweepMode) -> Self {
        self.sweep_mode = mode;
        self
    }
}

impl From<MemoryConfig> for ProviderConfig {
    fn from(config: MemoryConfig) -> Self {
        ProviderConfig::new(MEMORY_PROVIDER)
            .with_option("initial_capacity", config.initial_capacity)
            .with_option(
                "sweep_mode",
                match config.sweep_mode {
                    SweepMode::All => "all",
                    SweepMode::First => "first",
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_memory() {
        let config = ProviderConfig::default();
        assert_eq!(config.name(), MEMORY_PROVIDER);
        let memory: MemoryConfig = config.options().unwrap();
        assert_eq!(memory, MemoryConfig::default());
        assert_eq!(memory.initial_capacity, DEFAULT_INITIAL_CAPACITY);
    }

    #[test]
    fn test_ensure_provider_mismatch() {
        let config = ProviderConfig::new("redis");
        let err = config.ensure_provider(MEMORY_PROVIDER).unwrap_err();
        match err {
            Error::ConfigMismatch { expected, found } => {
                assert_eq!(expected, "memory");
                assert_eq!(found, "redis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_options_decode() {
        let config = ProviderConfig::new(MEMORY_PROVIDER)
            .with_option("initial_capacity", 64)
            .with_option("sweep_mode", "first");

        let memory: MemoryConfig = config.options().unwrap();
        assert_eq!(memory.initial_capacity, 64);
        assert_eq!(memory.sweep_mode, SweepMode::First);
    }

    #[test]
    fn test_options_missing_fields_use_defaults() {
        let config = ProviderConfig::new(MEMORY_PROVIDER).with_option("initial_capacity", 8);
        let memory: MemoryConfig = config.options().unwrap();
        assert_eq!(memory.sweep_mode, SweepMode::All);
    }

    #[test]
    fn test_options_invalid() {
        let config = ProviderConfig::new(MEMORY_PROVIDER).with_option("sweep_mode", "sometimes");
        let err = config.options::<MemoryConfig>().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions { .. }));
    }

    #[test]
    fn test_deserialize_flattened_options() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "provider": "memory",
            "initial_capacity": 16,
        }))
        .unwrap();

        assert_eq!(config.name(), "memory");
        assert_eq!(config.options.get("initial_capacity"), Some(&Value::from(16)));
    }

    #[test]
    fn test_deserialize_without_provider_defaults_to_memory() {
        let config: ProviderConfig =
            serde_json::from_value(serde_json::json!({ "sweep_mode": "first" })).unwrap();
        assert_eq!(config.name(), MEMORY_PROVIDER);
    }

    #[test]
    fn test_memory_config_into_provider_config() {
        let config: ProviderConfig = MemoryConfig::new()
            .with_initial_capacity(32)
            .with_sweep_mode(SweepMode::First)
            .into();

        let decoded: MemoryConfig = config.options().unwrap();
        assert_eq!(decoded.initial_capacity, 32);
        assert_eq!(decoded.sweep_mode, SweepMode::First);
    }
}
