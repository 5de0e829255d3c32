//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [session]                # provider selection, options and expiry
//! [logging]                # console / file logging
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hearth_session::{MemoryConfig, ProviderConfig, ProviderRegistry, SessionProvider};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default values for optional settings.
pub mod defaults {
    /// Idle time after which a session is swept.
    pub const LIFETIME_SECS: u64 = 3_600;
    /// Interval between sweeps.
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
    /// Default log level directive.
    pub const LOG_LEVEL: &str = "info";

    pub(crate) fn lifetime_secs() -> u64 {
        LIFETIME_SECS
    }

    pub(crate) fn sweep_interval_secs() -> u64 {
        SWEEP_INTERVAL_SECS
    }

    pub(crate) fn log_level() -> String {
        LOG_LEVEL.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    /// Session store configuration.
    pub session: Option<SessionConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl HearthConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: HearthConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The session section, or defaults if absent.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// The logging section, or defaults if absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check value ranges that the TOML schema cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref session) = self.session {
            session.validate()?;
        }
        if let Some(ref logging) = self.logging {
            logging.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session store configuration.
///
/// Keys other than the expiry settings are handed to the provider.
///
/// ```toml
/// [session]
/// provider = "memory"
/// lifetime_secs = 3600
/// sweep_interval_secs = 60
/// initial_capacity = 1024
/// sweep_mode = "all"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds after which a session is evicted.
    #[serde(default = "defaults::lifetime_secs")]
    pub lifetime_secs: u64,

    /// Seconds between sweeps.
    #[serde(default = "defaults::sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Provider name and provider-specific options.
    #[serde(flatten)]
    pub provider: ProviderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: defaults::LIFETIME_SECS,
            sweep_interval_secs: defaults::SWEEP_INTERVAL_SECS,
            provider: MemoryConfig::default().into(),
        }
    }
}

impl SessionConfig {
    /// Idle lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Construct and initialize the configured provider from `registry`.
    pub fn build_provider(&self, registry: &ProviderRegistry) -> Result<Arc<dyn SessionProvider>> {
        Ok(registry.build(&self.provider)?)
    }

    fn validate(&self) -> Result<()> {
        if self.lifetime_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.lifetime_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if i64::try_from(self.lifetime_secs).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "session.lifetime_secs".to_string(),
                reason: "out of range".to_string(),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.sweep_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.provider.name().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session.provider".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "info"
/// json = false
/// directory = "/var/log/hearth"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive for console output (e.g. `info`, `hearth_session=debug`).
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Emit console output as JSON lines.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rolled JSON log files. Console only if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            json: false,
            directory: None,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_session::SweepMode;

    #[test]
    fn test_empty_config() {
        let config = HearthConfig::from_toml("").unwrap();
        assert!(config.session.is_none());
        assert!(config.logging.is_none());
        assert_eq!(config.session(), SessionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_session_section() {
        let config = HearthConfig::from_toml(
            r#"
[session]
provider = "memory"
lifetime_secs = 900
sweep_interval_secs = 30
initial_capacity = 256
sweep_mode = "first"
"#,
        )
        .unwrap();

        let session = config.session();
        assert_eq!(session.lifetime(), Duration::from_secs(900));
        assert_eq!(session.sweep_interval(), Duration::from_secs(30));
        assert_eq!(session.provider.name(), "memory");
        assert!(!session.provider.options.contains_key("lifetime_secs"));

        let memory: MemoryConfig = session.provider.options().unwrap();
        assert_eq!(memory.initial_capacity, 256);
        assert_eq!(memory.sweep_mode, SweepMode::First);
    }

    #[test]
    fn test_session_defaults() {
        let config = HearthConfig::from_toml("[session]\n").unwrap();
        let session = config.session();
        assert_eq!(session.lifetime_secs, defaults::LIFETIME_SECS);
        assert_eq!(session.sweep_interval_secs, defaults::SWEEP_INTERVAL_SECS);
        assert_eq!(session.provider.name(), "memory");
    }

    #[test]
    fn test_foreign_provider_options_kept() {
        let config = HearthConfig::from_toml(
            r#"
[session]
provider = "redis"
address = "127.0.0.1:6379"
"#,
        )
        .unwrap();

        let provider = config.session().provider;
        assert_eq!(provider.name(), "redis");
        assert_eq!(
            provider.options.get("address"),
            Some(&serde_json::Value::from("127.0.0.1:6379"))
        );
    }

    #[test]
    fn test_parse_logging_section() {
        let config = HearthConfig::from_toml(
            r#"
[logging]
level = "debug"
json = true
directory = "/tmp/hearth-logs"
"#,
        )
        .unwrap();

        let logging = config.logging();
        assert_eq!(logging.level, "debug");
        assert!(logging.json);
        assert_eq!(logging.directory, Some(PathBuf::from("/tmp/hearth-logs")));
    }

    #[test]
    fn test_validate_zero_lifetime() {
        let config = HearthConfig::from_toml("[session]\nlifetime_secs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "session.lifetime_secs"));
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = HearthConfig::from_toml("[session]\nsweep_interval_secs = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "session.sweep_interval_secs")
        );
    }

    #[test]
    fn test_validate_empty_level() {
        let config = HearthConfig::from_toml("[logging]\nlevel = \"  \"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = HearthConfig::from_toml(
            r#"
[session]
lifetime_secs = 100

[logging]
level = "warn"
"#,
        )
        .unwrap();
        let overlay = HearthConfig::from_toml("[session]\nlifetime_secs = 200\n").unwrap();

        base.merge(overlay);

        assert_eq!(base.session().lifetime_secs, 200);
        assert_eq!(base.logging().level, "warn");
    }

    #[test]
    fn test_build_provider() {
        let registry = ProviderRegistry::with_defaults();
        let provider = SessionConfig::default().build_provider(&registry).unwrap();
        assert_eq!(provider.name(), "memory");

        let foreign = SessionConfig {
            provider: ProviderConfig::new("redis"),
            ..Default::default()
        };
        let err = foreign.build_provider(&registry).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::Provider(hearth_session::Error::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = HearthConfig::from_toml(
            r#"
[session]
provider = "memory"
lifetime_secs = 120
initial_capacity = 8
"#,
        )
        .unwrap();

        let text = config.to_toml().unwrap();
        let reparsed = HearthConfig::from_toml(&text).unwrap();
        assert_eq!(reparsed.session().lifetime_secs, 120);
        assert_eq!(reparsed.session().provider.name(), "memory");
    }
}
