//! Configuration system for the Hearth session store.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section naming the provider, its options and the
//!   expiration schedule
//! - A `[logging]` section for console and file logging
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, LayerStatus, LoadedConfig, discover, load_config_file, project_config_path,
    save_config, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
