//! Config file discovery and layered merging.
//!
//! Layers, lowest precedence first:
//! 1. `config.toml` in the user config dir (`--config-dir`, then
//!    `$HEARTH_CONFIG_DIR`, then `~/.config/hearth`)
//! 2. `./hearth.toml` in the project directory
//!
//! A file passed with `--config` replaces discovery entirely.

use std::path::{Path, PathBuf};

use crate::{ConfigError, HearthConfig, Result};

const PROJECT_CONFIG_FILE: &str = "hearth.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "hearth";
const CONFIG_DIR_ENV: &str = "HEARTH_CONFIG_DIR";

/// What happened to a layer during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    Loaded,
    Missing,
    /// The file exists but could not be read or parsed; it was skipped.
    Broken(String),
}

/// One config file considered during loading.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub path: PathBuf,
    pub status: LayerStatus,
}

impl ConfigLayer {
    pub fn is_loaded(&self) -> bool {
        self.status == LayerStatus::Loaded
    }
}

/// Merged configuration and the layers it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HearthConfig,
    /// Layers in order of precedence, lowest first.
    pub layers: Vec<ConfigLayer>,
}

impl LoadedConfig {
    /// Load a single explicitly named file. Any failure is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_config_file(path)?,
            layers: vec![ConfigLayer {
                path: path.to_path_buf(),
                status: LayerStatus::Loaded,
            }],
        })
    }

    /// Paths of the layers that contributed to the config.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.layers
            .iter()
            .filter(|l| l.is_loaded())
            .map(|l| l.path.as_path())
            .collect()
    }

    /// One message per skipped broken layer.
    pub fn warnings(&self) -> Vec<String> {
        self.layers
            .iter()
            .filter_map(|l| match l.status {
                LayerStatus::Broken(ref reason) => {
                    Some(format!("Failed to load {}: {}", l.path.display(), reason))
                }
                _ => None,
            })
            .collect()
    }
}

/// Discover and merge the user and project layers.
///
/// `config_dir` overrides the user config directory. Broken layers are
/// skipped and reported through [`LoadedConfig::warnings`]; the merged
/// result must still validate.
pub fn discover(project_dir: Option<&Path>, config_dir: Option<&Path>) -> Result<LoadedConfig> {
    let mut config = HearthConfig::new();
    let mut layers = Vec::new();

    if let Some(path) = user_config_path(config_dir) {
        layers.push(merge_layer(&mut config, path));
    }
    layers.push(merge_layer(&mut config, project_config_path(project_dir)));

    config.validate()?;
    Ok(LoadedConfig { config, layers })
}

/// Load and validate config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<HearthConfig> {
    let config = read_config_file(path)?;
    config.validate()?;
    Ok(config)
}

/// Write `config` to `path`, creating parent directories as needed.
pub fn save_config(config: &HearthConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    std::fs::write(path, config.to_toml()?).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Path of the project-local config file in `project_dir` (default: the
/// current directory).
pub fn project_config_path(project_dir: Option<&Path>) -> PathBuf {
    project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE))
}

/// Path of the user config file.
///
/// `config_dir` wins, then `$HEARTH_CONFIG_DIR`, then the platform config
/// dir. `None` if no home directory can be found.
pub fn user_config_path(config_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()?.join(APP_NAME),
        },
    };
    Some(dir.join(USER_CONFIG_FILE))
}

fn read_config_file(path: &Path) -> Result<HearthConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    HearthConfig::from_toml(&contents)
}

fn merge_layer(config: &mut HearthConfig, path: PathBuf) -> ConfigLayer {
    let status = if !path.is_file() {
        LayerStatus::Missing
    } else {
        match read_config_file(&path) {
            Ok(layer) => {
                config.merge(layer);
                LayerStatus::Loaded
            }
            Err(e) => LayerStatus::Broken(e.to_string()),
        }
    };
    ConfigLayer { path, status }
}
