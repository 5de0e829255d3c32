//! CLI command handlers.

use std::path::PathBuf;

use hearth_config::LoadedConfig;

pub mod config;
pub mod simulate;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Configuration resolved at startup.
    pub config: LoadedConfig,
    /// User config directory override from the command line.
    pub config_dir: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}
