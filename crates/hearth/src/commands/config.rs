//! Config command - configuration inspection and setup.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;
use hearth_config::{HearthConfig, LayerStatus, LoggingConfig, SessionConfig};
use hearth_session::ProviderRegistry;
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and check the provider accepts it
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Show the user configuration file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Create project-local config (./hearth.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.config.config;
    let session = config.session();
    let logging = config.logging();

    let registry = ProviderRegistry::with_defaults();
    let provider_check = session.build_provider(&registry).map(|_| ());

    if ctx.json_output {
        let output = json!({
            "sources": ctx.config.loaded_from(),
            "warnings": ctx.config.warnings(),
            "session": session,
            "logging": logging,
            "provider_ok": provider_check.is_ok(),
            "provider_error": provider_check.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        let bold = Style::new().bold();

        println!("{}", bold.apply_to("Hearth Configuration"));
        println!();

        let sources = ctx.config.loaded_from();
        if sources.is_empty() {
            println!("No config files loaded {}", dim.apply_to("(using defaults)"));
        } else {
            println!("Config files:");
            for source in &sources {
                println!("  {}", source.display());
            }
        }
        println!();

        println!("Session:");
        println!("  {:<20} {}", "provider", session.provider.name());
        println!("  {:<20} {}s", "lifetime", session.lifetime_secs);
        println!("  {:<20} {}s", "sweep interval", session.sweep_interval_secs);
        for (key, value) in &session.provider.options {
            println!("  {:<20} {}", key, value);
        }
        println!();

        println!("Logging:");
        println!("  {:<20} {}", "level", logging.level);
        println!("  {:<20} {}", "json", logging.json);
        match logging.directory {
            Some(ref dir) => println!("  {:<20} {}", "directory", dir.display()),
            None => println!("  {:<20} {}", "directory", dim.apply_to("(console only)")),
        }
        println!();

        for warning in ctx.config.warnings() {
            println!("{} {}", Style::new().yellow().apply_to("warning:"), warning);
        }

        match provider_check {
            Ok(()) => println!(
                "{} provider accepts this configuration",
                Style::new().green().apply_to("ok:")
            ),
            Err(ref e) => println!("{} {}", Style::new().red().apply_to("error:"), e),
        }
    }

    if let Err(e) = provider_check {
        bail!("provider rejected configuration: {e}");
    }
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let sources: Vec<_> = ctx
            .config
            .layers
            .iter()
            .map(|l| {
                let error = match l.status {
                    LayerStatus::Broken(ref reason) => Some(reason.as_str()),
                    _ => None,
                };
                json!({ "path": l.path, "loaded": l.is_loaded(), "error": error })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("Config sources (lowest precedence first):");
    for layer in &ctx.config.layers {
        let status = match layer.status {
            LayerStatus::Loaded => Style::new().green().apply_to("loaded"),
            LayerStatus::Missing => dim.apply_to("not found"),
            LayerStatus::Broken(_) => Style::new().yellow().apply_to("skipped (invalid)"),
        };
        println!("  {}  {}", layer.path.display(), status);
    }
    Ok(())
}

fn user_config_path(ctx: &Context) -> Option<PathBuf> {
    hearth_config::user_config_path(ctx.config_dir.as_deref())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match user_config_path(ctx) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("could not determine the user config directory"),
    }
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        hearth_config::project_config_path(None)
    } else {
        match user_config_path(ctx) {
            Some(path) => path,
            None => bail!("could not determine the user config directory"),
        }
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = HearthConfig {
        session: Some(SessionConfig::default()),
        logging: Some(LoggingConfig::default()),
    };
    hearth_config::save_config(&config, &path)?;

    println!("Wrote {}", path.display());
    Ok(())
}
