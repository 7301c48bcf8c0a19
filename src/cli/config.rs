//! Manage the global stackref configuration.
//!
//! ```bash
//! stackref config            # same as `config show`
//! stackref config show
//! stackref config path
//! stackref config init [--force]
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::GlobalConfig;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Print the effective configuration as TOML.
    Show,

    /// Print the path of the configuration file.
    Path,

    /// Write a configuration file with the default settings.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Path) => Self::show_path(config_path),
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(force, config_path).await,
        }
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let content = toml::to_string_pretty(&config).context("Failed to serialize global config")?;
        print!("{content}");
        Ok(())
    }

    fn show_path(config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => GlobalConfig::default_path()?,
        };
        println!("{}", path.display());
        Ok(())
    }

    async fn init(force: bool, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => GlobalConfig::default_path()?,
        };

        if path.exists() && !force {
            println!("{} Config already exists at: {}", "✗".red(), path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        GlobalConfig::default().save_to(&path).await?;
        println!("{} Wrote default config to {}", "✓".green(), path.display());
        Ok(())
    }
}
