//! Command-line interface for stackref.
//!
//! # Commands
//!
//! - `synth` - resolve cross-stack references and write the cloud assembly
//! - `refs` - report how every cross-stack reference is carried
//! - `order` - print the deploy order of top-level stacks
//! - `config` - show or initialize the global configuration
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config <PATH>`: use another global configuration file
//!
//! Without either verbosity flag the `RUST_LOG` environment variable applies,
//! falling back to warnings only.
//!
//! # Examples
//!
//! ```bash
//! stackref synth app.toml -o out
//! stackref refs app.yaml --format text
//! stackref --verbose order app.json
//! ```

mod common;
mod config;
mod order;
mod refs;
mod synth;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

/// Runtime configuration derived from the global flags.
///
/// Separate from [`Cli`] so tests can run commands with explicit settings.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG`.
    pub log_level: Option<String>,

    /// Global configuration file to use instead of the default location.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Cross-stack reference resolution for infrastructure apps.
#[derive(Parser)]
#[command(
    name = "stackref",
    about = "Resolve cross-stack references and synthesize stack templates",
    version,
    long_about = "stackref reads an app manifest, wires values between stacks through parameters, \
                  outputs and exports, and writes one template per stack."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file
    #[arg(long, global = true, env = "STACKREF_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve references and write the cloud assembly.
    Synth(synth::SynthCommand),

    /// Report every cross-stack reference and how it is carried.
    Refs(refs::RefsCommand),

    /// Print the deploy order of top-level stacks.
    Order(order::OrderCommand),

    /// Manage the global configuration.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Execute with the configuration implied by the parsed flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        let config_path = config.config_path;
        match self.command {
            Commands::Synth(cmd) => cmd.execute(&GlobalConfig::load_with_optional(config_path).await?).await,
            Commands::Refs(cmd) => cmd.execute(&GlobalConfig::load_with_optional(config_path).await?),
            Commands::Order(cmd) => cmd.execute(&GlobalConfig::load_with_optional(config_path).await?),
            Commands::Config(cmd) => cmd.execute(config_path).await,
        }
    }
}
