//! Global configuration for stackref.
//!
//! The global configuration file holds user-wide defaults for synthesis and
//! reporting. Every key is optional; a missing file means all defaults.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.stackref/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\stackref\config.toml`
//!
//! The `STACKREF_CONFIG` environment variable or the `--config` flag point at a
//! different file.
//!
//! # File Format
//!
//! ```toml
//! # Derive export names from the scopes below the exporting stack
//! stack_relative_exports = true
//!
//! # Where `stackref synth` writes templates when `-o` is not given
//! default_output_dir = "stack.out"
//!
//! # Report format of `stackref refs`
//! default_format = "json"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::CONFIG_ENV_VAR;
use crate::core::StackrefError;
use crate::resolver::ResolverOptions;

/// Output format of CLI reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Text => "text",
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    "stack.out".to_string()
}

/// User-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Export names use the scopes below the exporting stack only.
    #[serde(default = "default_true")]
    pub stack_relative_exports: bool,

    /// Output directory of `synth` when none is given.
    #[serde(default = "default_output_dir")]
    pub default_output_dir: String,

    /// Format of `refs` reports when none is given.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            stack_relative_exports: true,
            default_output_dir: default_output_dir(),
            default_format: OutputFormat::default(),
        }
    }
}

impl GlobalConfig {
    /// Load from the default location, or defaults when no file exists there.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, else from the default location.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is an error.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| StackrefError::ConfigError {
                message: format!("{}: {e}", path.display()),
            })
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Write the configuration to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Platform default path, unless `STACKREF_CONFIG` names another file.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("stackref")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".stackref")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Resolver options derived from this configuration.
    #[must_use]
    pub const fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            stack_relative_exports: self.stack_relative_exports,
        }
    }
}
