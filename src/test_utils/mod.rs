//! Test utilities for stackref
//!
//! This module provides helpers for writing tests: one-time logging setup and
//! [`AppFixture`], an isolated directory holding app manifests and a global
//! configuration file.
//!
//! # Example
//!
//! ```rust,no_run
//! use stackref_cli::test_utils::AppFixture;
//!
//! let fixture = AppFixture::new()
//!     .unwrap()
//!     .with_manifest("app.toml", "[[stacks]]\nid = \"Solo\"\n")
//!     .unwrap();
//! assert!(fixture.path("app.toml").exists());
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=stackref_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A temporary working directory with app manifests and an isolated config.
pub struct AppFixture {
    temp_dir: TempDir,
}

impl AppFixture {
    /// Name of the global config file inside the fixture directory.
    pub const CONFIG_FILE: &'static str = "config.toml";

    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new().context("Failed to create fixture directory")?,
        })
    }

    /// Write an app manifest; the format follows the file extension.
    pub fn with_manifest(self, name: &str, content: &str) -> Result<Self> {
        self.write(name, content)?;
        Ok(self)
    }

    /// Write the global config file.
    pub fn with_config(self, content: &str) -> Result<Self> {
        self.write(Self::CONFIG_FILE, content)?;
        Ok(self)
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Root of the fixture directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of `name` inside the fixture directory.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Path of the global config file, whether or not it was written.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.path(Self::CONFIG_FILE)
    }
}
