//! Resolve an app and write its cloud assembly.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::load_app;
use crate::config::GlobalConfig;
use crate::synth::synthesize;

/// Write one template per stack plus the assembly manifest.
#[derive(Args)]
pub struct SynthCommand {
    /// App manifest (TOML, JSON or YAML)
    app: PathBuf,

    /// Output directory; defaults to `default_output_dir` of the global config
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SynthCommand {
    pub async fn execute(self, config: &GlobalConfig) -> Result<()> {
        let (mut tree, app) = load_app(&self.app)?;
        let assembly = synthesize(&mut tree, app, &config.resolver_options())?;

        let output = self.output.unwrap_or_else(|| PathBuf::from(&config.default_output_dir));
        assembly.write_to(&output).await?;

        println!(
            "{} Synthesized {} stacks ({} cross-stack references) to {}",
            "✓".green(),
            assembly.artifacts.len(),
            assembly.report.cross_stack().count(),
            output.display()
        );
        for artifact in &assembly.artifacts {
            println!("  {} {}", artifact.template_file.bold(), artifact.path.dimmed());
        }
        Ok(())
    }
}
