//! Report cross-stack references.
//!
//! Each row names the consuming element, the referenced element and attribute,
//! the topology between their stacks and the intrinsic the consumer ends up
//! using, rendered as it appears in the consumer's template.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;

use super::common::load_app;
use crate::config::{GlobalConfig, OutputFormat};
use crate::resolver::{ResolvedReference, Topology, resolve_references};
use crate::synth::render_local_reference;
use crate::tokens::ResolvedValue;
use crate::tree::ConstructTree;

#[derive(Args)]
pub struct RefsCommand {
    /// App manifest (TOML, JSON or YAML)
    app: PathBuf,

    /// Report format; defaults to `default_format` of the global config
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Include references within a single stack
    #[arg(long)]
    all: bool,
}

#[derive(Debug, Serialize)]
struct ReferenceRow {
    source: String,
    consumer: String,
    target: String,
    attribute: String,
    topology: Topology,
    value: Value,
}

impl RefsCommand {
    pub fn execute(self, config: &GlobalConfig) -> Result<()> {
        let (mut tree, app) = load_app(&self.app)?;
        let report = resolve_references(&mut tree, app, &config.resolver_options())?;

        let rows = report
            .references
            .iter()
            .filter(|r| self.all || r.topology != Topology::SameStack)
            .map(|r| row(&tree, r))
            .collect::<Result<Vec<_>>>()?;

        match self.format.unwrap_or(config.default_format) {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows).context("Failed to render report")?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(&rows).context("Failed to render report")?);
            }
            OutputFormat::Text => print_text(&rows),
        }
        Ok(())
    }
}

fn row(tree: &ConstructTree, resolved: &ResolvedReference) -> Result<ReferenceRow> {
    let value = match &resolved.value {
        ResolvedValue::Import { export_name } => json!({ "Fn::ImportValue": export_name }),
        ResolvedValue::Reference(local) => render_local_reference(tree, resolved.consumer, local)?,
    };

    Ok(ReferenceRow {
        source: tree.path(resolved.source),
        consumer: tree.path(resolved.consumer),
        target: tree.path(resolved.reference.target),
        attribute: resolved.reference.display_name().to_string(),
        topology: resolved.topology,
        value,
    })
}

fn print_text(rows: &[ReferenceRow]) {
    if rows.is_empty() {
        println!("No cross-stack references");
        return;
    }

    for row in rows {
        println!(
            "{} -> {}.{} [{}]",
            row.source.bold(),
            row.target,
            row.attribute,
            row.topology.to_string().cyan()
        );
        println!("    {}", row.value);
    }
}
