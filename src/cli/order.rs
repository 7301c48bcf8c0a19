//! Print the deploy order of an app's top-level stacks.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::load_app;
use crate::config::GlobalConfig;
use crate::resolver::{DependencyGraph, resolve_references};

#[derive(Args)]
pub struct OrderCommand {
    /// App manifest (TOML, JSON or YAML)
    app: PathBuf,
}

impl OrderCommand {
    pub fn execute(self, config: &GlobalConfig) -> Result<()> {
        let (mut tree, app) = load_app(&self.app)?;
        resolve_references(&mut tree, app, &config.resolver_options())?;

        let graph = DependencyGraph::from_tree(&tree, app)?;
        for (position, stack) in graph.topological_order()?.iter().enumerate() {
            println!("{}. {}", position + 1, stack.path.bold());
            for (dependency, reasons) in graph.direct_dependencies(stack.id) {
                println!("   after {}", dependency.path.cyan());
                for reason in reasons {
                    println!("     {}", reason.dimmed());
                }
            }
        }
        Ok(())
    }
}
