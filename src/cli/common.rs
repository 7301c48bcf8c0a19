//! Helpers shared by the CLI commands.

use anyhow::{Context, Result};
use std::path::Path;

use crate::manifest::AppManifest;
use crate::tree::{ConstructTree, NodeId};

/// Load an app manifest and build it into a fresh tree.
pub fn load_app(path: &Path) -> Result<(ConstructTree, NodeId)> {
    let manifest = AppManifest::load(path)?;
    let mut tree = ConstructTree::new();
    let app = manifest
        .build(&mut tree)
        .with_context(|| format!("Failed to build app from {}", path.display()))?;
    Ok((tree, app))
}
