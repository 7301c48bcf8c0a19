//! Deploy-ordering dependencies between stacks.
//!
//! Dependencies are recorded at the highest level that can express them:
//!
//! - stacks without a common ancestor get an assembly-level edge between their
//!   top-level stacks
//! - a stack depending on one of its own nested stacks needs nothing, since
//!   nested stacks deploy before their parent
//! - a nested stack cannot depend on one of its ancestors
//! - sibling nested stacks get a `DependsOn` between their nested stack
//!   resources in the closest common stack
//!
//! Reference resolution only records export/import crossings, which always
//! join unrelated top-level stacks. The nesting cases apply to callers that
//! order stacks of one lineage directly with [`add_dependency`].

use tracing::debug;

use crate::core::{Result, StackrefError};
use crate::tree::{ConstructTree, NodeId, NodeKind};

/// Record that `source` must be deployed after `target`.
///
/// Both arguments are stacks; nested stacks are rebased as described in the
/// module documentation. Reasons accumulate on an edge without duplicates.
///
/// # Errors
///
/// - [`StackrefError::CrossAppReference`] for stacks of different apps
/// - [`StackrefError::NestedStackDependsOnParent`] when `source` is nested in `target`
/// - [`StackrefError::CyclicDependency`] when the edge would close a cycle
pub fn add_dependency(tree: &mut ConstructTree, source: NodeId, target: NodeId, reason: &str) -> Result<()> {
    if source == target {
        return Ok(());
    }

    if tree.root_of(source) != tree.root_of(target) {
        return Err(StackrefError::CrossAppReference {
            consumer: tree.path(source),
            producer: tree.path(target),
        });
    }

    let source_path = tree.stack_lineage(source);
    let target_path = tree.stack_lineage(target);
    let shared = source_path.iter().zip(&target_path).take_while(|(a, b)| a == b).count();

    if shared == 0 {
        return add_assembly_dependency(tree, source_path[0], target_path[0], reason);
    }

    let common = source_path[shared - 1];
    if common == source {
        // target is nested under source and is deployed as part of it
        return Ok(());
    }
    if common == target {
        return Err(StackrefError::NestedStackDependsOnParent {
            nested: tree.path(source),
            parent: tree.path(target),
            reason: reason.to_string(),
        });
    }

    let source_child = tree.stack(source_path[shared])?.nested_stack_resource();
    let target_child = tree.stack(target_path[shared])?.nested_stack_resource();
    let (Some(source_resource), Some(target_resource)) = (source_child, target_child) else {
        return Err(StackrefError::assertion(format!(
            "nested stacks under '{}' are missing their nested stack resources",
            tree.path(common)
        )));
    };

    match tree.node_mut(source_resource).kind_mut() {
        NodeKind::NestedStackResource(resource) => {
            resource.depends_on.insert(target_resource);
        }
        _ => return Err(StackrefError::assertion("nested stack resource has the wrong kind")),
    }
    debug!(
        "'{}' depends on sibling '{}' within '{}' ({})",
        tree.path(source_path[shared]),
        tree.path(target_path[shared]),
        tree.path(common),
        reason
    );
    Ok(())
}

fn add_assembly_dependency(tree: &mut ConstructTree, source: NodeId, target: NodeId, reason: &str) -> Result<()> {
    if tree.stack(source)?.is_nested() || tree.stack(target)?.is_nested() {
        return Err(StackrefError::assertion("cannot add assembly-level dependencies for nested stacks"));
    }

    if let Some(existing) = dependency_reasons(tree, target, source) {
        return Err(StackrefError::CyclicDependency {
            source_stack: tree.path(source),
            target: tree.path(target),
            existing: existing.join(", "),
            reason: reason.to_string(),
        });
    }

    let source_path = tree.path(source);
    let target_path = tree.path(target);
    let reasons = tree.stack_mut(source)?.dependencies.entry(target).or_default();
    if !reasons.iter().any(|r| r == reason) {
        reasons.push(reason.to_string());
        debug!("Stack '{}' depends on '{}': {}", source_path, target_path, reason);
    }
    Ok(())
}

/// Reasons along a dependency path from `from` to `to`, if `from` depends on `to`.
///
/// A stack trivially depends on itself with no reasons.
#[must_use]
pub fn dependency_reasons(tree: &ConstructTree, from: NodeId, to: NodeId) -> Option<Vec<String>> {
    if from == to {
        return Some(Vec::new());
    }

    let stack = tree.stack(from).ok()?;
    for (dependency, reasons) in stack.dependencies() {
        if let Some(rest) = dependency_reasons(tree, dependency, to) {
            return Some(reasons.iter().cloned().chain(rest).collect());
        }
    }
    None
}
