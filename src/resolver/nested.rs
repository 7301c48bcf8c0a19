//! Parameter and output wiring across nested stack boundaries.

use tracing::debug;

use crate::constants::{NESTED_OUTPUT_ATTRIBUTE_PREFIX, REFERENCE_PARAMETER_PREFIX};
use crate::core::{Result, StackrefError};
use crate::tokens::{Expr, Reference, ResolvedValue};
use crate::tree::{CfnOutput, CfnParameter, ConstructTree, NodeId, NodeKind};

/// Construct id of the parameter that carries `reference` into a nested stack.
pub fn parameter_id(tree: &ConstructTree, reference: &Reference) -> Result<String> {
    Ok(format!(
        "{REFERENCE_PARAMETER_PREFIX}{}.{}",
        tree.unique_id(reference.target)?,
        reference.display_name()
    ))
}

/// Construct id of the output that publishes `reference` from a nested stack.
pub fn output_id(tree: &ConstructTree, reference: &Reference) -> Result<String> {
    Ok(format!("{}{}", tree.unique_id(reference.target)?, reference.display_name()))
}

/// Existing reference parameter `id` on `nested`, if already created.
pub fn find_nested_stack_parameter(tree: &ConstructTree, nested: NodeId, id: &str) -> Result<Option<NodeId>> {
    match tree.try_find_child(nested, id) {
        None => Ok(None),
        Some(node) if matches!(tree.node(node).kind(), NodeKind::Parameter(_)) => Ok(Some(node)),
        Some(_) => Err(StackrefError::assertion(format!(
            "'{}/{id}' exists but is not a parameter",
            tree.path(nested)
        ))),
    }
}

/// Create the parameter `id` on `nested` and bind it to `value`.
///
/// `value` must already be resolved in the context of the parent stack, since
/// the binding is rendered into the parent's nested stack resource.
pub fn create_nested_stack_parameter(
    tree: &mut ConstructTree,
    nested: NodeId,
    id: &str,
    value: ResolvedValue,
) -> Result<NodeId> {
    let stack = tree.stack(nested)?;
    if !stack.is_nested() || stack.nested_stack_resource().is_none() {
        return Err(StackrefError::assertion(format!(
            "stack '{}' receives a parameter from its parent but is not a nested stack",
            tree.path(nested)
        )));
    }

    let parameter = tree.add_parameter(nested, id, CfnParameter::string())?;
    let logical_id = tree.logical_id(parameter)?;
    debug!("Created parameter {} on nested stack '{}'", logical_id, tree.path(nested));

    tree.stack_mut(nested)?.parameter_bindings.insert(logical_id, value);
    Ok(parameter)
}

/// Publish `reference` from the nested stack `producer` through an output.
///
/// Returns the attribute reference that reads the output from the producer's
/// nested stack resource, one level up in the parent stack.
pub fn create_nested_stack_output(
    tree: &mut ConstructTree,
    producer: NodeId,
    reference: &Reference,
) -> Result<Reference> {
    let resource = tree.stack(producer)?.nested_stack_resource().ok_or_else(|| {
        StackrefError::assertion(format!(
            "nested stack '{}' has no nested stack resource",
            tree.path(producer)
        ))
    })?;

    let id = output_id(tree, reference)?;
    let output = match tree.try_find_child(producer, &id) {
        Some(existing) if matches!(tree.node(existing).kind(), NodeKind::Output(_)) => existing,
        Some(_) => {
            return Err(StackrefError::assertion(format!(
                "'{}/{id}' exists but is not an output",
                tree.path(producer)
            )));
        }
        None => {
            let output = tree.add_output(producer, id, CfnOutput::new(Expr::reference(reference.clone())))?;
            debug!("Created output {} on nested stack '{}'", tree.logical_id(output)?, tree.path(producer));
            output
        }
    };

    let logical_id = tree.logical_id(output)?;
    Ok(Reference::get_att(resource, format!("{NESTED_OUTPUT_ATTRIBUTE_PREFIX}{logical_id}")))
}
