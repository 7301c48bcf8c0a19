//! Export registry and `Fn::ImportValue` creation.
//!
//! Every stack that exports values owns one registry, created on first use
//! together with an `Exports` scope in the construct tree. The scope gives the
//! generated outputs their own naming namespace, away from ordinary resources.
//!
//! Exported values are keyed by their concrete rendering in the exporting
//! stack: two references that render identically share one output and one
//! export name.

use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{
    EXPORT_OUTPUT_PREFIX, EXPORTS_SCOPE_ID, MAX_EXPORT_NAME_LENGTH, PATH_SEPARATOR,
};
use crate::core::{Result, StackrefError};
use crate::naming::make_unique_id;
use crate::synth::render_local_reference;
use crate::tokens::{Expr, Reference, ResolvedValue, is_unresolved};
use crate::tree::{CfnOutput, ConstructTree, NodeId, NodeKind};

use super::ResolverOptions;

/// One exported value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    /// The output carrying the export
    pub output: NodeId,
    /// The globally visible export name
    pub export_name: String,
}

/// Per-stack registry of exported values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRegistry {
    scope: NodeId,
    exports: BTreeMap<String, ExportRecord>,
}

impl ExportRegistry {
    const fn new(scope: NodeId) -> Self {
        Self {
            scope,
            exports: BTreeMap::new(),
        }
    }

    /// The `Exports` scope holding the generated outputs.
    #[must_use]
    pub const fn scope(&self) -> NodeId {
        self.scope
    }

    /// The export registered under the content key `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ExportRecord> {
        self.exports.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Registered exports ordered by content key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExportRecord)> {
        self.exports.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Export `reference` from its stack and return the import that reads it.
///
/// Creates the exporting stack's `Exports` scope and the export output on first
/// use; later calls for a value with the same rendering reuse them.
///
/// # Errors
///
/// [`StackrefError::UnresolvedExportName`] when the export name would contain a
/// placeholder, e.g. because the exporting stack's name is not concrete.
pub fn create_import_value(
    tree: &mut ConstructTree,
    reference: &Reference,
    options: &ResolverOptions,
) -> Result<ResolvedValue> {
    let exporting_stack = tree.stack_of(reference.target)?;
    let scope = exports_scope(tree, exporting_stack)?;

    let resolved = render_local_reference(tree, exporting_stack, reference)?;
    let rendered = serde_json::to_string(&resolved).map_err(|e| StackrefError::Other {
        message: format!("Failed to serialize exported value: {e}"),
    })?;
    let id = format!("{EXPORT_OUTPUT_PREFIX}{rendered}");

    if let Some(record) = tree.stack(exporting_stack)?.exports().and_then(|r| r.get(&id)) {
        return Ok(ResolvedValue::Import {
            export_name: record.export_name.clone(),
        });
    }

    let export_name = generate_export_name(tree, scope, &id, options)?;
    let output = tree.add_output(
        scope,
        id.clone(),
        CfnOutput::new(Expr::reference(reference.clone())).with_export_name(export_name.clone()),
    )?;
    debug!("Exported {} from '{}' as {}", rendered, tree.path(exporting_stack), export_name);

    let registry = tree
        .stack_mut(exporting_stack)?
        .exports
        .as_mut()
        .ok_or_else(|| StackrefError::assertion("export registry disappeared"))?;
    registry.exports.insert(
        id,
        ExportRecord {
            output,
            export_name: export_name.clone(),
        },
    );

    Ok(ResolvedValue::Import { export_name })
}

/// The singleton `Exports` scope of `stack`, created on first use.
pub fn exports_scope(tree: &mut ConstructTree, stack: NodeId) -> Result<NodeId> {
    if let Some(registry) = tree.stack(stack)?.exports() {
        return Ok(registry.scope());
    }

    let scope = match tree.try_find_child(stack, EXPORTS_SCOPE_ID) {
        Some(existing) if matches!(tree.node(existing).kind(), NodeKind::Scope) => existing,
        Some(_) => {
            return Err(StackrefError::assertion(format!(
                "'{}/{EXPORTS_SCOPE_ID}' is reserved for generated exports",
                tree.path(stack)
            )));
        }
        None => tree.add_scope(stack, EXPORTS_SCOPE_ID)?,
    };

    tree.stack_mut(stack)?.exports = Some(ExportRegistry::new(scope));
    Ok(scope)
}

/// Derive the export name for the output `id` under the exports `scope`.
///
/// The name is `<stackName>:<uniqueId>` (or just `<uniqueId>` for unnamed
/// stacks), where the unique id covers the scope path below the stack and `id`.
/// Over-long names keep their tail, which holds the distinguishing hash.
pub fn generate_export_name(
    tree: &ConstructTree,
    scope: NodeId,
    id: &str,
    options: &ResolverOptions,
) -> Result<String> {
    let stack = tree.stack_of(scope)?;
    let skip = if options.stack_relative_exports {
        tree.scopes(stack).len()
    } else {
        // legacy naming drops only the app and the first scope below it
        2
    };

    let mut components: Vec<String> =
        tree.scopes(scope).into_iter().skip(skip).map(|s| tree.node(s).id().to_string()).collect();
    components.push(id.to_string());

    let prefix = tree.stack(stack)?.stack_name().map(|name| format!("{name}:")).unwrap_or_default();
    if is_unresolved(&prefix) || components.iter().any(|c| is_unresolved(c)) {
        return Err(StackrefError::UnresolvedExportName {
            name: format!("{prefix}{}", components.join(PATH_SEPARATOR)),
        });
    }

    let local = make_unique_id(&components)?;
    let keep = MAX_EXPORT_NAME_LENGTH.saturating_sub(prefix.len());
    let start = local.len().saturating_sub(keep);
    Ok(format!("{prefix}{}", &local[start..]))
}
