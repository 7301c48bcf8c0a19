//! Template rendering and cloud assembly output.
//!
//! Rendering turns the element fragments of one stack into a template document.
//! Reference tokens are rendered through the consuming stack's resolution
//! cache, so [`crate::resolver::resolve_references`] must have run first; a
//! reference to another stack that was never resolved is an error rather than
//! a silently broken template.
//!
//! [`synthesize`] runs resolution and renders every stack below an app into a
//! [`CloudAssembly`], which [`CloudAssembly::write_to`] persists as one
//! template file per stack plus a `manifest.json` describing the artifacts.

use anyhow::{Context, Result as AnyResult};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::{ASSEMBLY_MANIFEST_FILE, NESTED_STACK_RESOURCE_TYPE};
use crate::core::{Result, StackrefError};
use crate::resolver::{DependencyGraph, ResolutionReport, ResolverOptions, resolve_references};
use crate::tokens::{Attribute, Expr, Reference, ResolvedValue, Token};
use crate::tree::{ConstructTree, NestedStackResource, NodeId, NodeKind};

/// Version string written into assembly manifests.
pub const ASSEMBLY_VERSION: &str = "1.0.0";

/// Synthesize the template fragment of a single element.
///
/// The fragment still contains reference tokens; see [`render_expr`].
pub fn synthesize_element(tree: &ConstructTree, node: NodeId) -> Result<Expr> {
    let path = tree.path(node);
    match tree.node(node).kind() {
        NodeKind::Resource(resource) => resource.to_fragment(&path),
        NodeKind::Parameter(parameter) => Ok(parameter.to_fragment()),
        NodeKind::Output(output) => output.to_fragment(&path),
        NodeKind::NestedStackResource(resource) => nested_stack_fragment(tree, resource),
        NodeKind::App | NodeKind::Stack(_) | NodeKind::Scope => {
            Err(StackrefError::assertion(format!("'{path}' is not a template element")))
        }
    }
}

fn nested_stack_fragment(tree: &ConstructTree, resource: &NestedStackResource) -> Result<Expr> {
    let nested = tree.stack(resource.stack)?;

    let mut properties = BTreeMap::new();
    properties.insert("TemplateURL".to_string(), Expr::String(nested_template_file(tree, resource.stack)?));
    if !nested.parameter_bindings().is_empty() {
        properties.insert(
            "Parameters".to_string(),
            Expr::Map(nested.parameter_bindings().iter().map(|(k, v)| (k.clone(), v.to_expr())).collect()),
        );
    }

    let mut fragment = BTreeMap::new();
    fragment.insert("Type".to_string(), Expr::String(NESTED_STACK_RESOURCE_TYPE.to_string()));
    fragment.insert("Properties".to_string(), Expr::Map(properties));
    if !resource.depends_on.is_empty() {
        let depends_on = resource
            .depends_on
            .iter()
            .map(|sibling| tree.logical_id(*sibling).map(Expr::String))
            .collect::<Result<Vec<_>>>()?;
        fragment.insert("DependsOn".to_string(), Expr::List(depends_on));
    }
    Ok(Expr::Map(fragment))
}

fn nested_template_file(tree: &ConstructTree, stack: NodeId) -> Result<String> {
    Ok(format!("{}.nested.template.json", tree.unique_id(stack)?))
}

fn template_file(tree: &ConstructTree, stack: NodeId) -> Result<String> {
    if tree.stack(stack)?.is_nested() {
        nested_template_file(tree, stack)
    } else {
        Ok(format!("{}.template.json", tree.unique_id(stack)?))
    }
}

/// Render `expr` into concrete JSON as seen from `stack`.
pub fn render_expr(tree: &ConstructTree, stack: NodeId, expr: &Expr) -> Result<Value> {
    Ok(match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Number(n) => Value::Number(n.clone()),
        Expr::String(s) => Value::String(s.clone()),
        Expr::List(items) => {
            Value::Array(items.iter().map(|item| render_expr(tree, stack, item)).collect::<Result<_>>()?)
        }
        Expr::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), render_expr(tree, stack, v)?)))
                .collect::<Result<Map<_, _>>>()?,
        ),
        Expr::Token(Token::Reference(reference)) => render_reference(tree, stack, reference)?,
        Expr::Token(Token::Pseudo(pseudo)) => json!({ "Ref": pseudo.name() }),
    })
}

/// Render a reference consumed by `stack`, using its cached resolution if any.
pub fn render_reference(tree: &ConstructTree, stack: NodeId, reference: &Reference) -> Result<Value> {
    match tree.stack(stack)?.value(reference) {
        Some(ResolvedValue::Import { export_name }) => Ok(json!({ "Fn::ImportValue": export_name })),
        Some(ResolvedValue::Reference(local)) => render_local_reference(tree, stack, local),
        None => render_local_reference(tree, stack, reference),
    }
}

/// Render a reference whose target lives in `stack` itself.
///
/// # Errors
///
/// [`StackrefError::UnresolvedReference`] when the target belongs to another stack.
pub fn render_local_reference(tree: &ConstructTree, stack: NodeId, reference: &Reference) -> Result<Value> {
    if tree.stack_of(reference.target)? != stack {
        return Err(StackrefError::UnresolvedReference {
            reference: format!("{}.{}", tree.path(reference.target), reference.display_name()),
            stack: tree.path(stack),
        });
    }

    let logical_id = tree.logical_id(reference.target)?;
    Ok(match &reference.attribute {
        Attribute::Ref => json!({ "Ref": logical_id }),
        Attribute::GetAtt(name) => json!({ "Fn::GetAtt": [logical_id, name] }),
    })
}

/// Render the template of `stack`.
///
/// Elements of nested stacks are not part of their parent's template; the
/// parent only holds the nested stack resource.
pub fn render_stack(tree: &ConstructTree, stack: NodeId) -> Result<Value> {
    let mut parameters = Map::new();
    let mut resources = Map::new();
    let mut outputs = Map::new();

    for node in tree.find_all(stack) {
        let kind = tree.node(node).kind();
        if !kind.is_element() || tree.stack_of(node)? != stack {
            continue;
        }

        let section = match kind {
            NodeKind::Parameter(_) => &mut parameters,
            NodeKind::Output(_) => &mut outputs,
            _ => &mut resources,
        };

        let logical_id = tree.logical_id(node)?;
        let rendered = render_expr(tree, stack, &synthesize_element(tree, node)?)?;
        if section.insert(logical_id.clone(), rendered).is_some() {
            return Err(StackrefError::Synthesis {
                path: tree.path(node),
                reason: format!("logical id '{logical_id}' is used by more than one element"),
            });
        }
    }

    let mut template = Map::new();
    for (name, section) in [("Parameters", parameters), ("Resources", resources), ("Outputs", outputs)] {
        if !section.is_empty() {
            template.insert(name.to_string(), Value::Object(section));
        }
    }
    Ok(Value::Object(template))
}

/// One rendered stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackArtifact {
    /// Artifact id, the stack's unique id
    pub id: String,
    /// Construct path
    pub path: String,
    pub stack_name: Option<String>,
    pub environment: String,
    pub template_file: String,
    #[serde(skip)]
    pub template: Value,
    /// Artifact ids of the stacks this one deploys after
    pub dependencies: Vec<String>,
    /// Artifact id of the parent, for nested stacks
    pub parent: Option<String>,
}

/// The rendered output of an app.
#[derive(Debug, Clone, Serialize)]
pub struct CloudAssembly {
    pub version: String,
    /// Stacks in tree order
    pub artifacts: Vec<StackArtifact>,
    /// Artifact ids of top-level stacks, producers first
    pub deploy_order: Vec<String>,
    #[serde(skip)]
    pub report: ResolutionReport,
}

impl CloudAssembly {
    /// Look up an artifact by id or construct path.
    #[must_use]
    pub fn artifact(&self, name: &str) -> Option<&StackArtifact> {
        self.artifacts.iter().find(|a| a.id == name || a.path == name)
    }

    /// Write every template and the assembly manifest into `dir`.
    pub async fn write_to(&self, dir: &Path) -> AnyResult<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        for artifact in &self.artifacts {
            let path = dir.join(&artifact.template_file);
            let content = serde_json::to_string_pretty(&artifact.template)
                .with_context(|| format!("Failed to serialize template of '{}'", artifact.path))?;
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("Failed to write template: {}", path.display()))?;
            debug!("Wrote {}", path.display());
        }

        let manifest_path = dir.join(ASSEMBLY_MANIFEST_FILE);
        let manifest = serde_json::to_string_pretty(self).context("Failed to serialize assembly manifest")?;
        tokio::fs::write(&manifest_path, manifest)
            .await
            .with_context(|| format!("Failed to write assembly manifest: {}", manifest_path.display()))?;

        info!("Wrote {} stack templates to {}", self.artifacts.len(), dir.display());
        Ok(())
    }
}

/// Resolve all references below `root` and render every stack.
pub fn synthesize(tree: &mut ConstructTree, root: NodeId, options: &ResolverOptions) -> Result<CloudAssembly> {
    let report = resolve_references(tree, root, options)?;

    let tree = &*tree;
    let graph = DependencyGraph::from_tree(tree, root)?;
    let deploy_order = graph
        .topological_order()?
        .into_iter()
        .map(|node| tree.unique_id(node.id))
        .collect::<Result<Vec<_>>>()?;

    let mut artifacts = Vec::new();
    for stack_id in tree.stacks(root) {
        let stack = tree.stack(stack_id)?;
        let dependencies = stack
            .dependencies()
            .map(|(dependency, _)| tree.unique_id(dependency))
            .collect::<Result<Vec<_>>>()?;
        let parent = stack.parent_stack().map(|p| tree.unique_id(p)).transpose()?;

        artifacts.push(StackArtifact {
            id: tree.unique_id(stack_id)?,
            path: tree.path(stack_id),
            stack_name: stack.stack_name().map(str::to_string),
            environment: tree.environment_of(stack_id)?.uri(),
            template_file: template_file(tree, stack_id)?,
            template: render_stack(tree, stack_id)?,
            dependencies,
            parent,
        });
    }

    debug!("Synthesized {} stacks below '{}'", artifacts.len(), tree.path(root));
    Ok(CloudAssembly {
        version: ASSEMBLY_VERSION.to_string(),
        artifacts,
        deploy_order,
        report,
    })
}
