//! Cross-stack reference resolution.
//!
//! Elements reference each other freely across stack boundaries while the
//! construct tree is built. Before templates can be rendered, every reference
//! has to be rewritten into something its consuming stack can express locally.
//! This module finds all such references and performs the rewriting.
//!
//! # Resolution Process
//!
//! 1. **Discovery**: [`find_all_references`] synthesizes every element below a
//!    root and collects the (source element, reference) pairs it embeds
//! 2. **Classification**: [`topology::classify`] decides how the value travels
//!    from the producing stack to the consuming stack
//! 3. **Rewriting**: [`resolve_value`] creates the parameters, outputs and
//!    exports that carry the value and returns its local form
//! 4. **Caching**: the local form is stored on the consuming stack, so a later
//!    pass over the same tree creates nothing new
//!
//! # Topologies
//!
//! | Relationship                          | Local form                              |
//! |---------------------------------------|-----------------------------------------|
//! | same stack                            | the reference itself                    |
//! | consumer nested in producer           | `Ref` to a generated parameter          |
//! | producer nested                       | `Fn::GetAtt` `Outputs.<id>` on the nested stack resource |
//! | independent stacks, same environment  | `Fn::ImportValue` of a generated export |
//!
//! Nested topologies recurse one nesting level at a time, so values cross any
//! number of levels. Each recursion step spends one unit of a budget derived
//! from the nesting depth of the two stacks.
//!
//! Export/import crossings also record a deploy-ordering dependency from the
//! consumer's top-level stack to the producer's (see [`dependencies`]).
//!
//! # Errors
//!
//! Resolution is fail-fast: the first error aborts the pass. Synthesis errors of
//! individual elements are the only exception; they are skipped during discovery
//! and surface again when the template is rendered.

pub mod dependencies;
pub mod dependency_graph;
pub mod exports;
pub mod nested;
pub mod topology;


use serde::Serialize;
use tracing::{debug, trace};

use crate::core::{Result, StackrefError};
use crate::synth::synthesize_element;
use crate::tokens::{Reference, ResolvedValue, find_references};
use crate::tree::{ConstructTree, NodeId};

pub use dependencies::add_dependency;
pub use dependency_graph::{DependencyGraph, StackNode};
pub use exports::{ExportRecord, ExportRegistry, create_import_value};
pub use topology::{Topology, classify, is_parent};

/// Options controlling generated names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Build export names from the scopes below the exporting stack only.
    ///
    /// When false, export names include every scope below the first level of
    /// the app, which matches names generated by older toolchains.
    pub stack_relative_exports: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            stack_relative_exports: true,
        }
    }
}

/// A reference discovered in an element's synthesized fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    /// The element whose fragment embeds the reference
    pub source: NodeId,
    pub reference: Reference,
}

/// Outcome of resolving one [`ReferenceSite`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    pub source: NodeId,
    /// Stack owning `source`
    pub consumer: NodeId,
    pub reference: Reference,
    pub topology: Topology,
    pub value: ResolvedValue,
}

/// Every reference handled by one [`resolve_references`] pass, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub references: Vec<ResolvedReference>,
}

impl ResolutionReport {
    /// References that leave their own stack.
    pub fn cross_stack(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.references.iter().filter(|r| r.topology != Topology::SameStack)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Collect every reference embedded in an element below `root`.
///
/// Elements that fail to synthesize because of their own incomplete
/// properties are skipped; any other failure is returned.
pub fn find_all_references(tree: &ConstructTree, root: NodeId) -> Result<Vec<ReferenceSite>> {
    let mut sites = Vec::new();

    for node in tree.find_all(root) {
        if !tree.node(node).kind().is_element() {
            continue;
        }

        let fragment = match synthesize_element(tree, node) {
            Ok(fragment) => fragment,
            Err(e) if e.is_synthesis() => {
                debug!("Skipping references of '{}': {}", tree.path(node), e);
                continue;
            }
            Err(e) => return Err(e),
        };

        sites.extend(find_references(&fragment).into_iter().map(|reference| ReferenceSite {
            source: node,
            reference,
        }));
    }

    Ok(sites)
}

/// Resolve every reference below `root` and cache the results on their consumers.
///
/// Running the pass again on the same tree creates no further constructs; the
/// report then lists the cached values.
pub fn resolve_references(
    tree: &mut ConstructTree,
    root: NodeId,
    options: &ResolverOptions,
) -> Result<ResolutionReport> {
    let sites = find_all_references(tree, root)?;
    debug!("Found {} references below '{}'", sites.len(), tree.path(root));

    let mut report = ResolutionReport::default();
    for ReferenceSite { source, reference } in sites {
        let consumer = tree.stack_of(source)?;
        let producer = tree.stack_of(reference.target)?;
        let topology = classify(tree, producer, consumer)?;

        let value = match tree.stack(consumer)?.value(&reference) {
            Some(cached) => {
                trace!("{} already resolved in '{}'", reference, tree.path(consumer));
                cached.clone()
            }
            None => resolve_value(tree, consumer, &reference, options)?,
        };

        report.references.push(ResolvedReference {
            source,
            consumer,
            reference,
            topology,
            value,
        });
    }

    Ok(report)
}

/// Rewrite `reference` into a form the stack `consumer` can use locally.
///
/// The result is cached on `consumer`; auxiliary parameters, outputs and
/// exports are created at most once per derived id.
///
/// # Errors
///
/// - [`StackrefError::CrossAppReference`] / [`StackrefError::CrossEnvironmentReference`]
///   for stacks that cannot exchange values
/// - [`StackrefError::UnresolvedExportName`] when an export would need a
///   non-concrete name
/// - [`StackrefError::ResolutionDepthExceeded`] if the tree's stack nesting is
///   inconsistent
pub fn resolve_value(
    tree: &mut ConstructTree,
    consumer: NodeId,
    reference: &Reference,
    options: &ResolverOptions,
) -> Result<ResolvedValue> {
    let producer = tree.stack_of(reference.target)?;
    let budget = tree.nesting_depth(producer) + tree.nesting_depth(consumer) + 2;
    resolve_bounded(tree, consumer, reference, options, budget)
}

fn resolve_bounded(
    tree: &mut ConstructTree,
    consumer: NodeId,
    reference: &Reference,
    options: &ResolverOptions,
    budget: usize,
) -> Result<ResolvedValue> {
    if let Some(cached) = tree.stack(consumer)?.value(reference) {
        return Ok(cached.clone());
    }

    let producer = tree.stack_of(reference.target)?;
    let topology = classify(tree, producer, consumer)?;
    trace!(
        "Resolving {} ({}) from '{}' in '{}'",
        tree.path(reference.target),
        reference.display_name(),
        tree.path(producer),
        tree.path(consumer)
    );

    if topology != Topology::SameStack && budget == 0 {
        return Err(StackrefError::ResolutionDepthExceeded {
            reference: format!("{}.{}", tree.path(reference.target), reference.display_name()),
            consumer: tree.path(consumer),
            depth: tree.nesting_depth(producer) + tree.nesting_depth(consumer) + 2,
        });
    }

    let value = match topology {
        Topology::SameStack => ResolvedValue::Reference(reference.clone()),
        Topology::ParentToNested => {
            let id = nested::parameter_id(tree, reference)?;
            let parameter = match nested::find_nested_stack_parameter(tree, consumer, &id)? {
                Some(parameter) => parameter,
                None => {
                    let parent = tree.parent_stack(consumer).ok_or_else(|| {
                        StackrefError::assertion(format!(
                            "'{}' is classified as nested but has no parent stack",
                            tree.path(consumer)
                        ))
                    })?;
                    let upstream = resolve_bounded(tree, parent, reference, options, budget - 1)?;
                    nested::create_nested_stack_parameter(tree, consumer, &id, upstream)?
                }
            };
            resolve_bounded(tree, consumer, &Reference::to_ref(parameter), options, budget - 1)?
        }
        Topology::NestedToOutside => {
            let output = nested::create_nested_stack_output(tree, producer, reference)?;
            resolve_bounded(tree, consumer, &output, options, budget - 1)?
        }
        Topology::ExportImport => {
            let reason = format!(
                "{} -> {}.{}",
                tree.path(consumer),
                tree.path(reference.target),
                reference.display_name()
            );
            add_dependency(tree, consumer, producer, &reason)?;
            create_import_value(tree, reference, options)?
        }
    };

    tree.stack_mut(consumer)?.assign_value(reference.clone(), value.clone());
    Ok(value)
}
