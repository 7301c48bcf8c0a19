//! The construct tree: apps, stacks, scopes and deployable elements.
//!
//! All nodes live in one arena ([`ConstructTree`]) and are addressed by
//! [`NodeId`]. An arena may hold several independent apps; each app is a root.
//! Node kinds are a tagged variant ([`NodeKind`]) so narrowing a node is a
//! pattern match.
//!
//! Paths follow the usual construct convention: the ids from below the app root
//! down to the node, joined by `/`. Unique ids and logical ids are derived from
//! those paths with [`make_unique_id`].

mod elements;
mod stack;

pub use elements::{CfnOutput, CfnParameter, CfnResource, NestedStackResource};
pub use stack::{Environment, Stack, StackProps};

use serde::Serialize;
use std::fmt;

use crate::constants::{NESTED_STACK_RESOURCE_SUFFIX, PATH_SEPARATOR};
use crate::core::{Result, StackrefError};
use crate::naming::make_unique_id;

/// Stable identity of a node in a [`ConstructTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an id from a raw arena index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Root of an application.
    App,
    Stack(Stack),
    /// Plain grouping construct.
    Scope,
    Resource(CfnResource),
    Parameter(CfnParameter),
    Output(CfnOutput),
    NestedStackResource(NestedStackResource),
}

impl NodeKind {
    /// Whether the node renders into a stack template.
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(
            self,
            Self::Resource(_) | Self::Parameter(_) | Self::Output(_) | Self::NestedStackResource(_)
        )
    }
}

/// A node of the construct tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    /// The construct id, unique among siblings.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub const fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }
}

/// Arena holding one or more construct trees.
#[derive(Debug, Clone, Default)]
pub struct ConstructTree {
    nodes: Vec<Node>,
}

impl ConstructTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new application root.
    pub fn add_app(&mut self, id: impl Into<String>) -> NodeId {
        let index = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id: id.into(),
            parent: None,
            children: Vec::new(),
            kind: NodeKind::App,
        });
        index
    }

    /// Add a child node under `parent`.
    ///
    /// # Errors
    ///
    /// Fails when the id is empty, contains the path separator, or is already
    /// used by a sibling.
    pub fn add_child(&mut self, parent: NodeId, id: impl Into<String>, kind: NodeKind) -> Result<NodeId> {
        let id = id.into();
        if id.is_empty() || id.contains(PATH_SEPARATOR) {
            return Err(StackrefError::ManifestValidationError {
                reason: format!("invalid construct id '{id}' under '{}'", self.path(parent)),
            });
        }
        if self.try_find_child(parent, &id).is_some() {
            return Err(StackrefError::DuplicateConstructId {
                parent: self.path(parent),
                id,
            });
        }

        let index = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(index);
        Ok(index)
    }

    /// Add a top-level stack under `scope` (an app or a grouping scope).
    ///
    /// Without an explicit name the stack is named after its path.
    pub fn add_stack(&mut self, scope: NodeId, id: impl Into<String>, props: StackProps) -> Result<NodeId> {
        let id = id.into();
        if self.enclosing_stack(scope).is_some() {
            return Err(StackrefError::ManifestValidationError {
                reason: format!(
                    "stack '{id}' is defined inside another stack; use a nested stack instead"
                ),
            });
        }

        let node = self.add_child(scope, id, NodeKind::Stack(Stack::default()))?;
        let default_name = self
            .path_components(node)
            .iter()
            .map(|c| c.chars().filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-').collect::<String>())
            .collect::<Vec<_>>()
            .join("-");

        let stack = self.stack_mut(node)?;
        stack.stack_name = Some(props.stack_name.unwrap_or(default_name));
        stack.environment = props.environment;
        Ok(node)
    }

    /// Add a nested stack under `scope`, which must be inside a stack.
    ///
    /// Also creates the nested stack resource that represents it in the parent's
    /// template, as a sibling named `<id>.NestedStackResource`.
    pub fn add_nested_stack(&mut self, scope: NodeId, id: impl Into<String>) -> Result<NodeId> {
        let id = id.into();
        let parent_stack = self.enclosing_stack(scope).ok_or_else(|| {
            StackrefError::ManifestValidationError {
                reason: format!("nested stack '{id}' must be defined inside a stack"),
            }
        })?;

        let node = self.add_child(scope, id.clone(), NodeKind::Stack(Stack::default()))?;
        let resource = self.add_child(
            scope,
            format!("{id}{NESTED_STACK_RESOURCE_SUFFIX}"),
            NodeKind::NestedStackResource(NestedStackResource::new(node)),
        )?;

        let stack = self.stack_mut(node)?;
        stack.parent_stack = Some(parent_stack);
        stack.nested_stack_resource = Some(resource);
        Ok(node)
    }

    /// Add a grouping scope.
    pub fn add_scope(&mut self, parent: NodeId, id: impl Into<String>) -> Result<NodeId> {
        self.add_child(parent, id, NodeKind::Scope)
    }

    pub fn add_resource(&mut self, scope: NodeId, id: impl Into<String>, resource: CfnResource) -> Result<NodeId> {
        self.require_stack_scope(scope)?;
        self.add_child(scope, id, NodeKind::Resource(resource))
    }

    pub fn add_parameter(&mut self, scope: NodeId, id: impl Into<String>, parameter: CfnParameter) -> Result<NodeId> {
        self.require_stack_scope(scope)?;
        self.add_child(scope, id, NodeKind::Parameter(parameter))
    }

    pub fn add_output(&mut self, scope: NodeId, id: impl Into<String>, output: CfnOutput) -> Result<NodeId> {
        self.require_stack_scope(scope)?;
        self.add_child(scope, id, NodeKind::Output(output))
    }

    fn require_stack_scope(&self, scope: NodeId) -> Result<()> {
        if self.enclosing_stack(scope).is_none() {
            return Err(StackrefError::ManifestValidationError {
                reason: format!("elements must be defined inside a stack, not under '{}'", self.path(scope)),
            });
        }
        Ok(())
    }

    /// Access a node. Panics on ids from another arena.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The stack data of a stack node.
    pub fn stack(&self, id: NodeId) -> Result<&Stack> {
        match &self.node(id).kind {
            NodeKind::Stack(stack) => Ok(stack),
            _ => Err(StackrefError::assertion(format!("'{}' is not a stack", self.path(id)))),
        }
    }

    pub fn stack_mut(&mut self, id: NodeId) -> Result<&mut Stack> {
        if !matches!(self.node(id).kind, NodeKind::Stack(_)) {
            return Err(StackrefError::assertion(format!("'{}' is not a stack", self.path(id))));
        }
        match &mut self.nodes[id.0].kind {
            NodeKind::Stack(stack) => Ok(stack),
            _ => unreachable!("checked above"),
        }
    }

    #[must_use]
    pub fn is_stack(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Stack(_))
    }

    /// Child of `parent` with construct id `id`.
    #[must_use]
    pub fn try_find_child(&self, parent: NodeId, id: &str) -> Option<NodeId> {
        self.node(parent).children.iter().copied().find(|c| self.node(*c).id == id)
    }

    /// All nodes from the root down to `id`, inclusive.
    #[must_use]
    pub fn scopes(&self, id: NodeId) -> Vec<NodeId> {
        let mut scopes = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            scopes.push(parent);
            current = parent;
        }
        scopes.reverse();
        scopes
    }

    /// Root (app) of the tree containing `id`.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.scopes(id)[0]
    }

    /// Construct ids from below the root down to `id`.
    #[must_use]
    pub fn path_components(&self, id: NodeId) -> Vec<String> {
        self.scopes(id).into_iter().skip(1).map(|s| self.node(s).id.clone()).collect()
    }

    /// The `/`-joined path of `id`; empty for an app root.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        self.path_components(id).join(PATH_SEPARATOR)
    }

    /// Look up a node by its path below `root`.
    #[must_use]
    pub fn find_by_path(&self, root: NodeId, path: &str) -> Option<NodeId> {
        path.split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .try_fold(root, |current, segment| self.try_find_child(current, segment))
    }

    /// All nodes below `root` (inclusive), in pre-order.
    #[must_use]
    pub fn find_all(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    /// All stacks below `root`, top-level and nested, in pre-order.
    #[must_use]
    pub fn stacks(&self, root: NodeId) -> Vec<NodeId> {
        self.find_all(root).into_iter().filter(|n| self.is_stack(*n)).collect()
    }

    /// Nearest stack containing `id`, including `id` itself.
    #[must_use]
    pub fn enclosing_stack(&self, id: NodeId) -> Option<NodeId> {
        self.scopes(id).into_iter().rev().find(|s| self.is_stack(*s))
    }

    /// Stack owning `id`.
    ///
    /// # Errors
    ///
    /// [`StackrefError::AssertionFailed`] when `id` is not inside any stack.
    pub fn stack_of(&self, id: NodeId) -> Result<NodeId> {
        self.enclosing_stack(id).ok_or_else(|| {
            StackrefError::assertion(format!("'{}' is not defined within a stack", self.path(id)))
        })
    }

    /// The stack `stack` is nested in, if any.
    #[must_use]
    pub fn parent_stack(&self, stack: NodeId) -> Option<NodeId> {
        self.stack(stack).ok().and_then(Stack::parent_stack)
    }

    /// Chain of stacks from the top-level ancestor down to `stack`.
    #[must_use]
    pub fn stack_lineage(&self, stack: NodeId) -> Vec<NodeId> {
        let mut lineage = vec![stack];
        let mut current = stack;
        // a well-formed tree never has more stacks than nodes
        while let Some(parent) = self.parent_stack(current) {
            if lineage.len() > self.nodes.len() {
                break;
            }
            lineage.push(parent);
            current = parent;
        }
        lineage.reverse();
        lineage
    }

    /// Top-level ancestor of `stack` (itself when not nested).
    #[must_use]
    pub fn top_level_stack(&self, stack: NodeId) -> NodeId {
        self.stack_lineage(stack)[0]
    }

    /// How many stacks `stack` is nested in.
    #[must_use]
    pub fn nesting_depth(&self, stack: NodeId) -> usize {
        self.stack_lineage(stack).len() - 1
    }

    /// Effective environment: nested stacks share their top-level ancestor's.
    pub fn environment_of(&self, stack: NodeId) -> Result<&Environment> {
        Ok(self.stack(self.top_level_stack(stack))?.environment())
    }

    /// Unique id of a node: its path below the root, made unique.
    pub fn unique_id(&self, id: NodeId) -> Result<String> {
        make_unique_id(&self.path_components(id))
    }

    /// Logical id of an element: its path below its owning stack, made unique.
    pub fn logical_id(&self, element: NodeId) -> Result<String> {
        let stack = self.stack_of(element)?;
        let components: Vec<String> = self
            .scopes(element)
            .into_iter()
            .skip_while(|s| *s != stack)
            .skip(1)
            .map(|s| self.node(s).id.clone())
            .collect();
        make_unique_id(&components)
    }
}
