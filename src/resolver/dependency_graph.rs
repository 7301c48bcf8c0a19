//! Stack dependency graph for deployment ordering.
//!
//! This module provides the graph data structure and algorithms needed to turn
//! the dependency edges recorded on top-level stacks into a deployment order,
//! including cycle detection.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

use crate::core::{Result, StackrefError};
use crate::tree::{ConstructTree, NodeId};

/// A top-level stack in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackNode {
    /// The stack's node in the construct tree.
    pub id: NodeId,
    /// Construct path, used for display.
    pub path: String,
}

impl fmt::Display for StackNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Dependency graph between top-level stacks.
///
/// An edge `a -> b` means `a` consumes a value from `b`, so `b` deploys first.
/// Edge weights carry the reasons recorded during reference resolution.
pub struct DependencyGraph {
    /// The underlying directed graph.
    graph: DiGraph<StackNode, Vec<String>>,
    /// Map from tree nodes to their graph indices.
    node_map: HashMap<NodeId, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Build the graph of every top-level stack below `root`.
    pub fn from_tree(tree: &ConstructTree, root: NodeId) -> Result<Self> {
        let mut graph = Self::new();
        for stack in tree.stacks(root) {
            if tree.stack(stack)?.is_nested() {
                continue;
            }
            graph.ensure_node(StackNode {
                id: stack,
                path: tree.path(stack),
            });
            for (dependency, reasons) in tree.stack(stack)?.dependencies() {
                graph.add_dependency(
                    StackNode {
                        id: stack,
                        path: tree.path(stack),
                    },
                    StackNode {
                        id: dependency,
                        path: tree.path(dependency),
                    },
                    reasons,
                );
            }
        }
        Ok(graph)
    }

    /// Add a node to the graph if it doesn't already exist.
    ///
    /// Returns the node index in the graph.
    fn ensure_node(&mut self, node: StackNode) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&node.id) {
            index
        } else {
            let id = node.id;
            let index = self.graph.add_node(node);
            self.node_map.insert(id, index);
            index
        }
    }

    /// Add a dependency relationship to the graph.
    ///
    /// `from` depends on `to`, meaning `to` must be deployed before `from`.
    /// Reasons for an existing edge are merged.
    pub fn add_dependency(&mut self, from: StackNode, to: StackNode, reasons: &[String]) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if let Some(edge) = self.graph.find_edge(from_idx, to_idx) {
            let existing = &mut self.graph[edge];
            for reason in reasons {
                if !existing.contains(reason) {
                    existing.push(reason.clone());
                }
            }
        } else {
            self.graph.add_edge(from_idx, to_idx, reasons.to_vec());
        }
    }

    /// Detect cycles in the dependency graph using DFS with colors.
    ///
    /// Returns an error containing the cycle path if a cycle is detected.
    pub fn detect_cycles(&self) -> Result<()> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                let cycle = cycle.iter().map(|i| self.graph[*i].path.clone()).collect::<Vec<_>>().join(" → ");
                return Err(StackrefError::DeploymentCycle { cycle });
            }
        }

        Ok(())
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is detected, None otherwise.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Get the deployment order.
    ///
    /// Returns stacks in an order where every stack comes after the stacks it
    /// depends on.
    pub fn topological_order(&self) -> Result<Vec<StackNode>> {
        self.detect_cycles()?;

        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect()),
            Err(_) => Err(StackrefError::assertion("failed to determine deployment order")),
        }
    }

    /// Direct dependencies of `stack` with their reasons.
    pub fn direct_dependencies(&self, stack: NodeId) -> Vec<(StackNode, Vec<String>)> {
        let Some(&idx) = self.node_map.get(&stack) else {
            return Vec::new();
        };
        self.graph
            .edges(idx)
            .map(|edge| {
                use petgraph::visit::EdgeRef;
                (self.graph[edge.target()].clone(), edge.weight().clone())
            })
            .collect()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the total number of edges (dependencies) in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
