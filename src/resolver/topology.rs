//! Classification of the relationship between a producing and a consuming stack.

use serde::Serialize;
use std::fmt;

use crate::core::{Result, StackrefError};
use crate::tree::{ConstructTree, NodeId};

/// How a value travels from its producing stack to its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Producer and consumer are the same stack; the reference is used as-is.
    SameStack,
    /// The consumer is nested (directly or transitively) in the producer;
    /// the value flows down through a stack parameter.
    ParentToNested,
    /// The producer is a nested stack; the value flows up through an output.
    NestedToOutside,
    /// Independent top-level stacks; the value is exported and imported.
    ExportImport,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SameStack => "same-stack",
            Self::ParentToNested => "parent-to-nested",
            Self::NestedToOutside => "nested-to-outside",
            Self::ExportImport => "export-import",
        })
    }
}

/// Classify how `consumer` can read a value produced in `producer`.
///
/// The environment check compares the top-level ancestors of both stacks and
/// only applies when they differ: stacks sharing a top-level ancestor are
/// related by nesting and always deploy to the same environment, whatever
/// their own environment fields say.
///
/// # Errors
///
/// - [`StackrefError::CrossAppReference`] when the stacks belong to different apps
/// - [`StackrefError::CrossEnvironmentReference`] when unrelated stacks target
///   different environments
pub fn classify(tree: &ConstructTree, producer: NodeId, consumer: NodeId) -> Result<Topology> {
    if tree.root_of(producer) != tree.root_of(consumer) {
        return Err(StackrefError::CrossAppReference {
            consumer: tree.path(consumer),
            producer: tree.path(producer),
        });
    }

    let producer_top = tree.top_level_stack(producer);
    let consumer_top = tree.top_level_stack(consumer);
    if producer_top != consumer_top {
        let producer_env = tree.stack(producer_top)?.environment().uri();
        let consumer_env = tree.stack(consumer_top)?.environment().uri();
        if producer_env != consumer_env {
            return Err(StackrefError::CrossEnvironmentReference {
                consumer: tree.path(consumer),
                producer: tree.path(producer),
                consumer_env,
                producer_env,
            });
        }
    }

    if producer == consumer {
        return Ok(Topology::SameStack);
    }

    if is_parent(tree, producer, consumer) {
        return Ok(Topology::ParentToNested);
    }

    if tree.stack(producer)?.is_nested() {
        return Ok(Topology::NestedToOutside);
    }

    Ok(Topology::ExportImport)
}

/// Whether `ancestor` appears in the chain of stacks `stack` is nested in.
///
/// False for a stack that is not nested; false for `ancestor == stack`.
#[must_use]
pub fn is_parent(tree: &ConstructTree, ancestor: NodeId, stack: NodeId) -> bool {
    let mut current = tree.parent_stack(stack);
    let mut steps = 0;
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        steps += 1;
        if steps > tree.len() {
            return false;
        }
        current = tree.parent_stack(parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Environment, StackProps};

    fn props(account: &str) -> StackProps {
        StackProps {
            stack_name: None,
            environment: Environment::new(account, "us-east-1"),
        }
    }

    #[test]
    fn test_is_parent() {
        let mut tree = ConstructTree::new();
        let app = tree.add_app("App");
        let a = tree.add_stack(app, "A", props("1")).unwrap();
        let b = tree.add_nested_stack(a, "B").unwrap();
        let c = tree.add_nested_stack(b, "C").unwrap();
        let other = tree.add_stack(app, "Other", props("1")).unwrap();

        assert!(is_parent(&tree, a, b));
        assert!(is_parent(&tree, b, c));
        assert!(is_parent(&tree, a, c));
        assert!(!is_parent(&tree, c, a));
        assert!(!is_parent(&tree, a, a));
        assert!(!is_parent(&tree, a, other));
        assert!(!is_parent(&tree, other, c));
    }

    #[test]
    fn test_classification_order() {
        let mut tree = ConstructTree::new();
        let app = tree.add_app("App");
        let a = tree.add_stack(app, "A", props("1")).unwrap();
        let nested = tree.add_nested_stack(a, "Nested").unwrap();
        let sibling = tree.add_nested_stack(a, "Sibling").unwrap();
        let b = tree.add_stack(app, "B", props("1")).unwrap();

        assert_eq!(classify(&tree, a, a).unwrap(), Topology::SameStack);
        assert_eq!(classify(&tree, a, nested).unwrap(), Topology::ParentToNested);
        assert_eq!(classify(&tree, nested, a).unwrap(), Topology::NestedToOutside);
        assert_eq!(classify(&tree, nested, sibling).unwrap(), Topology::NestedToOutside);
        assert_eq!(classify(&tree, nested, b).unwrap(), Topology::NestedToOutside);
        assert_eq!(classify(&tree, a, b).unwrap(), Topology::ExportImport);
    }

    #[test]
    fn test_cross_app_and_cross_environment() {
        let mut tree = ConstructTree::new();
        let app1 = tree.add_app("App1");
        let app2 = tree.add_app("App2");
        let a = tree.add_stack(app1, "A", props("1")).unwrap();
        let b = tree.add_stack(app2, "B", props("1")).unwrap();
        let c = tree.add_stack(app1, "C", props("2")).unwrap();

        assert!(matches!(classify(&tree, a, b), Err(StackrefError::CrossAppReference { .. })));
        assert!(matches!(
            classify(&tree, a, c),
            Err(StackrefError::CrossEnvironmentReference { .. })
        ));
    }

    #[test]
    fn test_nested_stack_environment_fields_are_ignored() {
        let mut tree = ConstructTree::new();
        let app = tree.add_app("App");
        let parent = tree.add_stack(app, "Parent", StackProps::default()).unwrap();
        let child = tree.add_nested_stack(parent, "Child").unwrap();

        // placeholders that differ textually must not make the pair cross-environment
        tree.stack_mut(parent).unwrap().environment =
            Environment::new("${Token[AccountId.1]}", "${Token[Region.2]}");
        tree.stack_mut(child).unwrap().environment =
            Environment::new("${Token[AccountId.7]}", "${Token[Region.8]}");

        assert_eq!(classify(&tree, parent, child).unwrap(), Topology::ParentToNested);
        assert_eq!(classify(&tree, child, parent).unwrap(), Topology::NestedToOutside);
    }
}
