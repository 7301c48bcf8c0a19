//! Stacks: deployment units and their per-stack resolution state.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::constants::{UNKNOWN_ACCOUNT, UNKNOWN_REGION};
use crate::resolver::exports::ExportRegistry;
use crate::tokens::{Reference, ResolvedValue, is_unresolved};

use super::NodeId;

/// Target account and region of a stack.
///
/// Missing or placeholder values make the stack environment-agnostic in that
/// dimension; agnostic environments compare equal to each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    /// An environment-agnostic stack.
    #[must_use]
    pub const fn agnostic() -> Self {
        Self {
            account: None,
            region: None,
        }
    }

    /// Canonical `aws://account/region` form used for comparisons.
    #[must_use]
    pub fn uri(&self) -> String {
        let concrete = |value: &Option<String>, unknown: &'static str| match value {
            Some(v) if !is_unresolved(v) => v.clone(),
            _ => unknown.to_string(),
        };
        format!(
            "aws://{}/{}",
            concrete(&self.account, UNKNOWN_ACCOUNT),
            concrete(&self.region, UNKNOWN_REGION)
        )
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Construction-time properties of a stack.
#[derive(Debug, Clone, Default)]
pub struct StackProps {
    /// Explicit physical stack name
    pub stack_name: Option<String>,
    /// Target environment; ignored for nested stacks, which inherit their parent's
    pub environment: Environment,
}

/// A deployment unit.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub(crate) stack_name: Option<String>,
    pub(crate) environment: Environment,
    pub(crate) parent_stack: Option<NodeId>,
    pub(crate) nested_stack_resource: Option<NodeId>,
    /// Assembly-level edges: producer stack -> reasons.
    pub(crate) dependencies: BTreeMap<NodeId, Vec<String>>,
    /// Resolution cache for references consumed by this stack.
    pub(crate) replacements: HashMap<Reference, ResolvedValue>,
    /// Parameter logical id -> value supplied by the parent stack.
    pub(crate) parameter_bindings: BTreeMap<String, ResolvedValue>,
    pub(crate) exports: Option<ExportRegistry>,
}

impl Stack {
    /// Physical stack name; `None` for nested stacks, whose name is only known at deploy time.
    #[must_use]
    pub fn stack_name(&self) -> Option<&str> {
        self.stack_name.as_deref()
    }

    /// The environment as declared on this stack.
    ///
    /// Use [`super::ConstructTree::environment_of`] for the effective environment of nested stacks.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// The stack this one is nested in.
    #[must_use]
    pub const fn parent_stack(&self) -> Option<NodeId> {
        self.parent_stack
    }

    #[must_use]
    pub const fn is_nested(&self) -> bool {
        self.parent_stack.is_some()
    }

    /// The element representing this stack inside its parent's template.
    #[must_use]
    pub const fn nested_stack_resource(&self) -> Option<NodeId> {
        self.nested_stack_resource
    }

    /// Whether a resolution for `reference` has been cached for this stack.
    #[must_use]
    pub fn has_value(&self, reference: &Reference) -> bool {
        self.replacements.contains_key(reference)
    }

    /// Cached resolution of `reference` for this stack.
    #[must_use]
    pub fn value(&self, reference: &Reference) -> Option<&ResolvedValue> {
        self.replacements.get(reference)
    }

    /// Cache `value` as the resolution of `reference`. The first assignment wins.
    pub fn assign_value(&mut self, reference: Reference, value: ResolvedValue) {
        self.replacements.entry(reference).or_insert(value);
    }

    /// Number of cached resolutions.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.replacements.len()
    }

    /// Stacks this stack must be deployed after, with the reasons.
    pub fn dependencies(&self) -> impl Iterator<Item = (NodeId, &[String])> {
        self.dependencies.iter().map(|(id, reasons)| (*id, reasons.as_slice()))
    }

    /// Values bound to this nested stack's parameters by its parent.
    #[must_use]
    pub const fn parameter_bindings(&self) -> &BTreeMap<String, ResolvedValue> {
        &self.parameter_bindings
    }

    /// The export registry, if anything has been exported yet.
    #[must_use]
    pub const fn exports(&self) -> Option<&ExportRegistry> {
        self.exports.as_ref()
    }
}
