//! Deployable template elements.
//!
//! Each element renders to a template fragment ([`Expr`]) that may embed
//! reference tokens. Rendering fails with [`StackrefError::Synthesis`] when the
//! element's own properties are incomplete.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{Result, StackrefError};
use crate::tokens::Expr;

use super::NodeId;

/// A resource definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CfnResource {
    pub resource_type: String,
    pub properties: BTreeMap<String, Expr>,
    /// Property names that must be present for the resource to render.
    pub required_properties: Vec<String>,
}

impl CfnResource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Builder-style property setter.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required_properties.push(name.into());
        self
    }

    pub(crate) fn to_fragment(&self, path: &str) -> Result<Expr> {
        if self.resource_type.is_empty() {
            return Err(StackrefError::Synthesis {
                path: path.to_string(),
                reason: "resource type is empty".to_string(),
            });
        }

        if let Some(missing) =
            self.required_properties.iter().find(|name| !self.properties.contains_key(*name))
        {
            return Err(StackrefError::Synthesis {
                path: path.to_string(),
                reason: format!("required property '{missing}' is not set"),
            });
        }

        let mut fragment = BTreeMap::new();
        fragment.insert("Type".to_string(), Expr::String(self.resource_type.clone()));
        if !self.properties.is_empty() {
            fragment.insert("Properties".to_string(), Expr::Map(self.properties.clone()));
        }
        Ok(Expr::Map(fragment))
    }
}

/// A template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnParameter {
    pub parameter_type: String,
    pub default: Option<Expr>,
    pub description: Option<String>,
}

impl CfnParameter {
    /// A `String` parameter without default.
    #[must_use]
    pub fn string() -> Self {
        Self {
            parameter_type: "String".to_string(),
            default: None,
            description: None,
        }
    }

    pub(crate) fn to_fragment(&self) -> Expr {
        let mut fragment = BTreeMap::new();
        fragment.insert("Type".to_string(), Expr::String(self.parameter_type.clone()));
        if let Some(default) = &self.default {
            fragment.insert("Default".to_string(), default.clone());
        }
        if let Some(description) = &self.description {
            fragment.insert("Description".to_string(), Expr::String(description.clone()));
        }
        Expr::Map(fragment)
    }
}

/// A template output, optionally exported under a name.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnOutput {
    pub value: Expr,
    pub export_name: Option<String>,
    pub description: Option<String>,
}

impl CfnOutput {
    pub fn new(value: impl Into<Expr>) -> Self {
        Self {
            value: value.into(),
            export_name: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }

    pub(crate) fn to_fragment(&self, path: &str) -> Result<Expr> {
        if self.value == Expr::Null {
            return Err(StackrefError::Synthesis {
                path: path.to_string(),
                reason: "output value is not set".to_string(),
            });
        }

        let mut fragment = BTreeMap::new();
        fragment.insert("Value".to_string(), self.value.clone());
        if let Some(description) = &self.description {
            fragment.insert("Description".to_string(), Expr::String(description.clone()));
        }
        if let Some(name) = &self.export_name {
            fragment.insert("Export".to_string(), Expr::map([("Name", Expr::String(name.clone()))]));
        }
        Ok(Expr::Map(fragment))
    }
}

/// The resource representing a nested stack inside its parent's template.
///
/// Its parameters are read from the nested stack's bindings at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedStackResource {
    /// The nested stack this resource deploys
    pub stack: NodeId,
    /// Sibling nested stack resources that must be deployed first
    pub depends_on: BTreeSet<NodeId>,
}

impl NestedStackResource {
    #[must_use]
    pub const fn new(stack: NodeId) -> Self {
        Self {
            stack,
            depends_on: BTreeSet::new(),
        }
    }
}
