//! App manifest parsing and construct tree building.
//!
//! An app manifest declares the stacks of one application together with their
//! nested stacks, resources, parameters and outputs. It can be written in TOML,
//! JSON or YAML; the format is picked from the file extension.
//!
//! # Manifest Format
//!
//! ```toml
//! name = "App"
//!
//! [[stacks]]
//! id = "Producer"
//! account = "111111111111"
//! region = "us-east-1"
//!
//! [[stacks.resources]]
//! id = "Bucket"
//! type = "AWS::S3::Bucket"
//!
//! [[stacks]]
//! id = "Consumer"
//! account = "111111111111"
//! region = "us-east-1"
//!
//! [[stacks.resources]]
//! id = "Queue"
//! type = "AWS::SQS::Queue"
//! properties = { QueueName = { "Fn::GetAtt" = ["Producer/Bucket", "Arn"] } }
//! ```
//!
//! # References
//!
//! Property values are JSON-like. Two object shapes are treated as references
//! to other elements, addressed by their construct path below the app:
//!
//! - `{"Ref": "<path>"}` reads the element itself
//! - `{"Fn::GetAtt": ["<path>", "<attribute>"]}` reads a named attribute
//!
//! `{"Ref": "AWS::Region"}` and the other `AWS::` names are pseudo parameters.
//! References may point at elements declared anywhere in the manifest, before
//! or after the referencing element.
//!
//! # Scopes
//!
//! A stack may set `scope = "Stage/Blue"` to be placed below grouping scopes
//! instead of directly below the app. Scopes are created on first use.

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::PATH_SEPARATOR;
use crate::core::{Result, StackrefError};
use crate::tokens::{Expr, PseudoParameter, Reference, Token};
use crate::tree::{
    CfnOutput, CfnParameter, CfnResource, ConstructTree, Environment, NodeId, NodeKind, StackProps,
};

fn default_app_name() -> String {
    "App".to_string()
}

fn default_parameter_type() -> String {
    "String".to_string()
}

/// Serialization format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Pick the format from a file extension; unknown extensions are read as TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

/// Root of an app manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Construct id of the app root.
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub stacks: Vec<StackManifest>,
}

/// A stack, top-level or nested.
///
/// `stack_name`, `account`, `region` and `scope` only apply to top-level
/// stacks; nested stacks inherit their parent's deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackManifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Grouping scopes between the app and the stack, `/`-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceManifest>,
    #[serde(default)]
    pub parameters: Vec<ParameterManifest>,
    #[serde(default)]
    pub outputs: Vec<OutputManifest>,
    #[serde(default)]
    pub nested: Vec<StackManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    /// Properties that must be set for the resource to render.
    #[serde(default)]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterManifest {
    pub id: String,
    #[serde(rename = "type", default = "default_parameter_type")]
    pub parameter_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputManifest {
    pub id: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Element values converted once every node exists.
enum Pending {
    Properties(NodeId, BTreeMap<String, Value>),
    Default(NodeId, Value),
    OutputValue(NodeId, Value),
}

impl AppManifest {
    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not parse in the format
    /// implied by its extension.
    pub fn load(path: &Path) -> AnyResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read app manifest: {}", path.display()))?;

        let format = ManifestFormat::from_path(path);
        let manifest = Self::parse(&content, format, &path.display().to_string())
            .with_context(|| format!("Invalid app manifest: {}", path.display()))?;
        debug!("Loaded app '{}' with {} stacks from {}", manifest.name, manifest.stacks.len(), path.display());
        Ok(manifest)
    }

    /// Parse manifest text. `file` is only used in error messages.
    pub fn parse(content: &str, format: ManifestFormat, file: &str) -> Result<Self> {
        let parsed: std::result::Result<Self, String> = match format {
            ManifestFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| StackrefError::ManifestParseError {
            file: file.to_string(),
            reason,
        })
    }

    /// Build the app into `tree` and return its root.
    ///
    /// All constructs are created first; property values are converted in a
    /// second pass so references can point at elements declared later.
    pub fn build(&self, tree: &mut ConstructTree) -> Result<NodeId> {
        if self.stacks.is_empty() {
            return Err(StackrefError::ManifestValidationError {
                reason: format!("app '{}' declares no stacks", self.name),
            });
        }

        let app = tree.add_app(self.name.clone());
        let mut pending = Vec::new();

        for stack in &self.stacks {
            let scope = match &stack.scope {
                Some(path) => ensure_scopes(tree, app, path)?,
                None => app,
            };
            let environment = Environment {
                account: stack.account.clone(),
                region: stack.region.clone(),
            };
            let node = tree.add_stack(scope, stack.id.clone(), StackProps {
                stack_name: stack.stack_name.clone(),
                environment,
            })?;
            add_stack_contents(tree, node, stack, &mut pending)?;
        }

        for item in pending {
            match item {
                Pending::Properties(node, properties) => {
                    let converted = properties
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), to_expr(tree, app, v)?)))
                        .collect::<Result<BTreeMap<_, _>>>()?;
                    if let NodeKind::Resource(resource) = tree.node_mut(node).kind_mut() {
                        resource.properties = converted;
                    }
                }
                Pending::Default(node, value) => {
                    let converted = to_expr(tree, app, &value)?;
                    if let NodeKind::Parameter(parameter) = tree.node_mut(node).kind_mut() {
                        parameter.default = Some(converted);
                    }
                }
                Pending::OutputValue(node, value) => {
                    let converted = to_expr(tree, app, &value)?;
                    if let NodeKind::Output(output) = tree.node_mut(node).kind_mut() {
                        output.value = converted;
                    }
                }
            }
        }

        debug!("Built app '{}' with {} constructs", self.name, tree.len());
        Ok(app)
    }
}

fn ensure_scopes(tree: &mut ConstructTree, app: NodeId, path: &str) -> Result<NodeId> {
    let mut current = app;
    for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
        current = match tree.try_find_child(current, segment) {
            Some(existing) if matches!(tree.node(existing).kind(), NodeKind::Scope) => existing,
            Some(_) => {
                return Err(StackrefError::ManifestValidationError {
                    reason: format!("scope '{path}' collides with an existing construct"),
                });
            }
            None => tree.add_scope(current, segment)?,
        };
    }
    Ok(current)
}

fn add_stack_contents(
    tree: &mut ConstructTree,
    stack: NodeId,
    manifest: &StackManifest,
    pending: &mut Vec<Pending>,
) -> Result<()> {
    for resource in &manifest.resources {
        let mut cfn = CfnResource::new(resource.resource_type.clone());
        cfn.required_properties = resource.required.clone();
        let node = tree.add_resource(stack, resource.id.clone(), cfn)?;
        pending.push(Pending::Properties(node, resource.properties.clone()));
    }

    for parameter in &manifest.parameters {
        let node = tree.add_parameter(stack, parameter.id.clone(), CfnParameter {
            parameter_type: parameter.parameter_type.clone(),
            default: None,
            description: parameter.description.clone(),
        })?;
        if let Some(default) = &parameter.default {
            pending.push(Pending::Default(node, default.clone()));
        }
    }

    for output in &manifest.outputs {
        let mut cfn = CfnOutput::new(Expr::Null);
        cfn.export_name = output.export_name.clone();
        cfn.description = output.description.clone();
        let node = tree.add_output(stack, output.id.clone(), cfn)?;
        pending.push(Pending::OutputValue(node, output.value.clone()));
    }

    for nested in &manifest.nested {
        if nested.account.is_some() || nested.region.is_some() || nested.stack_name.is_some() || nested.scope.is_some()
        {
            warn!(
                "Nested stack '{}' inherits its deployment from '{}'; stack_name, account, region and scope are ignored",
                nested.id,
                tree.path(stack)
            );
        }
        let node = tree.add_nested_stack(stack, nested.id.clone())?;
        add_stack_contents(tree, node, nested, pending)?;
    }

    Ok(())
}

/// Convert a manifest value into an expression, turning reference shapes into tokens.
fn to_expr(tree: &ConstructTree, app: NodeId, value: &Value) -> Result<Expr> {
    Ok(match value {
        Value::Null => Expr::Null,
        Value::Bool(b) => Expr::Bool(*b),
        Value::Number(n) => Expr::Number(n.clone()),
        Value::String(s) => Expr::String(s.clone()),
        Value::Array(items) => {
            Expr::List(items.iter().map(|item| to_expr(tree, app, item)).collect::<Result<_>>()?)
        }
        Value::Object(entries) => {
            if entries.len() == 1 {
                if let Some(Value::String(target)) = entries.get("Ref") {
                    return ref_expr(tree, app, target);
                }
                if let Some(args) = entries.get("Fn::GetAtt") {
                    return get_att_expr(tree, app, args);
                }
            }
            Expr::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), to_expr(tree, app, v)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            )
        }
    })
}

fn ref_expr(tree: &ConstructTree, app: NodeId, target: &str) -> Result<Expr> {
    if target.starts_with("AWS::") {
        let pseudo = PseudoParameter::parse(target).ok_or_else(|| StackrefError::ManifestValidationError {
            reason: format!("unknown pseudo parameter '{target}'"),
        })?;
        return Ok(Expr::Token(Token::Pseudo(pseudo)));
    }
    Ok(Expr::reference(Reference::to_ref(resolve_target(tree, app, target)?)))
}

fn get_att_expr(tree: &ConstructTree, app: NodeId, args: &Value) -> Result<Expr> {
    let (target, attribute) = match args.as_array().map(Vec::as_slice) {
        Some([Value::String(target), Value::String(attribute)]) => (target, attribute),
        _ => {
            return Err(StackrefError::ManifestValidationError {
                reason: format!("Fn::GetAtt expects [\"<path>\", \"<attribute>\"], got {args}"),
            });
        }
    };
    Ok(Expr::reference(Reference::get_att(resolve_target(tree, app, target)?, attribute.clone())))
}

fn resolve_target(tree: &ConstructTree, app: NodeId, path: &str) -> Result<NodeId> {
    let node = tree.find_by_path(app, path).ok_or_else(|| StackrefError::UnknownConstruct {
        path: path.to_string(),
    })?;

    match tree.node(node).kind() {
        NodeKind::Resource(_) | NodeKind::Parameter(_) | NodeKind::NestedStackResource(_) => Ok(node),
        NodeKind::Output(_) => Err(StackrefError::InvalidReferenceTarget {
            path: path.to_string(),
            reason: "outputs cannot be referenced".to_string(),
        }),
        NodeKind::App | NodeKind::Stack(_) | NodeKind::Scope => Err(StackrefError::InvalidReferenceTarget {
            path: path.to_string(),
            reason: "only template elements can be referenced".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::find_references;
    use std::io::Write;

    const TWO_STACKS: &str = r#"
name = "Shop"

[[stacks]]
id = "Consumer"
account = "111111111111"
region = "us-east-1"

[[stacks.resources]]
id = "Queue"
type = "AWS::SQS::Queue"
properties = { QueueName = { "Fn::GetAtt" = ["Producer/Bucket", "Arn"] }, Region = { Ref = "AWS::Region" } }

[[stacks]]
id = "Producer"
stack_name = "producer"
account = "111111111111"
region = "us-east-1"

[[stacks.resources]]
id = "Bucket"
type = "AWS::S3::Bucket"

[[stacks.outputs]]
id = "BucketName"
value = { Ref = "Producer/Bucket" }
"#;

    #[test]
    fn test_forward_references_resolve() {
        let manifest = AppManifest::parse(TWO_STACKS, ManifestFormat::Toml, "app.toml").unwrap();
        let mut tree = ConstructTree::new();
        let app = manifest.build(&mut tree).unwrap();

        assert_eq!(tree.node(app).id(), "Shop");
        let queue = tree.find_by_path(app, "Consumer/Queue").unwrap();
        let bucket = tree.find_by_path(app, "Producer/Bucket").unwrap();
        let NodeKind::Resource(resource) = tree.node(queue).kind() else {
            panic!("expected resource");
        };
        assert_eq!(
            find_references(&Expr::Map(resource.properties.clone())),
            vec![Reference::get_att(bucket, "Arn")]
        );
        assert_eq!(resource.properties["Region"], Expr::Token(Token::Pseudo(PseudoParameter::Region)));

        let producer = tree.find_by_path(app, "Producer").unwrap();
        assert_eq!(tree.stack(producer).unwrap().stack_name(), Some("producer"));
    }

    #[test]
    fn test_formats_by_extension() {
        assert_eq!(ManifestFormat::from_path(Path::new("app.json")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("app.YML")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("app.toml")), ManifestFormat::Toml);
        assert_eq!(ManifestFormat::from_path(Path::new("app")), ManifestFormat::Toml);
    }

    #[test]
    fn test_yaml_with_nested_stacks_and_scopes() {
        let yaml = r#"
stacks:
  - id: Parent
    scope: Stage
    resources:
      - id: Bucket
        type: AWS::S3::Bucket
    nested:
      - id: Child
        resources:
          - id: Queue
            type: AWS::SQS::Queue
            properties:
              Source:
                Ref: Stage/Parent/Bucket
"#;
        let manifest = AppManifest::parse(yaml, ManifestFormat::Yaml, "app.yaml").unwrap();
        let mut tree = ConstructTree::new();
        let app = manifest.build(&mut tree).unwrap();

        let child = tree.find_by_path(app, "Stage/Parent/Child").unwrap();
        assert!(tree.stack(child).unwrap().is_nested());
        assert!(tree.find_by_path(app, "Stage/Parent/Child.NestedStackResource").is_some());
        assert!(tree.find_by_path(app, "Stage/Parent/Child/Queue").is_some());
    }

    #[test]
    fn test_json_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"stacks": [{{"id": "Solo", "parameters": [{{"id": "Env", "default": "prod"}}]}}]}}"#
        )
        .unwrap();

        let manifest = AppManifest::load(file.path()).unwrap();
        assert_eq!(manifest.name, "App");
        assert_eq!(manifest.stacks[0].parameters[0].parameter_type, "String");
    }

    #[test]
    fn test_invalid_references_are_rejected() {
        let unknown = r#"
[[stacks]]
id = "S"
[[stacks.resources]]
id = "R"
type = "AWS::SQS::Queue"
properties = { X = { Ref = "S/Missing" } }
"#;
        let manifest = AppManifest::parse(unknown, ManifestFormat::Toml, "app.toml").unwrap();
        let err = manifest.build(&mut ConstructTree::new()).unwrap_err();
        assert!(matches!(err, StackrefError::UnknownConstruct { .. }));

        let stack_target = unknown.replace("S/Missing", "S");
        let manifest = AppManifest::parse(&stack_target, ManifestFormat::Toml, "app.toml").unwrap();
        let err = manifest.build(&mut ConstructTree::new()).unwrap_err();
        assert!(matches!(err, StackrefError::InvalidReferenceTarget { .. }));

        let pseudo = unknown.replace("S/Missing", "AWS::Nope");
        let manifest = AppManifest::parse(&pseudo, ManifestFormat::Toml, "app.toml").unwrap();
        assert!(manifest.build(&mut ConstructTree::new()).is_err());
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        let err = AppManifest::parse("stacks = [", ManifestFormat::Toml, "broken.toml").unwrap_err();
        let StackrefError::ManifestParseError { file, .. } = err else {
            panic!("expected parse error");
        };
        assert_eq!(file, "broken.toml");
    }

    #[test]
    fn test_empty_app_is_rejected() {
        let manifest = AppManifest::parse("name = \"Empty\"", ManifestFormat::Toml, "app.toml").unwrap();
        let err = manifest.build(&mut ConstructTree::new()).unwrap_err();
        assert!(matches!(err, StackrefError::ManifestValidationError { .. }));
    }
}
