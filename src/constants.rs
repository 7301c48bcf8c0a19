//! Global constants used throughout the stackref codebase.
//!
//! Naming constants in this module are part of the persisted template format:
//! changing any of them changes generated logical ids and export names.

/// Construct id of the per-stack scope that holds generated export outputs.
pub const EXPORTS_SCOPE_ID: &str = "Exports";

/// Prefix of the construct id of parameters created for parent-to-nested references.
pub const REFERENCE_PARAMETER_PREFIX: &str = "reference-to-";

/// Prefix of the construct id of outputs created under the exports scope.
pub const EXPORT_OUTPUT_PREFIX: &str = "Output";

/// Suffix of the construct id of the resource representing a nested stack in its parent.
pub const NESTED_STACK_RESOURCE_SUFFIX: &str = ".NestedStackResource";

/// Attribute prefix used to read a nested stack output from its parent.
pub const NESTED_OUTPUT_ATTRIBUTE_PREFIX: &str = "Outputs.";

/// Resource type of a nested stack inside its parent's template.
pub const NESTED_STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Maximum length of an export name accepted by the deployment backend.
pub const MAX_EXPORT_NAME_LENGTH: usize = 255;

/// Maximum length of a generated unique id.
pub const MAX_ID_LENGTH: usize = 255;

/// Maximum length of the human-readable part of a generated unique id.
pub const MAX_HUMAN_ID_LENGTH: usize = 240;

/// Number of hex characters of the path hash appended to unique ids.
pub const ID_HASH_LENGTH: usize = 8;

/// Separator used when hashing construct paths.
pub const PATH_SEPARATOR: &str = "/";

/// Construct id skipped entirely when computing unique ids.
pub const HIDDEN_ID: &str = "Default";

/// Construct id omitted from the human-readable part of unique ids.
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// Marker that opens an unresolved placeholder inside a string.
pub const PLACEHOLDER_OPEN: &str = "${";

/// Account shown for environment-agnostic stacks.
pub const UNKNOWN_ACCOUNT: &str = "unknown-account";

/// Region shown for environment-agnostic stacks.
pub const UNKNOWN_REGION: &str = "unknown-region";

/// Name of the assembly manifest written next to the templates.
pub const ASSEMBLY_MANIFEST_FILE: &str = "manifest.json";

/// Environment variable overriding the global configuration path.
pub const CONFIG_ENV_VAR: &str = "STACKREF_CONFIG";
