//! Error handling for stackref
//!
//! This module provides the error taxonomy of the reference resolution engine and
//! user-friendly error reporting for the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so the engine can filter failures by kind
//! 2. **User-friendly messages** that locate the offending reference in the tree
//!
//! # Architecture
//!
//! - [`StackrefError`] - Enumerated error types for every failure mode
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Error Categories
//!
//! - **Topology**: [`StackrefError::CrossAppReference`],
//!   [`StackrefError::CrossEnvironmentReference`]
//! - **Naming**: [`StackrefError::UnresolvedExportName`],
//!   [`StackrefError::UnresolvedIdComponent`], [`StackrefError::EmptyIdComponents`]
//! - **Dependencies**: [`StackrefError::CyclicDependency`],
//!   [`StackrefError::DeploymentCycle`], [`StackrefError::NestedStackDependsOnParent`]
//! - **Internal invariants**: [`StackrefError::AssertionFailed`],
//!   [`StackrefError::ResolutionDepthExceeded`]
//! - **Synthesis**: [`StackrefError::Synthesis`] is the only recoverable kind; the
//!   reference scanner swallows it and leaves the diagnostic to validation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use stackref_cli::core::{StackrefError, user_friendly_error};
//!
//! let error = StackrefError::CrossAppReference {
//!     consumer: "Consumer".to_string(),
//!     producer: "Producer".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for stackref operations.
///
/// Every variant carries enough context (construct paths, attribute names) to
/// locate the offending element in the construct tree.
#[derive(Error, Debug)]
pub enum StackrefError {
    /// Producer and consumer belong to different application roots.
    #[error(
        "Stack \"{consumer}\" cannot reference \"{producer}\": cross-stack references are only supported within one application"
    )]
    CrossAppReference {
        /// Path of the consuming stack
        consumer: String,
        /// Path of the producing stack
        producer: String,
    },

    /// Producer and consumer are deployed to different environments.
    #[error(
        "Stack \"{consumer}\" cannot consume a cross reference from stack \"{producer}\". Cross stack references are only supported for stacks deployed to the same environment or between nested stacks and their parent stack ({consumer_env} != {producer_env})"
    )]
    CrossEnvironmentReference {
        /// Path of the consuming stack
        consumer: String,
        /// Path of the producing stack
        producer: String,
        /// Environment of the consuming stack
        consumer_env: String,
        /// Environment of the producing stack
        producer_env: String,
    },

    /// A generated export name still contains an unresolved placeholder.
    #[error("Unresolved token in generated export name: {name}")]
    UnresolvedExportName {
        /// The export name as generated
        name: String,
    },

    /// A unique id was requested for components containing placeholders.
    #[error("ID components may not include unresolved tokens: {components}")]
    UnresolvedIdComponent {
        /// The offending components joined with `/`
        components: String,
    },

    /// A unique id was requested for an empty component list.
    #[error("Unable to calculate a unique id for an empty set of components")]
    EmptyIdComponents,

    /// An internal invariant was violated.
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// What was expected
        message: String,
    },

    /// An element could not be rendered because of its own properties.
    #[error("Failed to synthesize \"{path}\": {reason}")]
    Synthesis {
        /// Path of the element
        path: String,
        /// Why rendering failed
        reason: String,
    },

    /// Adding a dependency edge would close a cycle.
    #[error(
        "'{target}' depends on '{source_stack}' ({existing}). Adding this dependency ({reason}) would create a cyclic reference."
    )]
    CyclicDependency {
        /// Stack that would gain the dependency
        source_stack: String,
        /// Stack it would depend on
        target: String,
        /// Reasons of the existing reverse path
        existing: String,
        /// Reason of the rejected edge
        reason: String,
    },

    /// The stack dependency graph contains a cycle.
    #[error("Circular stack dependency detected: {cycle}")]
    DeploymentCycle {
        /// The cycle, rendered as `a → b → a`
        cycle: String,
    },

    /// A nested stack tried to depend on one of its ancestors.
    #[error("Nested stack '{nested}' cannot depend on a parent stack '{parent}': {reason}")]
    NestedStackDependsOnParent {
        /// Path of the nested stack
        nested: String,
        /// Path of the ancestor stack
        parent: String,
        /// Reason of the rejected edge
        reason: String,
    },

    /// Resolution did not terminate within the nesting-derived bound.
    #[error("Resolving {reference} for \"{consumer}\" exceeded the maximum depth of {depth}")]
    ResolutionDepthExceeded {
        /// Display form of the reference
        reference: String,
        /// Path of the consuming stack
        consumer: String,
        /// The bound that was exceeded
        depth: usize,
    },

    /// Two children of the same scope share an id.
    #[error("There is already a construct with id '{id}' in '{parent}'")]
    DuplicateConstructId {
        /// Path of the scope
        parent: String,
        /// The duplicated id
        id: String,
    },

    /// A construct path does not exist in the tree.
    #[error("No construct found at path '{path}'")]
    UnknownConstruct {
        /// The requested path
        path: String,
    },

    /// A reference targets something that cannot be referenced.
    #[error("'{path}' cannot be the target of a reference: {reason}")]
    InvalidReferenceTarget {
        /// Path of the target
        path: String,
        /// Why it cannot be referenced
        reason: String,
    },

    /// A cross-stack reference reached rendering without being resolved.
    #[error("Reference {reference} used in stack \"{stack}\" has not been resolved")]
    UnresolvedReference {
        /// Display form of the reference
        reference: String,
        /// Path of the rendering stack
        stack: String,
    },

    /// The app manifest could not be parsed.
    #[error("Invalid app manifest {file}: {reason}")]
    ManifestParseError {
        /// Manifest path
        file: String,
        /// Parser message
        reason: String,
    },

    /// The app manifest is well-formed but describes an invalid app.
    #[error("App manifest validation failed: {reason}")]
    ManifestValidationError {
        /// What is wrong
        reason: String,
    },

    /// Configuration file problems.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for cases not covered by specific variants.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl StackrefError {
    /// Whether this error stems from an element's own invalid properties.
    ///
    /// The reference scanner defers these to validation instead of aborting.
    #[must_use]
    pub const fn is_synthesis(&self) -> bool {
        matches!(self, Self::Synthesis { .. })
    }

    /// Shorthand for [`StackrefError::AssertionFailed`].
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }
}

impl Clone for StackrefError {
    fn clone(&self) -> Self {
        match self {
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::CrossAppReference { consumer, producer } => Self::CrossAppReference {
                consumer: consumer.clone(),
                producer: producer.clone(),
            },
            Self::CrossEnvironmentReference {
                consumer,
                producer,
                consumer_env,
                producer_env,
            } => Self::CrossEnvironmentReference {
                consumer: consumer.clone(),
                producer: producer.clone(),
                consumer_env: consumer_env.clone(),
                producer_env: producer_env.clone(),
            },
            Self::UnresolvedExportName { name } => Self::UnresolvedExportName { name: name.clone() },
            Self::UnresolvedIdComponent { components } => Self::UnresolvedIdComponent {
                components: components.clone(),
            },
            Self::EmptyIdComponents => Self::EmptyIdComponents,
            Self::AssertionFailed { message } => Self::AssertionFailed {
                message: message.clone(),
            },
            Self::Synthesis { path, reason } => Self::Synthesis {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::CyclicDependency {
                source_stack,
                target,
                existing,
                reason,
            } => Self::CyclicDependency {
                source_stack: source_stack.clone(),
                target: target.clone(),
                existing: existing.clone(),
                reason: reason.clone(),
            },
            Self::DeploymentCycle { cycle } => Self::DeploymentCycle {
                cycle: cycle.clone(),
            },
            Self::NestedStackDependsOnParent { nested, parent, reason } => {
                Self::NestedStackDependsOnParent {
                    nested: nested.clone(),
                    parent: parent.clone(),
                    reason: reason.clone(),
                }
            }
            Self::ResolutionDepthExceeded { reference, consumer, depth } => {
                Self::ResolutionDepthExceeded {
                    reference: reference.clone(),
                    consumer: consumer.clone(),
                    depth: *depth,
                }
            }
            Self::DuplicateConstructId { parent, id } => Self::DuplicateConstructId {
                parent: parent.clone(),
                id: id.clone(),
            },
            Self::UnknownConstruct { path } => Self::UnknownConstruct { path: path.clone() },
            Self::InvalidReferenceTarget { path, reason } => Self::InvalidReferenceTarget {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::UnresolvedReference { reference, stack } => Self::UnresolvedReference {
                reference: reference.clone(),
                stack: stack.clone(),
            },
            Self::ManifestParseError { file, reason } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ManifestValidationError { reason } => Self::ManifestValidationError {
                reason: reason.clone(),
            },
            Self::ConfigError { message } => Self::ConfigError {
                message: message.clone(),
            },
            Self::Other { message } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Combines a [`StackrefError`] with optional details (yellow) and a suggestion
/// (green) for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: StackrefError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: StackrefError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`StackrefError`] anywhere in the error chain and attaches
/// tailored suggestions; other errors keep their full context chain as details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(stackref_error) = cause.downcast_ref::<StackrefError>() {
            let ctx = create_error_context(stackref_error.clone());
            let outer = error.to_string();
            if outer != stackref_error.to_string() && ctx.details.is_none() {
                return ctx.with_details(outer);
            }
            return ctx;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => ErrorContext::new(StackrefError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Check that the file or directory exists and the path is correct"),
            std::io::ErrorKind::PermissionDenied => ErrorContext::new(StackrefError::Other {
                message: error.to_string(),
            })
            .with_suggestion("Check file ownership and permissions"),
            _ => ErrorContext::new(StackrefError::Other {
                message: error.to_string(),
            }),
        };
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message = format!("{message}\n  caused by: {}", chain.join("\n  caused by: "));
    }
    ErrorContext::new(StackrefError::Other { message })
}

fn create_error_context(error: StackrefError) -> ErrorContext {
    match &error {
        StackrefError::CrossAppReference { .. } => ErrorContext::new(error)
            .with_suggestion("Define both stacks in the same app manifest")
            .with_details("Each app is synthesized into its own assembly and cannot see another app's outputs"),
        StackrefError::CrossEnvironmentReference { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Deploy both stacks to the same account and region, or pass the value explicitly as a parameter",
            )
            .with_details("Exports can only be imported by stacks in the exporting stack's environment"),
        StackrefError::UnresolvedExportName { .. } => ErrorContext::new(error)
            .with_suggestion("Give the exporting stack a concrete stack_name")
            .with_details("Export names must be concrete strings when templates are synthesized"),
        StackrefError::CyclicDependency { .. } | StackrefError::DeploymentCycle { .. } => ErrorContext::new(error)
            .with_suggestion("Move the shared resource into a stack both stacks can depend on"),
        StackrefError::NestedStackDependsOnParent { .. } => ErrorContext::new(error)
            .with_details("Nested stacks are always deployed before their parent"),
        StackrefError::AssertionFailed { .. } | StackrefError::ResolutionDepthExceeded { .. } => {
            ErrorContext::new(error)
                .with_details("This is an internal error; please report it with the app manifest")
        }
        StackrefError::UnknownConstruct { .. } => ErrorContext::new(error)
            .with_suggestion("Reference paths start below the app, e.g. \"MyStack/MyBucket\""),
        StackrefError::ManifestParseError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the manifest syntax; the format is chosen by file extension (.toml, .json, .yaml)"),
        StackrefError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.stackref/config.toml or the file passed with --config"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_synthesis_errors_are_distinguishable() {
        let err = StackrefError::Synthesis {
            path: "Stack/Bucket".to_string(),
            reason: "missing property".to_string(),
        };
        assert!(err.is_synthesis());
        assert!(!StackrefError::EmptyIdComponents.is_synthesis());
        assert!(!StackrefError::assertion("x").is_synthesis());
    }

    #[test]
    fn test_cross_environment_message_names_both_stacks() {
        let err = StackrefError::CrossEnvironmentReference {
            consumer: "Consumer".to_string(),
            producer: "Producer".to_string(),
            consumer_env: "aws://1/us-east-1".to_string(),
            producer_env: "aws://2/us-east-1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Consumer\""));
        assert!(msg.contains("\"Producer\""));
        assert!(msg.contains("same environment"));
    }

    #[test]
    fn test_user_friendly_error_finds_error_in_chain() {
        let err: anyhow::Result<()> = Err(StackrefError::UnresolvedExportName {
            name: "${AWS::StackName}:X".to_string(),
        })
        .context("Failed to synthesize app");

        let ctx = user_friendly_error(err.unwrap_err());
        assert!(matches!(ctx.error, StackrefError::UnresolvedExportName { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_generic() {
        let ctx = user_friendly_error(anyhow::anyhow!("boom"));
        assert_eq!(ctx.error.to_string(), "boom");
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(StackrefError::ConfigError {
            message: "unknown format".to_string(),
        })
        .with_details("details here")
        .with_suggestion("try this");
        let text = ctx.to_string();
        assert!(text.contains("Configuration error: unknown format"));
        assert!(text.contains("Details: details here"));
        assert!(text.contains("Suggestion: try this"));
    }
}
