//! stackref - cross-stack reference resolution for infrastructure apps
//!
//! An app is a tree of constructs: stacks (deployment units), nested stacks,
//! grouping scopes and template elements (resources, parameters, outputs).
//! Element properties may reference elements of other stacks. Before any
//! template can be written, each such reference has to be rewritten into an
//! intrinsic the consuming stack can evaluate on its own, and the constructs
//! that carry the value across the stack boundary have to be created.
//!
//! # Architecture Overview
//!
//! ```text
//! manifest ──build──▶ tree ──resolve──▶ tree + caches ──render──▶ assembly
//! ```
//!
//! 1. [`manifest`] parses an app manifest and builds the [`tree`]
//! 2. [`resolver`] discovers every reference, classifies the producer/consumer
//!    relationship and creates parameters, outputs, exports and dependencies
//! 3. [`synth`] renders each stack's template through its resolution cache and
//!    writes the cloud assembly
//!
//! # Core Modules
//!
//! - [`tree`] - construct arena, stacks and template elements
//! - [`tokens`] - template expressions, reference tokens and the token scanner
//! - [`naming`] - unique id generation shared by logical ids and export names
//! - [`resolver`] - topology classification, reference resolution, exports and
//!   deploy-ordering dependencies
//! - [`synth`] - template rendering and assembly output
//!
//! ## Supporting Modules
//!
//! - [`manifest`] - TOML/JSON/YAML app manifests
//! - [`config`] - global configuration (`~/.stackref/config.toml`)
//! - [`cli`] - the `stackref` command line
//! - [`core`] - error types and user-facing error formatting
//! - [`constants`] - naming constants that are part of the output format
//!
//! # Example
//!
//! ```rust,no_run
//! use stackref_cli::resolver::{ResolverOptions, resolve_references};
//! use stackref_cli::tokens::Reference;
//! use stackref_cli::tree::{CfnResource, ConstructTree, Environment, StackProps};
//!
//! # fn example() -> stackref_cli::core::Result<()> {
//! let mut tree = ConstructTree::new();
//! let app = tree.add_app("App");
//! let env = || StackProps {
//!     stack_name: None,
//!     environment: Environment::new("111111111111", "us-east-1"),
//! };
//! let producer = tree.add_stack(app, "Producer", env())?;
//! let consumer = tree.add_stack(app, "Consumer", env())?;
//! let bucket = tree.add_resource(producer, "Bucket", CfnResource::new("AWS::S3::Bucket"))?;
//! tree.add_resource(
//!     consumer,
//!     "Queue",
//!     CfnResource::new("AWS::SQS::Queue").with_property("Name", Reference::to_ref(bucket)),
//! )?;
//!
//! let report = resolve_references(&mut tree, app, &ResolverOptions::default())?;
//! assert_eq!(report.cross_stack().count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod manifest;
pub mod naming;
pub mod resolver;
pub mod synth;
pub mod tokens;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
