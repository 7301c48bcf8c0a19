//! Core types and error handling for stackref
//!
//! This module holds the error taxonomy shared by the resolution engine, the
//! manifest loader and the CLI:
//!
//! - [`StackrefError`] - strongly-typed failures, one variant per failure mode
//! - [`ErrorContext`] - error plus details and suggestion for terminal display
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] for display
//!
//! Engine operations return [`Result`]; the outer layers wrap it in
//! [`anyhow::Result`] with additional context.

pub mod error;

pub use error::{ErrorContext, StackrefError, user_friendly_error};

/// Result alias used throughout the resolution engine.
pub type Result<T, E = StackrefError> = std::result::Result<T, E>;
