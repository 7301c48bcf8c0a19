//! Configuration management for stackref.
//!
//! Only user-wide settings live here; the app itself is described by an app
//! manifest (see [`crate::manifest`]). Settings are read once per CLI
//! invocation and turned into [`crate::resolver::ResolverOptions`] and CLI
//! defaults.

mod global;

pub use global::{GlobalConfig, OutputFormat};
