//! # codesniff-rules
//!
//! Built-in coding standards for codesniff.
//!
//! ## Available Sniffs
//!
//! | Code | Kind | Checks |
//! |------|------|--------|
//! | `Generic.WhiteSpace.DisallowTabIndent` | token | Tabs in indentation |
//! | `Generic.Commenting.Todo` | token | `TODO` markers in comments |
//! | `Generic.Functions.DuplicateFunctionName` | batch | Global function declared in several files |
//! | `Squiz.ControlStructures.ControlSignature` | pattern | Layout of control-structure signatures |
//! | `Squiz.Functions.FunctionDeclaration` | pattern | Layout of function declarations |
//! | `Squiz.Functions.InnerFunctions` | scope | Named functions inside functions |
//! | `Squiz.Commenting.FunctionCommentTags` | token | Required tags and tag order in function comments |
//! | `Squiz.Objects.ObjectMemberComma` | token | Trailing comma in object literals |
//! | `Squiz.NamingConventions.ValidVariableName` | variable | Camel-caps variable names |
//!
//! The `Squiz` standard also includes `Generic.WhiteSpace.DisallowTabIndent`
//! and `Generic.Commenting.Todo` through its embedded rule-set.
//!
//! ## Usage
//!
//! ```ignore
//! use codesniff_core::{Config, Engine};
//! use std::sync::Arc;
//!
//! let registry = codesniff_rules::builtin_registry()?;
//! let mut engine = Engine::builder(Config::default())
//!     .registry(Arc::new(registry))
//!     .standard("Squiz")
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod generic;
pub mod squiz;

#[cfg(test)]
mod testing;

use codesniff_core::{RegistryError, SniffRegistry};
use tracing::debug;

/// Re-export core types for convenience.
pub use codesniff_core::{Severity, Sniff, Violation};

/// Builds a registry holding every built-in standard.
///
/// # Errors
///
/// Returns an error if a built-in sniff code is malformed.
pub fn builtin_registry() -> Result<SniffRegistry, RegistryError> {
    let mut registry = SniffRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}

/// Adds every built-in standard to an existing registry.
///
/// # Errors
///
/// Returns an error if a built-in sniff code is malformed.
pub fn register_builtin(registry: &mut SniffRegistry) -> Result<(), RegistryError> {
    generic::register(registry)?;
    squiz::register(registry)?;
    debug!(standards = registry.standards().count(), "Registered built-in standards");
    Ok(())
}
