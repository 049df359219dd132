//! Docs command implementation.

use anyhow::{Context, Result};
use codesniff_core::Engine;
use codesniff_rules::builtin_registry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config_resolver;

/// Prints documentation for every sniff the standard activates.
pub fn run(standard: Option<String>, explicit: Option<&Path>) -> Result<()> {
    let config = config_resolver::discover(&[PathBuf::from(".")], explicit).load()?;
    let registry = builtin_registry().context("Failed to register built-in sniffs")?;

    let mut builder = Engine::builder(config).registry(Arc::new(registry));
    if let Some(standard) = standard {
        builder = builder.standard(standard);
    }
    let engine = builder
        .build()
        .context("Failed to set up the coding standard")?;

    engine
        .generate_docs(&mut std::io::stdout().lock())
        .context("Failed to write documentation")?;
    Ok(())
}
