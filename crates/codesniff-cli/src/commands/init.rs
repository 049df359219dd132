//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config_resolver::SETTINGS_FILES;

const DEFAULT_CONFIG: &str = r#"# codesniff configuration

# Standard name, directory or rule-set file. Several may be joined with commas.
standard = "Squiz"

# Only run these sniff codes (empty runs the whole standard)
sniffs = []

# Extra exclusion patterns, matched against absolute paths (`*` is a wildcard)
exclude = [
    "*/vendor/*",
    "*/node_modules/*",
]

# Columns per tab stop
tab_width = 4

# Source encoding: "utf-8" or "iso-8859-1"
encoding = "utf-8"

# Report warnings as well as errors
show_warnings = true

# Pause after each file with diagnostics
interactive = false

# Maximum directory depth (omit for unbounded)
# max_depth = 8

# File extension to tokenizer family
[extensions]
php = "php"
inc = "php"
js = "js"
css = "css"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new(SETTINGS_FILES[0]), force)?;

    println!("Created {}", SETTINGS_FILES[0]);
    println!("\nNext steps:");
    println!("  1. Edit {} to pick a standard", SETTINGS_FILES[0]);
    println!("  2. Run: codesniff check");

    Ok(())
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}
