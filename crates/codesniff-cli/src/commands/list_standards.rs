//! List standards command implementation.

use anyhow::{Context, Result};
use codesniff_core::SniffRegistry;
use codesniff_rules::builtin_registry;
use std::io::{self, Write};

/// Runs the list-standards command.
pub fn run() -> Result<()> {
    let registry = builtin_registry().context("Failed to register built-in sniffs")?;
    render(&mut io::stdout().lock(), &registry)?;
    Ok(())
}

fn render(out: &mut dyn Write, registry: &SniffRegistry) -> io::Result<()> {
    writeln!(out, "Installed coding standards:")?;
    for standard in registry.standards() {
        writeln!(out, "\n{:<10} {}", standard.name, standard.description)?;
        writeln!(out, "{}", "-".repeat(80))?;
        for code in registry.codes_in_standard(&standard.name) {
            writeln!(out, "  {code}")?;
        }
    }
    writeln!(out, "\nUse --standard to pick one, e.g.:")?;
    writeln!(out, "  codesniff check --standard Generic src/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_standard_with_its_sniffs() {
        let registry = builtin_registry().unwrap();
        let mut out = Vec::new();
        render(&mut out, &registry).unwrap();
        let text = String::from_utf8(out).unwrap();

        let generic = text.find("\nGeneric").unwrap();
        let squiz = text.find("\nSquiz").unwrap();
        assert!(generic < squiz);
        assert!(text.contains("  Generic.Commenting.Todo\n"));
        assert!(text.contains("  Squiz.Objects.ObjectMemberComma\n"));
    }
}
