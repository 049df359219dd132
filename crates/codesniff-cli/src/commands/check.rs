//! Check command implementation.

use anyhow::{bail, Context, Result};
use codesniff_core::{Config, Encoding, Engine, FileReport, LintResult};
use codesniff_rules::builtin_registry;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config_resolver;
use crate::CheckArgs;

/// Runs the check command and maps the result to an exit status.
pub fn run(args: &CheckArgs, verbose: u8, explicit: Option<&Path>) -> Result<ExitCode> {
    let mut config = config_resolver::discover(&args.paths, explicit).load()?;
    apply_flags(&mut config, args, verbose)?;

    let registry = builtin_registry().context("Failed to register built-in sniffs")?;
    let mut engine = Engine::builder(config)
        .registry(Arc::new(registry))
        .build()
        .context("Failed to set up the coding standard")?;

    tracing::info!(
        "Checking {:?} against {} with {} sniffs",
        args.paths,
        engine.config().standard,
        engine.sniff_codes().len()
    );

    let recurse = !args.local;
    let encoding = engine.config().encoding;
    let result = if engine.config().interactive {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut render = |report: &FileReport| super::output::print_file(report, args.report, encoding);
        engine.process_interactive(&args.paths, recurse, &mut input, &mut render)?
    } else {
        engine.process(&args.paths, recurse)?
    };

    super::output::print(&result, args.report, encoding)?;
    Ok(exit_code(&result))
}

/// Layers command-line flags over the file configuration.
fn apply_flags(config: &mut Config, args: &CheckArgs, verbose: u8) -> Result<()> {
    if let Some(standard) = &args.standard {
        config.standard.clone_from(standard);
    }
    if !args.sniffs.is_empty() {
        config.sniffs.clone_from(&args.sniffs);
    }
    if !args.extensions.is_empty() {
        config.set_extensions(&args.extensions)?;
    }
    config.exclude.extend(args.exclude.iter().cloned());
    if let Some(width) = args.tab_width {
        config.tab_width = width;
    }
    if let Some(name) = &args.encoding {
        config.encoding = parse_encoding(name)?;
    }
    if args.interactive {
        config.interactive = true;
    }
    if args.no_warnings {
        config.show_warnings = false;
    }
    if verbose > 0 {
        config.verbosity = verbose.min(3);
    }
    Ok(())
}

fn parse_encoding(name: &str) -> Result<Encoding> {
    match name.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(Encoding::Utf8),
        "iso-8859-1" | "latin1" => Ok(Encoding::Latin1),
        other => bail!("Unsupported encoding '{other}' (expected utf-8 or iso-8859-1)"),
    }
}

fn exit_code(result: &LintResult) -> ExitCode {
    if result.has_errors() {
        ExitCode::from(2)
    } else if result.has_warnings() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReportFormat;
    use std::path::PathBuf;

    fn args() -> CheckArgs {
        CheckArgs {
            paths: vec![PathBuf::from(".")],
            standard: None,
            sniffs: Vec::new(),
            report: ReportFormat::Full,
            exclude: Vec::new(),
            extensions: Vec::new(),
            interactive: false,
            local: false,
            no_warnings: false,
            tab_width: None,
            encoding: None,
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = Config::parse("standard = \"Generic\"\nexclude = [\"vendor\"]\n").unwrap();
        let mut args = args();
        args.standard = Some("Squiz".into());
        args.exclude = vec!["build".into()];
        args.tab_width = Some(2);
        args.no_warnings = true;
        args.encoding = Some("ISO-8859-1".into());

        apply_flags(&mut config, &args, 5).unwrap();
        assert_eq!(config.standard, "Squiz");
        assert_eq!(config.exclude, vec!["vendor", "build"]);
        assert_eq!(config.tab_width, 2);
        assert!(!config.show_warnings);
        assert_eq!(config.encoding, Encoding::Latin1);
        assert_eq!(config.verbosity, 3);
    }

    #[test]
    fn unset_flags_keep_file_values() {
        let mut config = Config::parse("standard = \"Generic\"\ntab_width = 8\n").unwrap();
        apply_flags(&mut config, &args(), 0).unwrap();
        assert_eq!(config.standard, "Generic");
        assert_eq!(config.tab_width, 8);
        assert!(config.show_warnings);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut args = args();
        args.encoding = Some("shift-jis".into());
        assert!(apply_flags(&mut Config::default(), &args, 0).is_err());
    }
}
