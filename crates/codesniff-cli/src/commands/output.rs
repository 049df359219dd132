//! Report rendering for check results.

use anyhow::Result;
use codesniff_core::{
    Encoding, FileReport, FileStatus, LintResult, Severity, ViolationDiagnostic,
};
use miette::{NamedSource, Report};
use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::ReportFormat;

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Print a whole run in the specified format.
pub fn print(result: &LintResult, format: ReportFormat, encoding: Encoding) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Full => {
            for report in &result.files {
                full(&mut out, report)?;
            }
            totals(&mut out, result)?;
        }
        ReportFormat::Compact => compact(&mut out, result.files.iter())?,
        ReportFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(result)?)?,
        ReportFormat::Summary => summary(&mut out, result)?,
        ReportFormat::Rich => {
            for report in &result.files {
                rich(&mut out, report, encoding)?;
            }
            totals(&mut out, result)?;
        }
    }
    if result.interrupted {
        writeln!(out, "Run interrupted; remaining files were not checked.")?;
    }
    Ok(())
}

/// Print one file while the interactive loop waits for input.
pub fn print_file(report: &FileReport, format: ReportFormat, encoding: Encoding) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = match format {
        ReportFormat::Compact => compact(&mut out, std::iter::once(report)),
        ReportFormat::Rich => rich(&mut out, report, encoding),
        ReportFormat::Full | ReportFormat::Json | ReportFormat::Summary => full(&mut out, report),
    }
    .and_then(|()| writeln!(out, "<ENTER> to recheck, [s] to skip or [q] to quit : "))
    .and_then(|()| out.flush());
    if let Err(err) = written {
        tracing::warn!("Failed to render {}: {}", report.path.display(), err);
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}S")
    }
}

fn label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERROR",
        Severity::Warning => "WARNING",
    }
}

/// Diagnostics of one file, grouped under a header.
fn full(out: &mut dyn Write, report: &FileReport) -> io::Result<()> {
    if report.status == FileStatus::Skipped {
        return writeln!(out, "\nFILE: {} (skipped)", report.path.display());
    }
    if report.violations.is_empty() {
        return Ok(());
    }

    let lines: BTreeSet<usize> = report.violations.iter().map(|v| v.location.line).collect();
    let width = lines.last().map_or(1, |l| l.to_string().len());

    writeln!(out, "\nFILE: {}", report.path.display())?;
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "FOUND {} AND {} AFFECTING {}",
        plural(report.errors(), "ERROR"),
        plural(report.warnings(), "WARNING"),
        plural(lines.len(), "LINE")
    )?;
    writeln!(out, "{RULE}")?;
    for v in report.sorted() {
        writeln!(
            out,
            " {:>width$} | {:<7} | {} ({})",
            v.location.line,
            label(v.severity),
            v.message,
            v.code,
        )?;
    }
    writeln!(out, "{RULE}")
}

/// One line per diagnostic.
fn compact<'a>(out: &mut dyn Write, reports: impl Iterator<Item = &'a FileReport>) -> io::Result<()> {
    for report in reports {
        for v in report.sorted() {
            writeln!(out, "{v}")?;
        }
    }
    Ok(())
}

/// Totals per file with diagnostics, then for the run.
fn summary(out: &mut dyn Write, result: &LintResult) -> io::Result<()> {
    writeln!(out, "{:<64} {:>7} {:>8}", "FILE", "ERRORS", "WARNINGS")?;
    writeln!(out, "{RULE}")?;
    for report in result.files.iter().filter(|f| !f.violations.is_empty()) {
        writeln!(
            out,
            "{:<64} {:>7} {:>8}",
            report.path.display(),
            report.errors(),
            report.warnings()
        )?;
    }
    writeln!(out, "{RULE}")?;
    totals(out, result)
}

fn totals(out: &mut dyn Write, result: &LintResult) -> io::Result<()> {
    let (errors, warnings) = result.count_by_severity();
    let color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    writeln!(
        out,
        "{color}Found {} error(s), {} warning(s) in {} file(s)\x1b[0m",
        errors,
        warnings,
        result.files_checked()
    )
}

fn rich(out: &mut dyn Write, report: &FileReport, encoding: Encoding) -> io::Result<()> {
    if report.violations.is_empty() {
        return Ok(());
    }
    let name = report.path.display().to_string();
    let source = match std::fs::read(&report.path) {
        Ok(bytes) => Some(encoding.decode(&bytes)),
        Err(err) => {
            tracing::warn!("Cannot read {} for snippets: {}", name, err);
            None
        }
    };
    for v in report.sorted() {
        let diagnostic = Report::new(ViolationDiagnostic::from(v));
        let diagnostic = match &source {
            Some(text) => diagnostic.with_source_code(NamedSource::new(&name, text.clone())),
            None => diagnostic,
        };
        writeln!(out, "{diagnostic:?}")?;
    }
    Ok(())
}
