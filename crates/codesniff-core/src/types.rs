//! Core types for diagnostics and run results.

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default severity level assigned to every diagnostic.
pub const DEFAULT_LEVEL: u8 = 5;

/// Diagnostic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Should be addressed; does not fail the run on its own.
    Warning,
    /// Must be fixed.
    Error,
}

impl Severity {
    /// Parses `error` or `warning`, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path as it was discovered.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file (for miette integration).
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this location.
    #[must_use]
    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// A diagnostic raised by a sniff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Full message code (e.g. `Generic.Commenting.Todo.CommentFound`).
    pub code: String,
    /// Code of the sniff that raised it (e.g. `Generic.Commenting.Todo`).
    pub rule: String,
    /// Diagnostic type after overrides.
    pub severity: Severity,
    /// Severity level after overrides (1 to 10).
    pub level: u8,
    /// Primary location.
    pub location: Location,
    /// Stream position of the token the diagnostic is attached to.
    pub position: usize,
    /// Human-readable message with placeholders filled in.
    pub message: String,
}

impl Violation {
    /// Creates a new violation at the default level.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            level: DEFAULT_LEVEL,
            location,
            position: 0,
            message: message.into(),
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Sets the token position.
    #[must_use]
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.severity,
            self.code,
            self.message
        )
    }
}

/// Converts a Violation to a miette Diagnostic for rich error display.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{message}")]
pub struct ViolationDiagnostic {
    message: String,
    #[help]
    help: Option<String>,
    #[label("{label_message}")]
    span: SourceSpan,
    label_message: String,
}

impl From<&Violation> for ViolationDiagnostic {
    fn from(v: &Violation) -> Self {
        Self {
            message: format!("[{}] {}", v.code, v.message),
            help: (v.level != DEFAULT_LEVEL).then(|| format!("severity level {}", v.level)),
            span: SourceSpan::from((v.location.offset, v.location.length)),
            label_message: v.severity.to_string(),
        }
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// All sniffs ran.
    Processed,
    /// The file opted out with an ignore marker.
    Skipped,
    /// Processing failed; diagnostics hold a single internal error.
    Aborted,
}

/// Diagnostics collected for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// File path.
    pub path: PathBuf,
    /// Processing outcome.
    pub status: FileStatus,
    /// Diagnostics, in the order they were raised.
    pub violations: Vec<Violation>,
}

impl FileReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            violations: Vec::new(),
        }
    }

    /// Number of errors.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warnings.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    /// Returns violations sorted by line, then column.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Violation> {
        let mut sorted: Vec<&Violation> = self.violations.iter().collect();
        sorted.sort_by_key(|v| (v.location.line, v.location.column));
        sorted
    }
}

/// Result of a run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// One report per file, in processing order.
    pub files: Vec<FileReport>,
    /// The interactive user quit before every file was processed.
    pub interrupted: bool,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files that were processed or skipped.
    #[must_use]
    pub fn files_checked(&self) -> usize {
        self.files.len()
    }

    /// Iterates over every violation in every file.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.files.iter().flat_map(|f| f.violations.iter())
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.violations().any(|v| v.severity == Severity::Error)
    }

    /// Returns true if there are any warnings or errors.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.violations().next().is_some()
    }

    /// Counts violations by severity: `(errors, warnings)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize) {
        self.files
            .iter()
            .fold((0, 0), |(e, w), f| (e + f.errors(), w + f.warnings()))
    }

    /// Returns the report for a path.
    #[must_use]
    pub fn file(&self, path: &std::path::Path) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Adds reports from another result.
    pub fn extend(&mut self, other: Self) {
        self.files.extend(other.files);
        self.interrupted |= other.interrupted;
    }
}
