//! File discovery and exclusion patterns.

use crate::ruleset::PatternSpec;
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A compiled exclusion pattern.
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    source: String,
    regex: Regex,
    relative: bool,
}

impl ExcludePattern {
    /// Compiles a pattern: `*` matches any run of characters, everything
    /// else is a case-insensitive regular expression over `/`-separated
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns the regex error for an invalid pattern.
    pub fn compile(spec: &PatternSpec) -> Result<Self, regex::Error> {
        let translated = spec.pattern.replace('*', ".*");
        let regex = RegexBuilder::new(&translated).case_insensitive(true).build()?;
        Ok(Self {
            source: spec.pattern.clone(),
            regex,
            relative: spec.relative,
        })
    }

    /// Pattern text as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tests a path. Relative patterns see the path with `base` stripped.
    #[must_use]
    pub fn matches(&self, path: &Path, base: &Path) -> bool {
        let subject = if self.relative {
            path.strip_prefix(base).unwrap_or(path)
        } else {
            path
        };
        let normalized = subject.to_string_lossy().replace('\\', "/");
        self.regex.is_match(&normalized)
    }
}

/// Compiles a list of patterns.
///
/// # Errors
///
/// Returns the first invalid pattern with its regex error.
pub fn compile_patterns(specs: &[PatternSpec]) -> Result<Vec<ExcludePattern>, (String, regex::Error)> {
    specs
        .iter()
        .map(|spec| ExcludePattern::compile(spec).map_err(|e| (spec.pattern.clone(), e)))
        .collect()
}

/// Returns true if any pattern matches.
#[must_use]
pub fn is_excluded(patterns: &[ExcludePattern], path: &Path, base: &Path) -> bool {
    patterns.iter().any(|p| p.matches(path, base))
}

/// A file scheduled for processing with the base it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// File path.
    pub path: PathBuf,
    /// Directory the file was discovered from (or its parent if given
    /// directly).
    pub base: PathBuf,
}

/// Walks a directory in file-name order. Hidden entries are skipped and
/// `accept_dir` prunes whole subtrees.
pub fn walk(
    root: &Path,
    max_depth: Option<usize>,
    mut accept_dir: impl FnMut(&Path) -> bool,
) -> impl Iterator<Item = PathBuf> {
    let mut walker = WalkDir::new(root).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }
    walker
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                debug!(path = %entry.path().display(), "Skipping hidden entry");
                return false;
            }
            !entry.file_type().is_dir() || accept_dir(entry.path())
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
}
