//! Whole-batch sniff: a top-level function declared in more than one file.
//!
//! Runs after every file has been tokenized. The first declaration of a
//! name wins; every later one, in processing order, is reported with the
//! path of the first.

use codesniff_core::{BatchContext, BatchSniff, SniffError, TokenKind, TokenizerFamily};
use std::collections::HashMap;
use tracing::debug;

/// Sniff code for duplicate-function-name.
pub const CODE: &str = "Generic.Functions.DuplicateFunctionName";

/// Reports global functions that share a name across files.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFunctionName;

impl DuplicateFunctionName {
    /// Creates the sniff.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BatchSniff for DuplicateFunctionName {
    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Global function names must be unique across files"
    }

    fn process_batch(&mut self, ctx: &mut BatchContext<'_>) -> Result<(), SniffError> {
        let files = ctx.files();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (index, file) in files.iter().enumerate() {
            for (pos, token) in file.tokens().iter().enumerate() {
                if token.kind != TokenKind::Function || !token.conditions.is_empty() {
                    continue;
                }
                let Some(name) = file.declaration_name(pos) else {
                    continue;
                };
                // Names are case-insensitive in the primary language.
                let key = name.to_ascii_lowercase();
                match first_seen.get(&key) {
                    Some(&first) if first != index => {
                        let original = files[first].path().display().to_string();
                        ctx.add_error(
                            index,
                            pos,
                            "Duplicate function name \"%s\" (first declared in %s)",
                            "Found",
                            &[name, original.as_str()],
                        );
                    }
                    Some(_) => {}
                    None => {
                        first_seen.insert(key, index);
                    }
                }
            }
        }
        debug!(functions = first_seen.len(), files = files.len(), "Checked global function names");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesniff_core::tokenizer::JsTokenizer;
    use codesniff_core::{ReportPolicy, SourceFile, Violation};
    use std::collections::BTreeMap;

    fn run(sources: &[(&str, &str)]) -> Vec<Vec<Violation>> {
        let tokenizer = JsTokenizer::new();
        let files: Vec<SourceFile> = sources
            .iter()
            .map(|(path, source)| SourceFile::parse(*path, source.to_string(), &tokenizer, 4).unwrap())
            .collect();
        let refs: Vec<&SourceFile> = files.iter().collect();
        let overrides = BTreeMap::new();
        let mut sinks = vec![Vec::new(); files.len()];
        let mut ctx = BatchContext::new(&refs, CODE, ReportPolicy::new(&overrides, true), &mut sinks);
        DuplicateFunctionName::new().process_batch(&mut ctx).unwrap();
        sinks
    }

    #[test]
    fn test_reports_later_declarations() {
        let sinks = run(&[
            ("a.js", "function load() {}\n"),
            ("b.js", "function other() {}\nfunction LOAD() {}\n"),
            ("c.js", "function load() {}\n"),
        ]);
        assert!(sinks[0].is_empty());
        assert_eq!(sinks[1].len(), 1);
        assert_eq!(sinks[1][0].message, "Duplicate function name \"LOAD\" (first declared in a.js)");
        assert_eq!(sinks[1][0].location.line, 2);
        assert_eq!(sinks[2].len(), 1);
    }

    #[test]
    fn test_ignores_nested_and_same_file_declarations() {
        let sinks = run(&[
            ("a.js", "function wrap() {\n    function inner() {}\n}\nfunction wrap() {}\n"),
            ("b.js", "function outer() {\n    function inner() {}\n}\n"),
        ]);
        assert!(sinks.iter().all(Vec::is_empty));
    }
}
