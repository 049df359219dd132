//! Sniff traits and the reporting context handed to them.

use crate::file::SourceFile;
use crate::ruleset::RuleOverride;
use crate::token::{Token, TokenKind};
use crate::tokenizer::TokenizerFamily;
use crate::types::{Location, Severity, Violation, DEFAULT_LEVEL};
use std::collections::BTreeMap;

/// A typed sniff property value from a rule-set descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// `true` or `false`.
    Bool(bool),
    /// Any other scalar.
    String(String),
    /// A `type="array"` property.
    List(Vec<String>),
}

impl PropertyValue {
    /// Classifies a raw descriptor value.
    #[must_use]
    pub fn from_raw(value: &str, is_array: bool) -> Self {
        if is_array {
            return Self::List(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        match value.trim() {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            other => Self::String(other.to_string()),
        }
    }

    /// Boolean view.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List view; a scalar string is split on commas.
    #[must_use]
    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.clone(),
            Self::String(s) => Self::from_raw(s, true).as_list(),
            Self::Bool(b) => vec![b.to_string()],
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::String(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

/// Errors raised by a sniff.
#[derive(Debug, thiserror::Error)]
pub enum SniffError {
    /// The sniff has no property with that name.
    #[error("unknown property '{name}'")]
    UnknownProperty {
        /// Property name.
        name: String,
    },

    /// The property exists but the value does not fit.
    #[error("invalid value for property '{name}': {message}")]
    InvalidProperty {
        /// Property name.
        name: String,
        /// What is wrong with the value.
        message: String,
    },

    /// Processing failed.
    #[error("{0}")]
    Failed(String),
}

/// Errors raised while constructing a sniff.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// `register` returned no token kinds.
    #[error("sniff listens for no token kinds")]
    NoListeners,

    /// A scope adapter was built with no scope kinds.
    #[error("scope kinds must not be empty")]
    EmptyScopeKinds,

    /// A scope adapter was built with no listen kinds.
    #[error("listen kinds must not be empty")]
    EmptyListenKinds,

    /// A kind appears in both the scope and listen sets.
    #[error("kinds {kinds:?} are both scope and listen kinds")]
    OverlappingKinds {
        /// The shared kinds.
        kinds: Vec<TokenKind>,
    },

    /// A pattern has no literal token to listen on.
    #[error("pattern \"{pattern}\" has no token to listen for")]
    NoListenerToken {
        /// The template text.
        pattern: String,
    },

    /// A pattern could not be tokenized.
    #[error("pattern \"{pattern}\" could not be tokenized: {message}")]
    InvalidPattern {
        /// The template text.
        pattern: String,
        /// Tokenizer message.
        message: String,
    },
}

/// A rule that wakes on specific token kinds in one file at a time.
///
/// Instances are stateful within a file; the engine calls
/// [`Sniff::begin_file`] before the first token of every file.
pub trait Sniff: Send {
    /// Token kinds this sniff wants to be called for. Must not be empty.
    fn register(&self) -> Vec<TokenKind>;

    /// Families this sniff understands.
    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php]
    }

    /// Returns a brief description of what this sniff checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Applies a property from the rule-set.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names or unusable values.
    fn set_property(&mut self, name: &str, _value: &PropertyValue) -> Result<(), SniffError> {
        Err(SniffError::UnknownProperty {
            name: name.to_string(),
        })
    }

    /// Resets per-file state.
    fn begin_file(&mut self, _file: &SourceFile) {}

    /// Processes the token at `pos`.
    ///
    /// # Errors
    ///
    /// An error aborts checking of the current file.
    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError>;
}

/// A rule that runs once over every processed file.
pub trait BatchSniff: Send {
    /// Families this sniff understands.
    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php]
    }

    /// Returns a brief description of what this sniff checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Applies a property from the rule-set.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names or unusable values.
    fn set_property(&mut self, name: &str, _value: &PropertyValue) -> Result<(), SniffError> {
        Err(SniffError::UnknownProperty {
            name: name.to_string(),
        })
    }

    /// Processes the whole batch.
    ///
    /// # Errors
    ///
    /// An error is reported against the first file of the batch.
    fn process_batch(&mut self, ctx: &mut BatchContext<'_>) -> Result<(), SniffError>;
}

/// Either kind of sniff, as produced by a registry factory.
pub enum SniffInstance {
    /// Token-driven sniff.
    Token(Box<dyn Sniff>),
    /// Whole-batch sniff.
    Batch(Box<dyn BatchSniff>),
}

impl SniffInstance {
    /// Wraps a token sniff.
    pub fn token(sniff: impl Sniff + 'static) -> Self {
        Self::Token(Box::new(sniff))
    }

    /// Wraps a batch sniff.
    pub fn batch(sniff: impl BatchSniff + 'static) -> Self {
        Self::Batch(Box::new(sniff))
    }

    /// Description of the wrapped sniff.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Token(s) => s.description(),
            Self::Batch(s) => s.description(),
        }
    }

    /// Families of the wrapped sniff.
    #[must_use]
    pub fn supported_families(&self) -> &'static [TokenizerFamily] {
        match self {
            Self::Token(s) => s.supported_families(),
            Self::Batch(s) => s.supported_families(),
        }
    }

    /// Forwards a property.
    ///
    /// # Errors
    ///
    /// Propagates the sniff's error.
    pub fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        match self {
            Self::Token(s) => s.set_property(name, value),
            Self::Batch(s) => s.set_property(name, value),
        }
    }
}

/// Replaces `%s` placeholders with `data` in order.
#[must_use]
pub fn fill_placeholders(template: &str, data: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = data.iter();
    let mut rest = template;
    while let Some(at) = rest.find("%s") {
        out.push_str(&rest[..at]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%s"),
        }
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}

/// Turns raw sniff reports into diagnostics, applying rule-set overrides.
#[derive(Debug, Clone, Copy)]
pub struct ReportPolicy<'a> {
    overrides: &'a BTreeMap<String, RuleOverride>,
    show_warnings: bool,
}

impl<'a> ReportPolicy<'a> {
    /// Creates a policy.
    #[must_use]
    pub fn new(overrides: &'a BTreeMap<String, RuleOverride>, show_warnings: bool) -> Self {
        Self {
            overrides,
            show_warnings,
        }
    }

    /// Builds the diagnostic, or `None` if it is silenced.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn apply(
        &self,
        file: &SourceFile,
        rule: &str,
        pos: usize,
        severity: Severity,
        message: &str,
        code: &str,
        data: &[&str],
    ) -> Option<Violation> {
        let full_code = format!("{rule}.{code}");
        let specific = self.overrides.get(&full_code);
        let general = self.overrides.get(rule);

        let level = specific
            .and_then(|o| o.severity)
            .or_else(|| general.and_then(|o| o.severity))
            .unwrap_or(DEFAULT_LEVEL);
        if level == 0 {
            return None;
        }
        let severity = specific
            .and_then(|o| o.kind)
            .or_else(|| general.and_then(|o| o.kind))
            .unwrap_or(severity);
        if severity == Severity::Warning && !self.show_warnings {
            return None;
        }

        let template = specific
            .and_then(|o| o.message.as_deref())
            .or_else(|| general.and_then(|o| o.message.as_deref()))
            .unwrap_or(message);
        let location = match file.token(pos) {
            Some(token) => {
                if file.is_line_suppressed(token.line) {
                    return None;
                }
                Location::new(file.path().to_path_buf(), token.line, token.column)
                    .with_span(token.offset, token.text.len())
            }
            None => Location::new(file.path().to_path_buf(), 1, 1),
        };

        Some(
            Violation::new(full_code, rule, severity, location, fill_placeholders(template, data))
                .with_level(level)
                .at_position(pos),
        )
    }
}

/// Per-call view a [`Sniff`] uses to inspect the file and report.
pub struct SniffContext<'a> {
    file: &'a SourceFile,
    rule: &'a str,
    policy: ReportPolicy<'a>,
    violations: &'a mut Vec<Violation>,
}

impl<'a> SniffContext<'a> {
    /// Creates a context.
    pub fn new(
        file: &'a SourceFile,
        rule: &'a str,
        policy: ReportPolicy<'a>,
        violations: &'a mut Vec<Violation>,
    ) -> Self {
        Self {
            file,
            rule,
            policy,
            violations,
        }
    }

    /// The file being processed.
    #[must_use]
    pub fn file(&self) -> &'a SourceFile {
        self.file
    }

    /// The file's tokens.
    #[must_use]
    pub fn tokens(&self) -> &'a [Token] {
        self.file.tokens()
    }

    /// Code of the sniff being called.
    #[must_use]
    pub fn rule(&self) -> &str {
        self.rule
    }

    /// Reports an error at a token. Returns true if it was recorded.
    pub fn add_error(&mut self, pos: usize, message: &str, code: &str, data: &[&str]) -> bool {
        self.add(pos, Severity::Error, message, code, data)
    }

    /// Reports a warning at a token. Returns true if it was recorded.
    pub fn add_warning(&mut self, pos: usize, message: &str, code: &str, data: &[&str]) -> bool {
        self.add(pos, Severity::Warning, message, code, data)
    }

    fn add(&mut self, pos: usize, severity: Severity, message: &str, code: &str, data: &[&str]) -> bool {
        match self
            .policy
            .apply(self.file, self.rule, pos, severity, message, code, data)
        {
            Some(violation) => {
                self.violations.push(violation);
                true
            }
            None => false,
        }
    }
}

/// View a [`BatchSniff`] uses to inspect every file and report.
pub struct BatchContext<'a> {
    files: &'a [&'a SourceFile],
    rule: &'a str,
    policy: ReportPolicy<'a>,
    violations: &'a mut [Vec<Violation>],
}

impl<'a> BatchContext<'a> {
    /// Creates a context. `violations` has one entry per file.
    pub fn new(
        files: &'a [&'a SourceFile],
        rule: &'a str,
        policy: ReportPolicy<'a>,
        violations: &'a mut [Vec<Violation>],
    ) -> Self {
        Self {
            files,
            rule,
            policy,
            violations,
        }
    }

    /// Every retained file, in processing order.
    #[must_use]
    pub fn files(&self) -> &'a [&'a SourceFile] {
        self.files
    }

    /// Reports an error in one file.
    pub fn add_error(&mut self, file: usize, pos: usize, message: &str, code: &str, data: &[&str]) -> bool {
        self.add(file, pos, Severity::Error, message, code, data)
    }

    /// Reports a warning in one file.
    pub fn add_warning(&mut self, file: usize, pos: usize, message: &str, code: &str, data: &[&str]) -> bool {
        self.add(file, pos, Severity::Warning, message, code, data)
    }

    fn add(
        &mut self,
        file: usize,
        pos: usize,
        severity: Severity,
        message: &str,
        code: &str,
        data: &[&str],
    ) -> bool {
        let (Some(&source), Some(sink)) = (self.files.get(file), self.violations.get_mut(file)) else {
            return false;
        };
        match self
            .policy
            .apply(source, self.rule, pos, severity, message, code, data)
        {
            Some(violation) => {
                sink.push(violation);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::JsTokenizer;

    fn file() -> SourceFile {
        SourceFile::parse("a.js", "a;\nb;\n".to_string(), &JsTokenizer::new(), 4).unwrap()
    }

    #[test]
    fn placeholders_fill_in_order() {
        assert_eq!(fill_placeholders("Expected %s; found %s", &["a", "b"]), "Expected a; found b");
        assert_eq!(fill_placeholders("%s and %s", &["x"]), "x and %s");
    }

    #[test]
    fn property_values_are_typed() {
        assert_eq!(PropertyValue::from_raw("true", false), PropertyValue::Bool(true));
        assert_eq!(
            PropertyValue::from_raw("a, b,,c", true),
            PropertyValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
        assert_eq!(PropertyValue::String("x,y".into()).as_list().len(), 2);
    }

    #[test]
    fn message_code_override_beats_sniff_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "Std.Cat.Name".to_string(),
            RuleOverride {
                severity: Some(3),
                kind: Some(Severity::Warning),
                ..RuleOverride::default()
            },
        );
        overrides.insert(
            "Std.Cat.Name.Found".to_string(),
            RuleOverride {
                message: Some("custom %s".to_string()),
                kind: Some(Severity::Error),
                ..RuleOverride::default()
            },
        );
        let policy = ReportPolicy::new(&overrides, true);
        let file = file();
        let v = policy
            .apply(&file, "Std.Cat.Name", 3, Severity::Warning, "orig", "Found", &["x"])
            .unwrap();
        assert_eq!(v.severity, Severity::Error);
        assert_eq!(v.level, 3);
        assert_eq!(v.message, "custom x");
        assert_eq!(v.code, "Std.Cat.Name.Found");
        assert_eq!(v.location.line, 2);

        let other = policy
            .apply(&file, "Std.Cat.Name", 0, Severity::Error, "orig", "Other", &[])
            .unwrap();
        assert_eq!(other.severity, Severity::Warning);
        assert_eq!(other.message, "orig");
    }

    #[test]
    fn level_zero_and_hidden_warnings_are_dropped() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "Std.Cat.Name.Found".to_string(),
            RuleOverride {
                severity: Some(0),
                ..RuleOverride::default()
            },
        );
        let file = file();
        let policy = ReportPolicy::new(&overrides, false);
        assert!(policy
            .apply(&file, "Std.Cat.Name", 0, Severity::Error, "m", "Found", &[])
            .is_none());
        assert!(policy
            .apply(&file, "Std.Cat.Name", 0, Severity::Warning, "m", "Other", &[])
            .is_none());
        assert!(policy
            .apply(&file, "Std.Cat.Name", 0, Severity::Error, "m", "Other", &[])
            .is_some());
    }

    #[test]
    fn context_collects_violations() {
        let overrides = BTreeMap::new();
        let file = file();
        let mut violations = Vec::new();
        let mut ctx = SniffContext::new(&file, "Std.Cat.Name", ReportPolicy::new(&overrides, true), &mut violations);
        assert_eq!(ctx.tokens()[0].text, "a");
        assert!(ctx.add_warning(0, "w", "W", &[]));
        assert!(ctx.add_error(1, "e", "E", &[]));
        assert_eq!(violations.len(), 2);
    }
}
