//! Declarative shape checks.
//!
//! A [`PatternRule`] lists templates such as `if (...) {EOL`. Each template
//! is compiled once into [`PatternStep`]s; [`PatternSniff`] registers on the
//! most selective literal of every template and, when woken, matches the
//! template outward from that token in both directions.
//!
//! Three markers have special meaning inside a template:
//!
//! - `...` skips to the closer of the innermost bracket left open before it
//! - `abc` matches any single identifier
//! - `EOL` matches exactly one line break

mod compile;
mod matcher;

pub use compile::{
    CompiledPattern, PatternStep, SkipTarget, NEWLINE_MARKER, SKIP_MARKER, WORD_MARKER,
};
pub use matcher::{match_pattern, MatchOutcome};

use crate::file::SourceFile;
use crate::rule::{PropertyValue, SetupError, Sniff, SniffContext, SniffError};
use crate::token::TokenKind;
use crate::tokenizer::{Tokenizer, TokenizerFamily};

/// A rule described by templates.
pub trait PatternRule: Send {
    /// Templates, tried in this order at each position.
    fn patterns(&self) -> Vec<String>;

    /// Treat comments as ignorable while matching.
    fn ignore_comments(&self) -> bool {
        false
    }

    /// Extra kinds handled by [`PatternRule::process_supplementary`].
    fn supplementary(&self) -> Vec<TokenKind> {
        Vec::new()
    }

    /// Called for tokens of a supplementary kind.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_supplementary(&mut self, _ctx: &mut SniffContext<'_>, _pos: usize) -> Result<(), SniffError> {
        Ok(())
    }

    /// Families the rule runs on.
    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php]
    }

    /// One-line description for generated docs.
    fn description(&self) -> &'static str {
        ""
    }

    /// Applies a rule-set property.
    ///
    /// # Errors
    ///
    /// Unknown names and unusable values.
    fn set_property(&mut self, name: &str, _value: &PropertyValue) -> Result<(), SniffError> {
        Err(SniffError::UnknownProperty { name: name.to_string() })
    }
}

/// Runs a [`PatternRule`]'s templates as a sniff.
pub struct PatternSniff<R> {
    rule: R,
    patterns: Vec<CompiledPattern>,
    supplementary: Vec<TokenKind>,
}

impl<R: PatternRule> PatternSniff<R> {
    /// Compiles every template of `rule`.
    ///
    /// # Errors
    ///
    /// Any template that fails to compile.
    pub fn new(rule: R, tokenizer: &dyn Tokenizer) -> Result<Self, SetupError> {
        let patterns = rule
            .patterns()
            .iter()
            .map(|template| CompiledPattern::compile(template, tokenizer))
            .collect::<Result<Vec<_>, _>>()?;
        let supplementary = rule.supplementary();
        Ok(Self {
            rule,
            patterns,
            supplementary,
        })
    }

    /// The compiled templates.
    #[must_use]
    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    /// The wrapped rule.
    #[must_use]
    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<R: PatternRule> Sniff for PatternSniff<R> {
    fn register(&self) -> Vec<TokenKind> {
        let mut kinds: Vec<TokenKind> = Vec::new();
        let listened = self.patterns.iter().map(CompiledPattern::listen_kind);
        for kind in listened.chain(self.supplementary.iter().copied()) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        self.rule.supported_families()
    }

    fn description(&self) -> &'static str {
        self.rule.description()
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        self.rule.set_property(name, value)
    }

    fn begin_file(&mut self, _file: &SourceFile) {}

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let Some(kind) = ctx.tokens().get(pos).map(|t| t.kind) else {
            return Ok(());
        };
        let ignore_comments = self.rule.ignore_comments();

        let mut mismatches = Vec::new();
        let mut matched = false;
        for pattern in self.patterns.iter().filter(|p| p.listen_kind() == kind) {
            match match_pattern(pattern, ctx.file(), pos, ignore_comments) {
                MatchOutcome::Matched => {
                    matched = true;
                    break;
                }
                MatchOutcome::Mismatched { expected, found } => mismatches.push((expected, found)),
                MatchOutcome::NotApplicable => {}
            }
        }
        if !matched {
            for (expected, found) in &mismatches {
                ctx.add_error(
                    pos,
                    "Expected \"%s\"; found \"%s\"",
                    "Found",
                    &[expected.as_str(), found.as_str()],
                );
            }
        }

        if self.supplementary.contains(&kind) {
            self.rule.process_supplementary(ctx, pos)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ReportPolicy;
    use crate::tokenizer::JsTokenizer;
    use crate::types::Violation;
    use std::collections::BTreeMap;

    struct Loops {
        semicolons: usize,
    }

    impl PatternRule for Loops {
        fn patterns(&self) -> Vec<String> {
            vec!["while (...) {EOL".to_string(), "} while (...);EOL".to_string()]
        }

        fn supplementary(&self) -> Vec<TokenKind> {
            vec![TokenKind::Semicolon]
        }

        fn process_supplementary(&mut self, _ctx: &mut SniffContext<'_>, _pos: usize) -> Result<(), SniffError> {
            self.semicolons += 1;
            Ok(())
        }
    }

    fn run(source: &str) -> (PatternSniff<Loops>, Vec<Violation>) {
        let tokenizer = JsTokenizer::new();
        let mut sniff = PatternSniff::new(Loops { semicolons: 0 }, &tokenizer).unwrap();
        let file = SourceFile::parse("a.js", source.to_string(), &tokenizer, 4).unwrap();
        let overrides = BTreeMap::new();
        let mut violations = Vec::new();
        let kinds = sniff.register();
        for (pos, token) in file.tokens().iter().enumerate() {
            if kinds.contains(&token.kind) {
                let mut ctx = SniffContext::new(&file, "Std.Cat.Loops", ReportPolicy::new(&overrides, true), &mut violations);
                sniff.process(&mut ctx, pos).unwrap();
            }
        }
        (sniff, violations)
    }

    #[test]
    fn registers_listen_kinds_once_plus_supplementary() {
        let sniff = PatternSniff::new(Loops { semicolons: 0 }, &JsTokenizer::new()).unwrap();
        assert_eq!(sniff.register(), vec![TokenKind::While, TokenKind::Semicolon]);
    }

    #[test]
    fn clean_match_suppresses_other_templates() {
        let (sniff, violations) = run("do {\n    a();\n} while (x);\n");
        assert!(violations.is_empty());
        assert_eq!(sniff.rule().semicolons, 2);
    }

    #[test]
    fn each_applicable_template_reports() {
        let (_, violations) = run("while (x){\n}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "Std.Cat.Loops.Found");
        assert_eq!(
            violations[0].message,
            "Expected \"while (...) {\\n\"; found \"while (...){\\n\""
        );
    }
}
