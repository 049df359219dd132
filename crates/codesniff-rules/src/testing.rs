//! Drives a single sniff over a snippet, the way the engine would.

use codesniff_core::tokenizer::{JsTokenizer, ScopeRules};
use codesniff_core::{
    ReportPolicy, Sniff, SniffContext, SourceFile, Token, TokenKind, TokenizerFamily, Violation,
};
use std::collections::BTreeMap;

pub(crate) fn run(sniff: &mut dyn Sniff, code: &str, file: &SourceFile) -> Vec<Violation> {
    let kinds = sniff.register();
    let overrides = BTreeMap::new();
    let mut violations = Vec::new();
    sniff.begin_file(file);
    for (pos, token) in file.tokens().iter().enumerate() {
        if kinds.contains(&token.kind) {
            let mut ctx = SniffContext::new(file, code, ReportPolicy::new(&overrides, true), &mut violations);
            sniff.process(&mut ctx, pos).unwrap();
        }
    }
    violations
}

pub(crate) fn check_js(sniff: &mut dyn Sniff, code: &str, source: &str) -> Vec<Violation> {
    let file = SourceFile::parse("test.js", source.to_string(), &JsTokenizer::new(), 4).unwrap();
    run(sniff, code, &file)
}

/// Builds a primary-language file from `(kind, text)` pairs.
pub(crate) fn php(parts: &[(TokenKind, &str)]) -> SourceFile {
    let tokens = parts.iter().map(|(kind, text)| Token::new(*kind, *text)).collect();
    SourceFile::from_tokens("test.php", TokenizerFamily::Php, tokens, &ScopeRules::php(), 4)
}
