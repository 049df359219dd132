//! Integration test: the engine end to end with small in-test sniffs.
//!
//! Covers lexing, rule-set resolution, pattern rules, whole-file ignores
//! and the interactive loop through the public API only.

use codesniff_core::pattern::{match_pattern, CompiledPattern, MatchOutcome, PatternRule, PatternSniff};
use codesniff_core::ruleset::{self, RulesetError};
use codesniff_core::tokenizer::{self, JsTokenizer};
use codesniff_core::{
    Config, Engine, FileStatus, ScopeHandler, ScopedSniff, SetupError, Sniff, SniffContext, SniffError,
    SniffInstance, SniffRegistry, SourceFile, Standard, TokenKind, TokenizerFamily,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct NoDebugger;

impl Sniff for NoDebugger {
    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Identifier]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Js]
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        if ctx.tokens()[pos].text == "debugger" {
            ctx.add_error(pos, "Debugger statement found", "Found", &[]);
        }
        Ok(())
    }
}

struct IfSignature;

impl PatternRule for IfSignature {
    fn patterns(&self) -> Vec<String> {
        vec!["if (...) {EOL".to_string()]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Js]
    }
}

fn registry() -> Arc<SniffRegistry> {
    let mut registry = SniffRegistry::new();
    registry.add_standard(Standard::builtin("Test", "Sniffs used by the integration tests"));
    registry
        .register("Test.Debug.NoDebugger", || Ok(SniffInstance::token(NoDebugger)))
        .expect("code should be valid");
    registry
        .register("Test.Shape.IfSignature", || {
            Ok(SniffInstance::token(PatternSniff::new(IfSignature, &JsTokenizer::new())?))
        })
        .expect("code should be valid");
    Arc::new(registry)
}

fn engine(standard: &str) -> Engine {
    Engine::builder(Config::default())
        .registry(registry())
        .standard(standard)
        .build()
        .expect("engine should build")
}

fn write_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, content) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, content).expect("write");
    }
    dir
}

// ── Lexing ──

fn dump(source: &str) -> String {
    tokenizer::tokenize(&JsTokenizer::new(), source, 4)
        .expect("source should lex")
        .iter()
        .map(|t| format!("{}:{} {:?} {:?}", t.line, t.column, t.kind, t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn division_is_never_a_regex() {
    let tokens = tokenizer::tokenize(&JsTokenizer::new(), "6/2", 4).expect("lex");
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Divide, TokenKind::Number]);
}

#[test]
fn token_stream_snapshot() {
    insta::assert_snapshot!(dump("var r = /a+/g;\nx = 6/2; // end\n"), @r###"
    1:1 Var "var"
    1:4 Whitespace " "
    1:5 Identifier "r"
    1:6 Whitespace " "
    1:7 Equal "="
    1:8 Whitespace " "
    1:9 Regex "/a+/g"
    1:14 Semicolon ";"
    1:15 Whitespace "\n"
    2:1 Identifier "x"
    2:2 Whitespace " "
    2:3 Equal "="
    2:4 Whitespace " "
    2:5 Number "6"
    2:6 Divide "/"
    2:7 Number "2"
    2:8 Semicolon ";"
    2:9 Whitespace " "
    2:10 Comment "// end"
    2:16 Whitespace "\n"
    "###);
}

#[test]
fn lexing_is_lossless() {
    let samples = [
        "var a = 'it\\'s', b = \"x\";\n",
        "/**\n * Adds.\n * @param {number} a\n * @return {number}\n */\nfunction add(a) {\r\n\treturn a / 2 /* half */;\r\n}\n",
        "var o = {k: [1, 2.5], re: /[a-z]+\\//gi};\nlabel: for (;;) { break label; }\n",
        "x = 'unterminated\ny = a / b / c;\n",
        "/* one\n   two */ z >>>= 1;",
    ];
    for source in samples {
        let tokens = tokenizer::tokenize(&JsTokenizer::new(), source, 4).expect("lex");
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, source);
        assert!(
            tokens.iter().all(|t| t.text.trim_end_matches(['\r', '\n']).lines().count() <= 1),
            "a token spans more than one line in {source:?}"
        );
    }
}

// ── Rule-set resolution ──

#[test]
fn include_then_exclude_leaves_nothing_from_the_pair() {
    let dir = write_tree(&[
        (
            "include_first.xml",
            r#"<ruleset name="A">
                 <rule ref="Test.Debug.NoDebugger"/>
                 <rule ref="Test"><exclude name="Test.Debug.NoDebugger"/></rule>
               </ruleset>"#,
        ),
        (
            "exclude_first.xml",
            r#"<ruleset name="B">
                 <rule ref="Test"><exclude name="Test.Debug.NoDebugger"/></rule>
                 <rule ref="Test.Debug.NoDebugger"/>
               </ruleset>"#,
        ),
    ]);
    let registry = registry();
    let reference = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    let first = ruleset::resolve(&registry, &reference("include_first.xml"), &[]).expect("resolve");
    let second = ruleset::resolve(&registry, &reference("exclude_first.xml"), &[]).expect("resolve");

    assert_eq!(first.sniffs, vec!["Test.Shape.IfSignature".to_string()]);
    assert_eq!(first.sniffs, second.sniffs);
}

#[test]
fn resolution_is_idempotent() {
    let registry = registry();
    let allow = vec!["Test.Debug.NoDebugger".to_string()];
    let once = ruleset::resolve(&registry, "Test", &allow).expect("resolve");
    let twice = ruleset::resolve(&registry, "Test", &allow).expect("resolve");
    assert_eq!(once, twice);
    assert_eq!(once.sniffs, allow);
}

#[test]
fn unknown_sniff_is_fatal_before_any_file() {
    let err = Engine::builder(Config::default())
        .registry(registry())
        .standard("Test.Debug.Missing")
        .build()
        .err()
        .expect("build should fail");
    assert!(err.to_string().contains("Test.Debug.Missing"));
}

#[test]
fn self_referencing_ruleset_is_a_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("self.xml");
    std::fs::write(&path, r#"<ruleset name="Self"><rule ref="self.xml"/></ruleset>"#).expect("write");
    let err = ruleset::resolve(&registry(), &path.to_string_lossy(), &[]).expect_err("cycle");
    assert!(matches!(err, RulesetError::Cycle { .. }));
}

// ── Pattern rules ──

#[test]
fn control_signature_spacing() {
    let mut engine = engine("Test.Shape.IfSignature");

    let clean = engine.process_source(Path::new("ok.js"), "if (x) {\n}\n".to_string());
    assert!(clean.violations.is_empty());

    let bad = engine.process_source(Path::new("bad.js"), "if (x){\n}\n".to_string());
    assert_eq!(bad.violations.len(), 1);
    assert_eq!(bad.violations[0].code, "Test.Shape.IfSignature.Found");
    assert_eq!(
        bad.violations[0].message,
        r#"Expected "if (...) {\n"; found "if (...){\n""#
    );
}

#[test]
fn templates_match_their_own_sample() {
    let templates = [
        "if (...) {EOL",
        "} else {EOL",
        "} else if (...) {EOL",
        "do {EOL",
        "} while (...);EOL",
        "while (...) {EOL",
        "for (...) {EOL",
        "switch (...) {EOL",
        "try {EOL",
        "} catch (...) {EOL",
        "function abc(...)",
    ];
    let tokenizer = JsTokenizer::new();
    for template in templates {
        let pattern = CompiledPattern::compile(template, &tokenizer).expect("template compiles");
        let file = SourceFile::parse("sample.js", pattern.sample(), &tokenizer, 4).expect("sample lexes");
        let trigger = file
            .tokens()
            .iter()
            .position(|t| t.kind == pattern.listen_kind())
            .expect("sample contains the listen token");
        assert_eq!(
            match_pattern(&pattern, &file, trigger, false),
            MatchOutcome::Matched,
            "template {template:?} does not match {:?}",
            pattern.sample()
        );
    }
}

// ── Scope adapter ──

struct Silent;

impl ScopeHandler for Silent {
    fn process_within_scope(
        &mut self,
        _ctx: &mut SniffContext<'_>,
        _pos: usize,
        _scope: usize,
    ) -> Result<(), SniffError> {
        Ok(())
    }
}

#[test]
fn scope_and_listen_sets_must_be_disjoint() {
    let kinds = [
        TokenKind::Function,
        TokenKind::Class,
        TokenKind::Variable,
        TokenKind::Identifier,
    ];
    for mask_scope in 1u8..16 {
        for mask_listen in 1u8..16 {
            let pick = |mask: u8| -> Vec<TokenKind> {
                kinds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, k)| *k)
                    .collect()
            };
            let built = ScopedSniff::new(&pick(mask_scope), &pick(mask_listen), false, Silent);
            if mask_scope & mask_listen == 0 {
                assert!(built.is_ok());
            } else {
                assert!(matches!(built, Err(SetupError::OverlappingKinds { .. })));
            }
        }
    }
}

// ── Files and interaction ──

#[test]
fn ignored_file_is_skipped_not_clean() {
    let dir = write_tree(&[("only.js", "// codesniff:ignore-file\ndebugger;\n")]);
    let result = engine("Test")
        .process(&[dir.path().to_path_buf()], true)
        .expect("run");
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].status, FileStatus::Skipped);
    assert_eq!(result.violations().count(), 0);
}

#[test]
fn quitting_interactively_stops_the_batch() {
    let dir = write_tree(&[("a.js", "debugger;\n"), ("b.js", "debugger;\n"), ("c.js", "ok;\n")]);
    let mut shown = Vec::new();
    let mut input = Cursor::new("q\n");
    let result = engine("Test")
        .process_interactive(&[dir.path().to_path_buf()], true, &mut input, &mut |report| {
            shown.push(report.path.clone());
        })
        .expect("run");

    assert!(result.interrupted);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].violations.len(), 1);
    assert_eq!(shown, vec![dir.path().join("a.js")]);
}

#[test]
fn missing_path_is_an_error() {
    let err = engine("Test")
        .process(&[PathBuf::from("/definitely/not/here.js")], true)
        .expect_err("missing path");
    assert!(err.to_string().contains("does not exist"));
}
