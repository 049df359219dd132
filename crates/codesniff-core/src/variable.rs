//! Variable classification on top of [`ScopedSniff`]: every variable-like
//! token is routed to exactly one of three callbacks depending on whether
//! it sits in a member declaration, an executable body, or a string.

use crate::file::SourceFile;
use crate::rule::{PropertyValue, SetupError, Sniff, SniffContext, SniffError};
use crate::scope::{ScopeHandler, ScopedSniff};
use crate::token::{Token, TokenKind};
use crate::tokenizer::TokenizerFamily;

const SCOPE_KINDS: [TokenKind; 3] = [TokenKind::Class, TokenKind::Interface, TokenKind::Trait];

const MODIFIERS: [TokenKind; 6] = [
    TokenKind::Abstract,
    TokenKind::Final,
    TokenKind::Static,
    TokenKind::Public,
    TokenKind::Protected,
    TokenKind::Private,
];

const LISTEN_KINDS: [TokenKind; 4] = [
    TokenKind::Function,
    TokenKind::Variable,
    TokenKind::DoubleQuotedString,
    TokenKind::Heredoc,
];

/// Callbacks implemented by a variable rule.
pub trait VariableHandler: Send {
    /// A variable declared or used at structure level, outside any method
    /// body.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_member_var(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError>;

    /// A variable inside a method body, or anywhere outside a structure.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_variable(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError>;

    /// A string or heredoc that interpolates variables.
    ///
    /// # Errors
    ///
    /// A failure aborts the current file.
    fn process_variable_in_string(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError>;

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

/// Body tracking for the file being processed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BodyState {
    in_body: bool,
    body_end: Option<usize>,
}

/// Scope handler that classifies tokens and forwards them.
#[derive(Debug)]
pub struct VariableClassifier<H> {
    state: BodyState,
    handler: H,
}

impl<H: VariableHandler> VariableClassifier<H> {
    fn enter_function(&mut self, ctx: &mut SniffContext<'_>, pos: usize, scope: usize) {
        let file = ctx.file();
        let tokens = ctx.tokens();
        let is_abstract = declared_abstract(tokens, pos);
        let in_interface = tokens.get(scope).is_some_and(|t| t.kind == TokenKind::Interface);

        if is_abstract || in_interface {
            self.state = BodyState {
                in_body: true,
                body_end: file.find_next(&[TokenKind::Semicolon], pos, None, false),
            };
            return;
        }

        match tokens[pos].scope_closer {
            Some(closer) => {
                self.state = BodyState {
                    in_body: true,
                    body_end: Some(closer),
                };
            }
            None => {
                ctx.add_warning(
                    pos,
                    "Possible parse error: non-abstract method defined as abstract",
                    "PossibleParseError",
                    &[],
                );
                self.state = BodyState::default();
            }
        }
    }
}

impl<H: VariableHandler> ScopeHandler for VariableClassifier<H> {
    fn process_within_scope(
        &mut self,
        ctx: &mut SniffContext<'_>,
        pos: usize,
        scope: usize,
    ) -> Result<(), SniffError> {
        let token = &ctx.tokens()[pos];
        let innermost = token
            .conditions
            .iter()
            .rev()
            .find(|c| SCOPE_KINDS.contains(&c.kind))
            .map(|c| c.owner);
        if innermost != Some(scope) {
            return Ok(());
        }

        if self.state.body_end.is_some_and(|end| pos > end) {
            self.state = BodyState::default();
        }

        match token.kind {
            TokenKind::Function if !self.state.in_body => {
                self.enter_function(ctx, pos, scope);
                Ok(())
            }
            TokenKind::DoubleQuotedString | TokenKind::Heredoc => {
                if interpolates(&token.text) {
                    self.handler.process_variable_in_string(ctx, pos)?;
                }
                Ok(())
            }
            TokenKind::Variable if self.state.in_body => self.handler.process_variable(ctx, pos),
            TokenKind::Variable => self.handler.process_member_var(ctx, pos),
            _ => Ok(()),
        }
    }

    fn process_outside_scope(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let token = &ctx.tokens()[pos];
        match token.kind {
            TokenKind::Variable => self.handler.process_variable(ctx, pos),
            TokenKind::DoubleQuotedString | TokenKind::Heredoc if interpolates(&token.text) => {
                self.handler.process_variable_in_string(ctx, pos)
            }
            _ => Ok(()),
        }
    }

    fn begin_file(&mut self, _file: &SourceFile) {
        self.state = BodyState::default();
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        self.handler.supported_families()
    }

    fn description(&self) -> &'static str {
        self.handler.description()
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        self.handler.set_property(name, value)
    }
}

/// `abstract` among the modifiers written before the keyword at `pos`.
fn declared_abstract(tokens: &[Token], pos: usize) -> bool {
    tokens[..pos]
        .iter()
        .rev()
        .filter(|t| !t.kind.is_empty())
        .take_while(|t| MODIFIERS.contains(&t.kind))
        .any(|t| t.kind == TokenKind::Abstract)
}

/// An unescaped `$` followed by a name or `{`.
fn interpolates(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b'$' {
            return false;
        }
        let escapes = bytes[..i].iter().rev().take_while(|&&c| c == b'\\').count();
        let next = bytes.get(i + 1).copied();
        escapes % 2 == 0 && next.is_some_and(|c| c == b'{' || c == b'_' || c.is_ascii_alphabetic())
    })
}

/// A sniff that hands every variable-like token to a [`VariableHandler`].
pub struct VariableSniff<H> {
    inner: ScopedSniff<VariableClassifier<H>>,
}

impl<H: VariableHandler> VariableSniff<H> {
    /// Wraps a handler.
    ///
    /// # Errors
    ///
    /// Propagates scope adapter validation.
    pub fn new(handler: H) -> Result<Self, SetupError> {
        let classifier = VariableClassifier {
            state: BodyState::default(),
            handler,
        };
        Ok(Self {
            inner: ScopedSniff::new(&SCOPE_KINDS, &LISTEN_KINDS, true, classifier)?,
        })
    }

    /// The wrapped handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.inner.handler().handler
    }
}

impl<H: VariableHandler> Sniff for VariableSniff<H> {
    fn register(&self) -> Vec<TokenKind> {
        self.inner.register()
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        self.inner.supported_families()
    }

    fn description(&self) -> &'static str {
        self.inner.description()
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        self.inner.set_property(name, value)
    }

    fn begin_file(&mut self, file: &SourceFile) {
        self.inner.begin_file(file);
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        self.inner.process(ctx, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ReportPolicy;
    use crate::tokenizer::ScopeRules;
    use crate::types::Violation;
    use std::collections::BTreeMap;
    use TokenKind::{
        Abstract, Class, CloseCurlyBracket, CloseParenthesis, DocCommentClose, DocCommentOpen,
        DoubleQuotedString, Function, Identifier, Interface, OpenCurlyBracket, OpenParenthesis,
        Private, Public, Semicolon, Static, Var, Variable, Whitespace,
    };

    #[derive(Default)]
    struct Recorder(Vec<(&'static str, String)>);

    impl VariableHandler for Recorder {
        fn process_member_var(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
            self.0.push(("member", ctx.tokens()[pos].text.clone()));
            Ok(())
        }

        fn process_variable(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
            self.0.push(("variable", ctx.tokens()[pos].text.clone()));
            Ok(())
        }

        fn process_variable_in_string(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
            self.0.push(("string", ctx.tokens()[pos].text.clone()));
            Ok(())
        }
    }

    fn php(parts: &[(TokenKind, &str)]) -> SourceFile {
        let tokens = parts.iter().map(|(kind, text)| Token::new(*kind, *text)).collect();
        SourceFile::from_tokens("a.php", TokenizerFamily::Php, tokens, &ScopeRules::php(), 4)
    }

    fn run(file: &SourceFile) -> (Vec<(&'static str, String)>, Vec<Violation>) {
        let mut sniff = VariableSniff::new(Recorder::default()).unwrap();
        let overrides = BTreeMap::new();
        let mut violations = Vec::new();
        let kinds = sniff.register();
        sniff.begin_file(file);
        for (pos, token) in file.tokens().iter().enumerate() {
            if kinds.contains(&token.kind) {
                let mut ctx = SniffContext::new(file, "T.C.N", ReportPolicy::new(&overrides, true), &mut violations);
                sniff.process(&mut ctx, pos).unwrap();
            }
        }
        (sniff.handler().0.clone(), violations)
    }

    fn owned(expected: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
        expected.iter().map(|(k, t)| (*k, (*t).to_string())).collect()
    }

    #[test]
    fn classifies_members_locals_and_strings() {
        let file = php(&[
            (Class, "class"),
            (Whitespace, " "),
            (Identifier, "A"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Whitespace, "\n"),
            (Var, "var"),
            (Whitespace, " "),
            (Variable, "$member"),
            (Semicolon, ";"),
            (Whitespace, "\n"),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "f"),
            (OpenParenthesis, "("),
            (Variable, "$arg"),
            (CloseParenthesis, ")"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Whitespace, " "),
            (Variable, "$local"),
            (Semicolon, ";"),
            (Whitespace, " "),
            (DoubleQuotedString, "\"str $x\""),
            (Semicolon, ";"),
            (Whitespace, " "),
            (CloseCurlyBracket, "}"),
            (Whitespace, "\n"),
            (Abstract, "abstract"),
            (Whitespace, " "),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "g"),
            (OpenParenthesis, "("),
            (Variable, "$p"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (Whitespace, "\n"),
            (Variable, "$afterAbstract"),
            (Semicolon, ";"),
            (Whitespace, "\n"),
            (CloseCurlyBracket, "}"),
            (Whitespace, "\n"),
            (Variable, "$outside"),
            (Semicolon, ";"),
            (Whitespace, "\n"),
        ]);
        let (calls, violations) = run(&file);
        assert_eq!(
            calls,
            owned(&[
                ("member", "$member"),
                ("variable", "$arg"),
                ("variable", "$local"),
                ("string", "\"str $x\""),
                ("variable", "$p"),
                ("member", "$afterAbstract"),
                ("variable", "$outside"),
            ])
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn abstract_behind_other_modifiers() {
        let file = php(&[
            (Abstract, "abstract"),
            (Whitespace, " "),
            (Class, "class"),
            (Whitespace, " "),
            (Identifier, "A"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Abstract, "abstract"),
            (Whitespace, " "),
            (Public, "public"),
            (Whitespace, " "),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "g"),
            (OpenParenthesis, "("),
            (Variable, "$p"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (DocCommentOpen, "/**"),
            (DocCommentClose, "*/"),
            (Public, "public"),
            (Whitespace, " "),
            (Static, "static"),
            (Whitespace, " "),
            (Abstract, "abstract"),
            (Whitespace, " "),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "h"),
            (OpenParenthesis, "("),
            (Variable, "$q"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (Private, "private"),
            (Whitespace, " "),
            (Variable, "$after"),
            (Semicolon, ";"),
            (CloseCurlyBracket, "}"),
        ]);
        let (calls, violations) = run(&file);
        assert_eq!(
            calls,
            owned(&[("variable", "$p"), ("variable", "$q"), ("member", "$after")])
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn modifiers_stop_at_the_previous_statement() {
        let file = php(&[
            (Abstract, "abstract"),
            (Whitespace, " "),
            (Class, "class"),
            (Whitespace, " "),
            (Identifier, "C"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "k"),
            (OpenParenthesis, "("),
            (Variable, "$a"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (CloseCurlyBracket, "}"),
        ]);
        let (_, violations) = run(&file);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "T.C.N.PossibleParseError");
    }

    #[test]
    fn interface_methods_have_no_body() {
        let file = php(&[
            (Interface, "interface"),
            (Whitespace, " "),
            (Identifier, "I"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "h"),
            (OpenParenthesis, "("),
            (Variable, "$q"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (Variable, "$after"),
            (Semicolon, ";"),
            (CloseCurlyBracket, "}"),
        ]);
        let (calls, _) = run(&file);
        assert_eq!(calls, owned(&[("variable", "$q"), ("member", "$after")]));
    }

    #[test]
    fn missing_body_degrades_to_warning() {
        let file = php(&[
            (Class, "class"),
            (Whitespace, " "),
            (Identifier, "B"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "k"),
            (OpenParenthesis, "("),
            (Variable, "$a"),
            (CloseParenthesis, ")"),
            (Semicolon, ";"),
            (Variable, "$m"),
            (Semicolon, ";"),
            (CloseCurlyBracket, "}"),
        ]);
        let (calls, violations) = run(&file);
        assert_eq!(calls, owned(&[("member", "$a"), ("member", "$m")]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "T.C.N.PossibleParseError");
    }

    #[test]
    fn interpolation_detection() {
        assert!(interpolates("\"a $b\""));
        assert!(interpolates("\"{$b}\""));
        assert!(!interpolates("\"a \\$b\""));
        assert!(!interpolates("\"costs $5\""));
    }
}
