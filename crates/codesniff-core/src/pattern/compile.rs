//! Template compilation.

use crate::rule::SetupError;
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;

/// Skips to the closing bracket of the enclosing pair.
pub const SKIP_MARKER: &str = "...";
/// Matches any single identifier.
pub const WORD_MARKER: &str = "abc";
/// Matches exactly one line break.
pub const NEWLINE_MARKER: &str = "EOL";

/// Where a skip step jumps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipTarget {
    /// Closer of the enclosing `(`.
    Parenthesis,
    /// Closer of the enclosing `{`.
    Brace,
    /// Closer of the enclosing `[`.
    Square,
    /// No enclosing bracket in the template: skip to the next token of the
    /// following literal's kind.
    Unknown,
}

impl SkipTarget {
    /// Opening bracket kind for the target, if any.
    #[must_use]
    pub fn opener(self) -> Option<TokenKind> {
        match self {
            Self::Parenthesis => Some(TokenKind::OpenParenthesis),
            Self::Brace => Some(TokenKind::OpenCurlyBracket),
            Self::Square => Some(TokenKind::OpenSquareBracket),
            Self::Unknown => None,
        }
    }
}

/// One compiled unit of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternStep {
    /// A token that must appear with this kind. Whitespace literals also
    /// compare their text.
    Literal {
        /// Token kind.
        kind: TokenKind,
        /// Token text from the template.
        text: String,
    },
    /// Jump over bracketed content.
    Skip(SkipTarget),
    /// Any identifier.
    Word,
    /// One line break.
    Newline,
}

impl PatternStep {
    fn is_significant_literal(&self) -> Option<TokenKind> {
        match self {
            Self::Literal { kind, .. } if *kind != TokenKind::Whitespace => Some(*kind),
            _ => None,
        }
    }
}

/// A template compiled once per rule instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    template: String,
    steps: Vec<PatternStep>,
    listen: usize,
}

impl CompiledPattern {
    /// Compiles a template, lexing literal text with `tokenizer`.
    ///
    /// # Errors
    ///
    /// The literal text cannot be lexed, or it contains no token to listen
    /// for.
    pub fn compile(template: &str, tokenizer: &dyn Tokenizer) -> Result<Self, SetupError> {
        let mut steps = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < template.len() {
            let rest = &template[i..];
            let marker = [SKIP_MARKER, WORD_MARKER, NEWLINE_MARKER]
                .into_iter()
                .find(|m| rest.starts_with(m));
            let Some(marker) = marker else {
                i += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            };

            lex_literal(template, &template[literal_start..i], tokenizer, &mut steps)?;
            steps.push(match marker {
                SKIP_MARKER => PatternStep::Skip(skip_target(&template[..i])),
                WORD_MARKER => PatternStep::Word,
                _ => PatternStep::Newline,
            });
            i += marker.len();
            literal_start = i;
        }
        lex_literal(template, &template[literal_start..], tokenizer, &mut steps)?;

        let mut listen: Option<(usize, u32)> = None;
        for (index, step) in steps.iter().enumerate() {
            if let Some(kind) = step.is_significant_literal() {
                if listen.map_or(true, |(_, weight)| kind.weight() > weight) {
                    listen = Some((index, kind.weight()));
                }
            }
        }
        let (listen, _) = listen.ok_or_else(|| SetupError::NoListenerToken {
            pattern: template.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            steps,
            listen,
        })
    }

    /// The template as written.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Compiled steps.
    #[must_use]
    pub fn steps(&self) -> &[PatternStep] {
        &self.steps
    }

    /// Index of the step the rule registers on.
    #[must_use]
    pub fn listen_index(&self) -> usize {
        self.listen
    }

    /// Token kind the rule registers on.
    #[must_use]
    pub fn listen_kind(&self) -> TokenKind {
        self.steps[self.listen]
            .is_significant_literal()
            .unwrap_or(TokenKind::Whitespace)
    }

    /// The template as shown in diagnostics.
    #[must_use]
    pub fn expected(&self) -> String {
        self.template.replace(NEWLINE_MARKER, "\\n")
    }

    /// Source text that satisfies the template: literals verbatim, skips
    /// empty, words as a bare name and newlines as `\n`.
    #[must_use]
    pub fn sample(&self) -> String {
        self.steps
            .iter()
            .map(|step| match step {
                PatternStep::Literal { text, .. } => text.as_str(),
                PatternStep::Skip(_) => "",
                PatternStep::Word => WORD_MARKER,
                PatternStep::Newline => "\n",
            })
            .collect()
    }
}

fn lex_literal(
    template: &str,
    text: &str,
    tokenizer: &dyn Tokenizer,
    steps: &mut Vec<PatternStep>,
) -> Result<(), SetupError> {
    if text.is_empty() {
        return Ok(());
    }
    let tokens = tokenizer.lex(text).map_err(|e| SetupError::InvalidPattern {
        pattern: template.to_string(),
        message: e.to_string(),
    })?;
    steps.extend(tokens.into_iter().map(|t| PatternStep::Literal {
        kind: t.kind,
        text: t.text,
    }));
    Ok(())
}

/// The innermost bracket left open in `prefix`.
fn skip_target(prefix: &str) -> SkipTarget {
    let (mut paren, mut brace, mut square) = (0usize, 0usize, 0usize);
    for c in prefix.chars().rev() {
        match c {
            ')' => paren += 1,
            '}' => brace += 1,
            ']' => square += 1,
            '(' if paren == 0 => return SkipTarget::Parenthesis,
            '{' if brace == 0 => return SkipTarget::Brace,
            '[' if square == 0 => return SkipTarget::Square,
            '(' => paren -= 1,
            '{' => brace -= 1,
            '[' => square -= 1,
            _ => {}
        }
    }
    SkipTarget::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::JsTokenizer;

    fn compile(template: &str) -> CompiledPattern {
        CompiledPattern::compile(template, &JsTokenizer::new()).unwrap()
    }

    fn literal(kind: TokenKind, text: &str) -> PatternStep {
        PatternStep::Literal {
            kind,
            text: text.to_string(),
        }
    }

    #[test]
    fn compiles_control_signature() {
        let pattern = compile("if (...) {EOL");
        assert_eq!(
            pattern.steps(),
            &[
                literal(TokenKind::If, "if"),
                literal(TokenKind::Whitespace, " "),
                literal(TokenKind::OpenParenthesis, "("),
                PatternStep::Skip(SkipTarget::Parenthesis),
                literal(TokenKind::CloseParenthesis, ")"),
                literal(TokenKind::Whitespace, " "),
                literal(TokenKind::OpenCurlyBracket, "{"),
                PatternStep::Newline,
            ]
        );
        assert_eq!(pattern.listen_kind(), TokenKind::If);
        assert_eq!(pattern.expected(), "if (...) {\\n");
    }

    #[test]
    fn listener_is_the_most_selective_literal() {
        assert_eq!(compile("} else {EOL").listen_kind(), TokenKind::Else);
        assert_eq!(compile("} while (...);EOL").listen_kind(), TokenKind::While);
        let else_if = compile("} else if (...) {EOL");
        assert_eq!(else_if.listen_kind(), TokenKind::Else);
        assert_eq!(else_if.listen_index(), 2);
    }

    #[test]
    fn word_marker_and_skip_targets() {
        let pattern = compile("function abc(...)");
        assert_eq!(pattern.steps()[2], PatternStep::Word);
        assert_eq!(pattern.steps()[4], PatternStep::Skip(SkipTarget::Parenthesis));

        assert_eq!(skip_target("x = [a, ("), SkipTarget::Parenthesis);
        assert_eq!(skip_target("a = [(b) "), SkipTarget::Square);
        assert_eq!(skip_target("{ (a) }"), SkipTarget::Unknown);
    }

    #[test]
    fn whitespace_only_template_has_no_listener() {
        let err = CompiledPattern::compile("EOL", &JsTokenizer::new()).unwrap_err();
        assert!(matches!(err, SetupError::NoListenerToken { .. }));
    }

    #[test]
    fn sample_renders_markers() {
        assert_eq!(compile("if (...) {EOL").sample(), "if () {\n");
        assert_eq!(compile("function abc(...)").sample(), "function abc()");
    }
}
