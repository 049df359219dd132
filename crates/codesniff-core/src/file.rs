//! A tokenized source file and its search API.

use crate::token::{Token, TokenKind};
use crate::tokenizer::{self, structure, ScopeRules, TokenizeError, Tokenizer, TokenizerFamily};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Marker that skips a whole file when it appears in its first two lines.
pub const IGNORE_FILE_MARKER: &str = "codesniff:ignore-file";
/// Comment marker that starts a suppressed line range.
pub const IGNORE_START_MARKER: &str = "codesniff:ignore-start";
/// Comment marker that ends a suppressed line range.
pub const IGNORE_END_MARKER: &str = "codesniff:ignore-end";

/// Returns true if the whole-file ignore marker is in the first two lines.
#[must_use]
pub fn has_ignore_file_marker(content: &str) -> bool {
    content
        .lines()
        .take(2)
        .any(|line| line.contains(IGNORE_FILE_MARKER))
}

/// A file's content and its immutable token stream.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    family: TokenizerFamily,
    content: String,
    eol: String,
    tokens: Vec<Token>,
    suppressed: BTreeSet<usize>,
}

impl SourceFile {
    /// Tokenizes `content` with the given tokenizer.
    ///
    /// # Errors
    ///
    /// Propagates tokenizer failures.
    pub fn parse(
        path: impl Into<PathBuf>,
        content: String,
        tokenizer: &dyn Tokenizer,
        tab_width: usize,
    ) -> Result<Self, TokenizeError> {
        let tokens = tokenizer::tokenize(tokenizer, &content, tab_width)?;
        Ok(Self::assemble(path.into(), tokenizer.family(), content, tokens))
    }

    /// Builds a file from an unlinked token stream produced elsewhere, for
    /// example by the host's primary-language tokenizer. Positions and
    /// structural links are computed here.
    #[must_use]
    pub fn from_tokens(
        path: impl Into<PathBuf>,
        family: TokenizerFamily,
        mut tokens: Vec<Token>,
        rules: &ScopeRules,
        tab_width: usize,
    ) -> Self {
        structure::assign_positions(&mut tokens, tab_width);
        structure::annotate(&mut tokens, rules);
        let content: String = tokens.iter().map(|t| t.text.as_str()).collect();
        Self::assemble(path.into(), family, content, tokens)
    }

    fn assemble(path: PathBuf, family: TokenizerFamily, content: String, tokens: Vec<Token>) -> Self {
        let eol = detect_eol(&content).to_string();
        let suppressed = suppressed_lines(&tokens);
        Self {
            path,
            family,
            content,
            eol,
            tokens,
            suppressed,
        }
    }

    /// File path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tokenizer family.
    #[must_use]
    pub fn family(&self) -> TokenizerFamily {
        self.family
    }

    /// Raw content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The line terminator used by the file (`\n` if none is found).
    #[must_use]
    pub fn eol(&self) -> &str {
        &self.eol
    }

    /// The token stream.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token at a position.
    #[must_use]
    pub fn token(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    /// Returns true if diagnostics on `line` are suppressed by markers.
    #[must_use]
    pub fn is_line_suppressed(&self, line: usize) -> bool {
        self.suppressed.contains(&line)
    }

    /// Finds the next token at or after `start` whose kind is in `kinds`
    /// (or, with `exclude`, is not in `kinds`). Stops before `end`.
    #[must_use]
    pub fn find_next(
        &self,
        kinds: &[TokenKind],
        start: usize,
        end: Option<usize>,
        exclude: bool,
    ) -> Option<usize> {
        let end = end.unwrap_or(self.tokens.len()).min(self.tokens.len());
        (start..end).find(|&i| kinds.contains(&self.tokens[i].kind) != exclude)
    }

    /// Finds the previous token at or before `start` whose kind is in
    /// `kinds` (or, with `exclude`, is not in `kinds`). Stops after `end`.
    #[must_use]
    pub fn find_previous(
        &self,
        kinds: &[TokenKind],
        start: usize,
        end: Option<usize>,
        exclude: bool,
    ) -> Option<usize> {
        if self.tokens.is_empty() {
            return None;
        }
        let start = start.min(self.tokens.len() - 1);
        let floor = end.map_or(0, |e| e + 1);
        (floor..=start)
            .rev()
            .find(|&i| kinds.contains(&self.tokens[i].kind) != exclude)
    }

    /// Next non-whitespace, non-comment token at or after `start`.
    #[must_use]
    pub fn next_significant(&self, start: usize) -> Option<usize> {
        (start..self.tokens.len()).find(|&i| !self.tokens[i].kind.is_empty())
    }

    /// Previous non-whitespace, non-comment token at or before `start`.
    #[must_use]
    pub fn previous_significant(&self, start: usize) -> Option<usize> {
        if self.tokens.is_empty() {
            return None;
        }
        (0..=start.min(self.tokens.len() - 1))
            .rev()
            .find(|&i| !self.tokens[i].kind.is_empty())
    }

    /// Concatenated text of `len` tokens starting at `start`.
    #[must_use]
    pub fn tokens_as_string(&self, start: usize, len: usize) -> String {
        self.tokens
            .iter()
            .skip(start)
            .take(len)
            .map(|t| t.text.as_str())
            .collect()
    }

    /// Name of the declaration at `pos` (the identifier after `function`,
    /// `class` and similar keywords).
    #[must_use]
    pub fn declaration_name(&self, pos: usize) -> Option<&str> {
        let keyword = self.tokens.get(pos)?;
        if !matches!(
            keyword.kind,
            TokenKind::Function | TokenKind::Class | TokenKind::Interface | TokenKind::Trait
        ) {
            return None;
        }
        let name = self.next_significant(pos + 1)?;
        let token = &self.tokens[name];
        (token.kind == TokenKind::Identifier).then_some(token.text.as_str())
    }
}

fn detect_eol(content: &str) -> &'static str {
    match content.find(['\n', '\r']) {
        Some(i) if content[i..].starts_with("\r\n") => "\r\n",
        Some(i) if content[i..].starts_with('\r') => "\r",
        _ => "\n",
    }
}

fn suppressed_lines(tokens: &[Token]) -> BTreeSet<usize> {
    let mut lines = BTreeSet::new();
    let mut from: Option<usize> = None;
    for token in tokens.iter().filter(|t| t.kind.is_comment()) {
        if token.text.contains(IGNORE_START_MARKER) {
            from.get_or_insert(token.line);
        } else if token.text.contains(IGNORE_END_MARKER) {
            if let Some(start) = from.take() {
                lines.extend(start..=token.line);
            }
        }
    }
    if let Some(start) = from {
        let last = tokens.last().map_or(start, |t| t.line);
        lines.extend(start..=last);
    }
    lines
}
