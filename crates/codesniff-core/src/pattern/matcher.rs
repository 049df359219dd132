//! Matching a compiled template against real tokens around a trigger.

use super::compile::{CompiledPattern, PatternStep, SkipTarget, SKIP_MARKER, WORD_MARKER};
use crate::file::SourceFile;
use crate::token::{Token, TokenKind};

/// Result of applying one template at one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The template does not describe the code here.
    NotApplicable,
    /// The code has the expected shape.
    Matched,
    /// The template applies but the code deviates from it.
    Mismatched {
        /// Template text with line breaks escaped.
        expected: String,
        /// Reconstructed code with line breaks escaped.
        found: String,
    },
}

/// Applies `pattern` with its listen step anchored at `trigger`.
#[must_use]
pub fn match_pattern(
    pattern: &CompiledPattern,
    file: &SourceFile,
    trigger: usize,
    ignore_comments: bool,
) -> MatchOutcome {
    let mut walk = Walk {
        tokens: file.tokens(),
        steps: pattern.steps(),
        ignore_comments,
        mismatch: false,
        last_literal: trigger,
    };
    let listen = pattern.listen_index();

    let Some(before) = walk.backward(trigger, listen) else {
        return MatchOutcome::NotApplicable;
    };
    let Some(after) = walk.forward(trigger, listen) else {
        return MatchOutcome::NotApplicable;
    };

    if walk.mismatch {
        MatchOutcome::Mismatched {
            expected: pattern.expected(),
            found: escape_eol(&(before + &after)),
        }
    } else {
        MatchOutcome::Matched
    }
}

struct Walk<'a> {
    tokens: &'a [Token],
    steps: &'a [PatternStep],
    ignore_comments: bool,
    mismatch: bool,
    last_literal: usize,
}

impl Walk<'_> {
    fn ignorable(&self, kind: TokenKind) -> bool {
        kind == TokenKind::Whitespace || (self.ignore_comments && kind.is_comment())
    }

    fn text(&self, from: usize, to: usize) -> String {
        self.tokens[from..to].iter().map(|t| t.text.as_str()).collect()
    }

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.ignorable(self.tokens[i].kind))
    }

    fn previous_significant(&self, before: usize) -> Option<usize> {
        (0..before).rev().find(|&i| !self.ignorable(self.tokens[i].kind))
    }

    /// Flags ignorable tokens the template did not ask for. Comments are
    /// tolerated when opted in and the skipped run stays on `line`.
    fn check_gap(&mut self, from: usize, to: usize, line: usize) {
        if from >= to {
            return;
        }
        let gap = &self.tokens[from..to];
        let commented = self.ignore_comments
            && gap.iter().any(|t| t.kind.is_comment())
            && gap.iter().all(|t| t.line == line && line_breaks(&t.text) == 0);
        if !commented {
            self.mismatch = true;
        }
    }

    fn whitespace_fits(&self, index: usize, actual: &str, expected: &str) -> bool {
        match self.steps.get(index + 1) {
            Some(PatternStep::Skip(_)) => actual.starts_with(expected),
            _ => actual == expected,
        }
    }

    /// Walks steps before the listen step right to left. Returns the found
    /// text, or `None` if the template does not apply.
    fn backward(&mut self, trigger: usize, listen: usize) -> Option<String> {
        let (tokens, steps) = (self.tokens, self.steps);
        let mut parts: Vec<String> = Vec::new();
        let mut cursor = trigger;

        for index in (0..listen).rev() {
            match &steps[index] {
                PatternStep::Literal {
                    kind: TokenKind::Whitespace,
                    text,
                } => {
                    let previous = cursor
                        .checked_sub(1)
                        .filter(|&p| tokens[p].kind == TokenKind::Whitespace);
                    match previous {
                        Some(p) => {
                            // Leading whitespace only has to exist.
                            if index != 0 && !self.whitespace_fits(index, &tokens[p].text, text) {
                                self.mismatch = true;
                            }
                            parts.push(tokens[p].text.clone());
                            cursor = p;
                        }
                        None if index != 0 => self.mismatch = true,
                        None => {}
                    }
                }
                PatternStep::Literal { kind, .. } => {
                    let pos = self.previous_significant(cursor)?;
                    if tokens[pos].kind != *kind {
                        return None;
                    }
                    self.check_gap(pos + 1, cursor, tokens[pos].line);
                    parts.push(self.text(pos, cursor));
                    cursor = pos;
                }
                PatternStep::Word => {
                    let pos = self.previous_significant(cursor)?;
                    self.check_gap(pos + 1, cursor, tokens[pos].line);
                    if !tokens[pos].kind.is_word() {
                        self.mismatch = true;
                    }
                    parts.push(self.text(pos + 1, cursor));
                    parts.push(WORD_MARKER.to_string());
                    cursor = pos;
                }
                PatternStep::Newline => {
                    let end = cursor;
                    let mut breaks = 0;
                    while let Some(p) = cursor.checked_sub(1) {
                        let token = &tokens[p];
                        if !self.ignorable(token.kind) {
                            break;
                        }
                        breaks += line_breaks(&token.text);
                        cursor = p;
                    }
                    if breaks != 1 {
                        self.mismatch = true;
                    }
                    parts.push(self.text(cursor, end));
                }
                PatternStep::Skip(target) => {
                    let opener = match target.opener() {
                        Some(kind) => {
                            let closer = tokens.get(cursor)?;
                            let opener = closer.bracket_opener?;
                            if tokens[opener].kind != kind {
                                return None;
                            }
                            opener
                        }
                        None => {
                            let PatternStep::Literal { kind, .. } = steps.get(index.checked_sub(1)?)? else {
                                return None;
                            };
                            (0..cursor).rev().find(|&p| tokens[p].kind == *kind)?
                        }
                    };
                    parts.push(SKIP_MARKER.to_string());
                    cursor = opener + 1;
                }
            }
        }

        parts.reverse();
        Some(parts.concat())
    }

    /// Walks the listen step and everything after it left to right.
    fn forward(&mut self, trigger: usize, listen: usize) -> Option<String> {
        let (tokens, steps) = (self.tokens, self.steps);
        let PatternStep::Literal { kind, .. } = steps.get(listen)? else {
            return None;
        };
        let token = tokens.get(trigger)?;
        if token.kind != *kind {
            return None;
        }
        let mut found = token.text.clone();
        let mut cursor = trigger + 1;
        self.last_literal = trigger;

        for index in listen + 1..steps.len() {
            match &steps[index] {
                PatternStep::Literal {
                    kind: TokenKind::Whitespace,
                    text,
                } => match tokens.get(cursor).filter(|t| t.kind == TokenKind::Whitespace) {
                    Some(actual) => {
                        if !self.whitespace_fits(index, &actual.text, text) {
                            self.mismatch = true;
                        }
                        found.push_str(&actual.text);
                        cursor += 1;
                    }
                    None => self.mismatch = true,
                },
                PatternStep::Literal { kind, .. } => {
                    let pos = self.next_significant(cursor)?;
                    let actual = &tokens[pos];
                    if actual.kind != *kind {
                        return None;
                    }
                    // A bracket owned by a later construct is not ours.
                    let owner = actual
                        .scope_condition
                        .or(actual.parenthesis_owner)
                        .filter(|&o| o != pos);
                    if owner.is_some_and(|o| o > self.last_literal) {
                        return None;
                    }
                    self.check_gap(cursor, pos, actual.line);
                    found.push_str(&self.text(cursor, pos + 1));
                    cursor = pos + 1;
                    self.last_literal = pos;
                }
                PatternStep::Word => {
                    let pos = self.next_significant(cursor)?;
                    self.check_gap(cursor, pos, tokens[pos].line);
                    if !tokens[pos].kind.is_word() {
                        self.mismatch = true;
                    }
                    found.push_str(&self.text(cursor, pos));
                    found.push_str(WORD_MARKER);
                    cursor = pos + 1;
                    self.last_literal = pos;
                }
                PatternStep::Newline => {
                    let start = cursor;
                    let mut breaks = 0;
                    while let Some(token) = tokens.get(cursor) {
                        let count = line_breaks(&token.text);
                        let layout = token.kind == TokenKind::Whitespace
                            || (self.ignore_comments && token.kind.is_comment() && breaks == 0);
                        if !layout || (breaks >= 1 && count == 0) {
                            break;
                        }
                        breaks += count;
                        cursor += 1;
                    }
                    if breaks != 1 {
                        self.mismatch = true;
                    }
                    found.push_str(&self.text(start, cursor));
                }
                PatternStep::Skip(target) => {
                    cursor = match target {
                        SkipTarget::Unknown => {
                            let PatternStep::Literal { kind, .. } = steps.get(index + 1)? else {
                                return None;
                            };
                            (cursor..tokens.len()).find(|&p| tokens[p].kind == *kind)?
                        }
                        _ => {
                            let kind = target.opener()?;
                            let opener = (0..cursor).rev().find(|&p| {
                                tokens[p].kind == kind
                                    && tokens[p].bracket_closer.is_some_and(|c| c >= cursor)
                            })?;
                            tokens[opener].bracket_closer?
                        }
                    };
                    found.push_str(SKIP_MARKER);
                }
            }
        }
        Some(found)
    }
}

fn line_breaks(text: &str) -> usize {
    text.matches('\n').count() + text.matches('\r').count() - text.matches("\r\n").count()
}

fn escape_eol(text: &str) -> String {
    text.replace("\r\n", "\\n").replace(['\n', '\r'], "\\n")
}
