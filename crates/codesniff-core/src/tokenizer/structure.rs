//! Language-independent structural annotation.
//!
//! Runs after lexing and before any family-specific post-processing. Fills
//! in positions, bracket pairs, parenthesis owners, scope maps and the
//! condition stack of every token.

use crate::token::{Condition, Token, TokenKind};

/// How a scope-opening keyword finds its opener and closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Optional parenthesised head, then a brace that must follow directly.
    Braced,
    /// Anything up to the first brace; a semicolon first means no body.
    Declaration,
    /// `case`/`default`: a colon opens, a terminating statement closes.
    CaseLabel,
}

/// Scope-opening keywords for one tokenizer family.
#[derive(Debug, Clone, Default)]
pub struct ScopeRules {
    openers: Vec<(TokenKind, ScopeMode)>,
}

impl ScopeRules {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a keyword.
    #[must_use]
    pub fn with(mut self, kind: TokenKind, mode: ScopeMode) -> Self {
        self.openers.push((kind, mode));
        self
    }

    /// Table for the script family.
    #[must_use]
    pub fn javascript() -> Self {
        use ScopeMode::{Braced, CaseLabel, Declaration};
        Self::new()
            .with(TokenKind::Function, Declaration)
            .with(TokenKind::If, Braced)
            .with(TokenKind::Else, Braced)
            .with(TokenKind::For, Braced)
            .with(TokenKind::While, Braced)
            .with(TokenKind::Do, Braced)
            .with(TokenKind::Switch, Braced)
            .with(TokenKind::Try, Braced)
            .with(TokenKind::Catch, Braced)
            .with(TokenKind::Finally, Braced)
            .with(TokenKind::Case, CaseLabel)
            .with(TokenKind::Default, CaseLabel)
    }

    /// Table for the primary language, used for token streams supplied by
    /// an external tokenizer.
    #[must_use]
    pub fn php() -> Self {
        use ScopeMode::{Braced, CaseLabel, Declaration};
        Self::new()
            .with(TokenKind::Class, Declaration)
            .with(TokenKind::Interface, Declaration)
            .with(TokenKind::Trait, Declaration)
            .with(TokenKind::Function, Declaration)
            .with(TokenKind::Closure, Declaration)
            .with(TokenKind::If, Braced)
            .with(TokenKind::ElseIf, Braced)
            .with(TokenKind::Else, Braced)
            .with(TokenKind::For, Braced)
            .with(TokenKind::Foreach, Braced)
            .with(TokenKind::While, Braced)
            .with(TokenKind::Do, Braced)
            .with(TokenKind::Switch, Braced)
            .with(TokenKind::Try, Braced)
            .with(TokenKind::Catch, Braced)
            .with(TokenKind::Finally, Braced)
            .with(TokenKind::Case, CaseLabel)
            .with(TokenKind::Default, CaseLabel)
    }

    /// Mode for a kind, if it opens scopes.
    #[must_use]
    pub fn mode(&self, kind: TokenKind) -> Option<ScopeMode> {
        self.openers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, mode)| *mode)
    }
}

const PARENTHESIS_OWNERS: &[TokenKind] = &[
    TokenKind::Function,
    TokenKind::Closure,
    TokenKind::If,
    TokenKind::ElseIf,
    TokenKind::For,
    TokenKind::Foreach,
    TokenKind::While,
    TokenKind::Switch,
    TokenKind::Catch,
];

/// Fills line, column and offset. Tabs advance to the next multiple of
/// `tab_width`.
pub fn assign_positions(tokens: &mut [Token], tab_width: usize) {
    let tab_width = tab_width.max(1);
    let (mut line, mut column, mut offset) = (1, 1, 0);

    for token in tokens.iter_mut() {
        token.line = line;
        token.column = column;
        token.offset = offset;
        offset += token.text.len();

        let mut chars = token.text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\n' => {
                    line += 1;
                    column = 1;
                }
                '\r' => {
                    if chars.peek() != Some(&'\n') {
                        line += 1;
                        column = 1;
                    }
                }
                '\t' => column += tab_width - ((column - 1) % tab_width),
                _ => column += 1,
            }
        }
    }
}

/// Computes every structural link. Idempotent on a fresh stream.
pub fn annotate(tokens: &mut [Token], rules: &ScopeRules) {
    link_brackets(tokens);
    link_parenthesis_owners(tokens);
    nest_parentheses(tokens);
    map_scopes(tokens, rules);
}

fn link_pair(tokens: &mut [Token], opener: usize, closer: usize) {
    for pos in [opener, closer] {
        tokens[pos].bracket_opener = Some(opener);
        tokens[pos].bracket_closer = Some(closer);
    }
    if tokens[opener].kind == TokenKind::OpenParenthesis {
        for pos in [opener, closer] {
            tokens[pos].parenthesis_opener = Some(opener);
            tokens[pos].parenthesis_closer = Some(closer);
        }
    }
}

fn link_brackets(tokens: &mut [Token]) {
    let mut parens = Vec::new();
    let mut squares = Vec::new();
    let mut curlies = Vec::new();

    for pos in 0..tokens.len() {
        let opener = match tokens[pos].kind {
            TokenKind::OpenParenthesis => {
                parens.push(pos);
                continue;
            }
            TokenKind::OpenSquareBracket => {
                squares.push(pos);
                continue;
            }
            TokenKind::OpenCurlyBracket | TokenKind::Object => {
                curlies.push(pos);
                continue;
            }
            TokenKind::CloseParenthesis => parens.pop(),
            TokenKind::CloseSquareBracket => squares.pop(),
            TokenKind::CloseCurlyBracket | TokenKind::CloseObject => curlies.pop(),
            _ => continue,
        };
        if let Some(opener) = opener {
            link_pair(tokens, opener, pos);
        }
    }
}

fn previous_significant(tokens: &[Token], before: usize) -> Option<usize> {
    (0..before).rev().find(|&i| !tokens[i].kind.is_empty())
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].kind.is_empty())
}

fn link_parenthesis_owners(tokens: &mut [Token]) {
    for pos in 0..tokens.len() {
        if tokens[pos].kind != TokenKind::OpenParenthesis {
            continue;
        }
        let Some(closer) = tokens[pos].bracket_closer else {
            continue;
        };
        let Some(prev) = previous_significant(tokens, pos) else {
            continue;
        };

        let owner = if PARENTHESIS_OWNERS.contains(&tokens[prev].kind) {
            Some(prev)
        } else if tokens[prev].kind == TokenKind::Identifier {
            previous_significant(tokens, prev).filter(|&p| tokens[p].kind == TokenKind::Function)
        } else {
            None
        };

        if let Some(owner) = owner {
            tokens[pos].parenthesis_owner = Some(owner);
            tokens[closer].parenthesis_owner = Some(owner);
            tokens[owner].parenthesis_opener = Some(pos);
            tokens[owner].parenthesis_closer = Some(closer);
        }
    }
}

fn nest_parentheses(tokens: &mut [Token]) {
    let mut open: Vec<usize> = Vec::new();
    for (pos, token) in tokens.iter_mut().enumerate() {
        if token.kind == TokenKind::CloseParenthesis
            && token.bracket_opener.is_some()
            && open.last() == token.bracket_opener.as_ref()
        {
            open.pop();
        }
        token.nested_parentheses.clone_from(&open);
        if token.kind == TokenKind::OpenParenthesis && token.bracket_closer.is_some() {
            open.push(pos);
        }
    }
}

fn find_braced(tokens: &[Token], keyword: usize) -> Option<(usize, usize)> {
    let mut next = next_significant(tokens, keyword + 1)?;
    if tokens[next].kind == TokenKind::OpenParenthesis {
        let closer = tokens[next].bracket_closer?;
        next = next_significant(tokens, closer + 1)?;
    }
    if tokens[next].kind == TokenKind::OpenCurlyBracket {
        return tokens[next].bracket_closer.map(|closer| (next, closer));
    }
    None
}

fn find_declaration(tokens: &[Token], keyword: usize) -> Option<(usize, usize)> {
    let mut pos = keyword + 1;
    while pos < tokens.len() {
        match tokens[pos].kind {
            TokenKind::OpenParenthesis | TokenKind::OpenSquareBracket => {
                pos = tokens[pos].bracket_closer? + 1;
                continue;
            }
            TokenKind::OpenCurlyBracket => {
                return tokens[pos].bracket_closer.map(|closer| (pos, closer));
            }
            TokenKind::Semicolon
            | TokenKind::CloseCurlyBracket
            | TokenKind::CloseParenthesis
            | TokenKind::CloseSquareBracket => return None,
            _ => pos += 1,
        }
    }
    None
}

fn find_case(tokens: &[Token], keyword: usize) -> Option<(usize, usize)> {
    let mut pos = keyword + 1;
    let opener = loop {
        let token = tokens.get(pos)?;
        match token.kind {
            TokenKind::Colon => break pos,
            kind if kind.is_opener() => pos = token.bracket_closer? + 1,
            TokenKind::Semicolon | TokenKind::CloseCurlyBracket => return None,
            _ => pos += 1,
        }
    };

    pos = opener + 1;
    while let Some(token) = tokens.get(pos) {
        match token.kind {
            TokenKind::Break
            | TokenKind::Return
            | TokenKind::Continue
            | TokenKind::Throw
            | TokenKind::Case
            | TokenKind::Default
            | TokenKind::CloseCurlyBracket => return Some((opener, pos)),
            kind if kind.is_opener() => pos = token.bracket_closer? + 1,
            _ => pos += 1,
        }
    }
    None
}

struct OpenScope {
    owner: usize,
    kind: TokenKind,
    closer: usize,
}

fn map_scopes(tokens: &mut [Token], rules: &ScopeRules) {
    let mut stack: Vec<OpenScope> = Vec::new();
    let mut pending: Vec<(usize, OpenScope)> = Vec::new();

    for pos in 0..tokens.len() {
        stack.retain(|scope| scope.closer > pos);
        tokens[pos].conditions = stack
            .iter()
            .map(|scope| Condition {
                owner: scope.owner,
                kind: scope.kind,
            })
            .collect();

        let kind = tokens[pos].kind;
        if let Some(mode) = rules.mode(kind) {
            let found = match mode {
                ScopeMode::Braced => find_braced(tokens, pos),
                ScopeMode::Declaration => find_declaration(tokens, pos),
                ScopeMode::CaseLabel => {
                    let in_switch = stack
                        .iter()
                        .rev()
                        .find(|s| !matches!(s.kind, TokenKind::Case | TokenKind::Default))
                        .is_some_and(|s| s.kind == TokenKind::Switch);
                    if in_switch {
                        find_case(tokens, pos)
                    } else {
                        None
                    }
                }
            };

            if let Some((opener, closer)) = found {
                tokens[pos].scope_condition = Some(pos);
                tokens[pos].scope_opener = Some(opener);
                tokens[pos].scope_closer = Some(closer);
                for at in [opener, closer] {
                    if tokens[at].scope_condition.is_none() {
                        tokens[at].scope_condition = Some(pos);
                        tokens[at].scope_opener = Some(opener);
                        tokens[at].scope_closer = Some(closer);
                    }
                }
                pending.push((
                    opener,
                    OpenScope {
                        owner: pos,
                        kind,
                        closer,
                    },
                ));
            }
        }

        let mut index = 0;
        while index < pending.len() {
            if pending[index].0 == pos {
                let (_, scope) = pending.remove(index);
                stack.push(scope);
            } else {
                index += 1;
            }
        }
    }
}
