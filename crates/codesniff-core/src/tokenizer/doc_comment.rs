//! Sub-lexer for documentation comments.
//!
//! Splits a `/** ... */` block into open, star, whitespace, tag, string and
//! close tokens. Texts concatenate back to the original comment.

use super::TokenizeError;
use crate::token::{Token, TokenKind};

/// Tokenizes one documentation comment.
///
/// `open_pos` is the stream position the opener will occupy; tag and
/// closer links are stored as absolute positions.
///
/// # Errors
///
/// Returns [`TokenizeError::Malformed`] if `comment` does not start with `/**`.
pub fn tokenize(comment: &str, open_pos: usize) -> Result<Vec<Token>, TokenizeError> {
    let Some(rest) = comment.strip_prefix("/**") else {
        return Err(TokenizeError::Malformed {
            line: 0,
            message: "documentation comment must start with /**".to_string(),
        });
    };
    let (body, terminated) = match rest.strip_suffix("*/") {
        Some(body) => (body, true),
        None => (rest, false),
    };

    let mut tokens = vec![Token::new(TokenKind::DocCommentOpen, "/**")];
    for (index, line) in body.split_inclusive('\n').enumerate() {
        lex_line(line, index == 0, &mut tokens);
    }
    if terminated {
        tokens.push(Token::new(TokenKind::DocCommentClose, "*/"));
    }

    let tags: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TokenKind::DocCommentTag)
        .map(|(i, _)| open_pos + i)
        .collect();
    let closer = terminated.then(|| open_pos + tokens.len() - 1);

    for token in &mut tokens {
        token.comment_opener = Some(open_pos);
    }
    tokens[0].comment_tags = tags;
    tokens[0].comment_closer = closer;
    Ok(tokens)
}

fn push(tokens: &mut Vec<Token>, kind: TokenKind, text: &str) {
    if !text.is_empty() {
        tokens.push(Token::new(kind, text));
    }
}

fn strip_blanks(text: &str) -> (&str, &str) {
    let rest = text.trim_start_matches([' ', '\t']);
    (&text[..text.len() - rest.len()], rest)
}

fn lex_line(line: &str, first: bool, tokens: &mut Vec<Token>) {
    let content = line.trim_end_matches(['\n', '\r']);
    let newline = &line[content.len()..];

    let (blank, mut rest) = strip_blanks(content);
    push(tokens, TokenKind::DocCommentWhitespace, blank);

    if !first && rest.starts_with('*') {
        let after = rest.trim_start_matches('*');
        push(tokens, TokenKind::DocCommentStar, &rest[..rest.len() - after.len()]);
        let (blank, after) = strip_blanks(after);
        push(tokens, TokenKind::DocCommentWhitespace, blank);
        rest = after;
    }

    let body = rest.trim_end_matches([' ', '\t']);
    let trailing = &rest[body.len()..];

    if let Some(name) = body.strip_prefix('@') {
        let name_len = name
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '\\')))
            .unwrap_or(name.len());
        let (tag, after) = body.split_at(name_len + 1);
        push(tokens, TokenKind::DocCommentTag, tag);
        let (blank, text) = strip_blanks(after);
        push(tokens, TokenKind::DocCommentWhitespace, blank);
        push(tokens, TokenKind::DocCommentString, text);
    } else {
        push(tokens, TokenKind::DocCommentString, body);
    }

    let tail = format!("{trailing}{newline}");
    push(tokens, TokenKind::DocCommentWhitespace, &tail);
}
