//! Tokenizer for the script family.
//!
//! A single left-to-right scan with a word buffer. Strings, comments,
//! regular expressions and operators are recognised by look-ahead; anything
//! else accumulates into the buffer until a character class change flushes
//! it as a keyword, number or identifier.

use super::{doc_comment, ScopeRules, TokenizeError, Tokenizer, TokenizerFamily};
use crate::token::{Condition, Token, TokenKind};

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("function", TokenKind::Function),
    ("prototype", TokenKind::Prototype),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("return", TokenKind::Return),
    ("throw", TokenKind::Throw),
    ("break", TokenKind::Break),
    ("switch", TokenKind::Switch),
    ("continue", TokenKind::Continue),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("do", TokenKind::Do),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("var", TokenKind::Var),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("this", TokenKind::This),
    ("finally", TokenKind::Finally),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("new", TokenKind::New),
    ("delete", TokenKind::Delete),
    ("in", TokenKind::In),
    ("instanceof", TokenKind::Instanceof),
    ("typeof", TokenKind::Typeof),
];

const OPERATORS: &[(&str, TokenKind)] = &[
    ("(", TokenKind::OpenParenthesis),
    (")", TokenKind::CloseParenthesis),
    ("{", TokenKind::OpenCurlyBracket),
    ("}", TokenKind::CloseCurlyBracket),
    ("[", TokenKind::OpenSquareBracket),
    ("]", TokenKind::CloseSquareBracket),
    ("?", TokenKind::InlineThen),
    (".", TokenKind::Period),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Multiply),
    ("%", TokenKind::Modulus),
    ("/", TokenKind::Divide),
    ("^", TokenKind::BitwiseXor),
    ("~", TokenKind::BitwiseNot),
    ("&", TokenKind::BitwiseAnd),
    ("|", TokenKind::BitwiseOr),
    ("<", TokenKind::LessThan),
    (">", TokenKind::GreaterThan),
    ("<<", TokenKind::ShiftLeft),
    (">>", TokenKind::ShiftRight),
    (">>>", TokenKind::ZeroFillShiftRight),
    ("<=", TokenKind::IsSmallerOrEqual),
    (">=", TokenKind::IsGreaterOrEqual),
    ("==", TokenKind::IsEqual),
    ("!=", TokenKind::IsNotEqual),
    ("===", TokenKind::IsIdentical),
    ("!==", TokenKind::IsNotIdentical),
    ("!", TokenKind::BooleanNot),
    ("&&", TokenKind::BooleanAnd),
    ("||", TokenKind::BooleanOr),
    ("=", TokenKind::Equal),
    ("+=", TokenKind::PlusEqual),
    ("-=", TokenKind::MinusEqual),
    ("*=", TokenKind::MulEqual),
    ("/=", TokenKind::DivEqual),
    ("%=", TokenKind::ModEqual),
    ("**", TokenKind::Pow),
    ("**=", TokenKind::PowEqual),
    ("??", TokenKind::Coalesce),
    ("&&=", TokenKind::BooleanAndEqual),
    ("||=", TokenKind::BooleanOrEqual),
    ("??=", TokenKind::CoalesceEqual),
    ("&=", TokenKind::AndEqual),
    ("|=", TokenKind::OrEqual),
    ("^=", TokenKind::XorEqual),
    ("<<=", TokenKind::ShiftLeftEqual),
    (">>=", TokenKind::ShiftRightEqual),
    (">>>=", TokenKind::ZeroFillShiftRightEqual),
    ("++", TokenKind::Increment),
    ("--", TokenKind::Decrement),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
];

const MAX_OPERATOR_LEN: usize = 4;

/// Kinds after which a `/` starts a regular expression rather than a
/// division. Every assignment operator qualifies as well.
const REGEX_PRECEDERS: &[TokenKind] = &[
    TokenKind::OpenParenthesis,
    TokenKind::OpenSquareBracket,
    TokenKind::Return,
    TokenKind::Typeof,
    TokenKind::BooleanAnd,
    TokenKind::BooleanOr,
    TokenKind::BooleanNot,
    TokenKind::Coalesce,
    TokenKind::BitwiseAnd,
    TokenKind::BitwiseOr,
    TokenKind::IsEqual,
    TokenKind::IsNotEqual,
    TokenKind::IsIdentical,
    TokenKind::IsNotIdentical,
    TokenKind::Comma,
    TokenKind::Colon,
    TokenKind::InlineThen,
];

/// Flags that may follow a regular expression literal.
const REGEX_FLAGS: &[char] = &['d', 'g', 'i', 'm', 's', 'u', 'v', 'y'];

/// Tokenizer for `.js` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsTokenizer;

impl JsTokenizer {
    /// Creates the tokenizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for JsTokenizer {
    fn family(&self) -> TokenizerFamily {
        TokenizerFamily::Js
    }

    fn lex(&self, source: &str) -> Result<Vec<Token>, TokenizeError> {
        Lexer::new(source).run()
    }

    fn scope_rules(&self) -> ScopeRules {
        ScopeRules::javascript()
    }

    fn post_process(&self, tokens: &mut [Token]) {
        classify_closures(tokens);
        classify_object_literals(tokens);
        classify_colons(tokens);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    word: String,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            word: String::new(),
            tokens: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn emit(&mut self, kind: TokenKind, text: String) {
        self.tokens.push(Token::new(kind, text));
    }

    fn run(mut self) -> Result<Vec<Token>, TokenizeError> {
        while let Some(c) = self.peek(0) {
            if is_word_char(c) || self.continues_number(c) {
                self.word.push(c);
                self.pos += 1;
                continue;
            }
            self.flush_word();

            match c {
                '\'' | '"' => self.string(c),
                c if c.is_whitespace() => self.whitespace(),
                '/' if self.peek(1) == Some('/') => self.line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment()?,
                '/' if self.regex_allowed() && self.regex() => {}
                _ => self.operator(),
            }
        }
        self.flush_word();
        Ok(self.tokens)
    }

    fn continues_number(&self, c: char) -> bool {
        c == '.'
            && !self.word.is_empty()
            && self.word.chars().all(|d| d.is_ascii_digit())
            && self.peek(1).is_some_and(|d| d.is_ascii_digit())
    }

    fn flush_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = std::mem::take(&mut self.word);
        let kind = if word.starts_with(|c: char| c.is_ascii_digit()) {
            TokenKind::Number
        } else {
            KEYWORDS
                .iter()
                .find(|(keyword, _)| *keyword == word)
                .map_or(TokenKind::Identifier, |(_, kind)| *kind)
        };
        self.emit(kind, word);
    }

    fn backslashes_before(&self, index: usize, floor: usize) -> usize {
        (floor..index)
            .rev()
            .take_while(|&i| self.chars[i] == '\\')
            .count()
    }

    fn string(&mut self, quote: char) {
        let start = self.pos;
        let mut i = start + 1;
        while let Some(&ch) = self.chars.get(i) {
            if ch == '\n' || ch == '\r' {
                break;
            }
            if ch == quote && self.backslashes_before(i, start + 1) % 2 == 0 {
                let text = self.text(start, i + 1);
                self.emit(TokenKind::StringLiteral, text);
                self.pos = i + 1;
                return;
            }
            i += 1;
        }
        // Unterminated on this line: the quote stands alone.
        self.emit(TokenKind::Identifier, quote.to_string());
        self.pos = start + 1;
    }

    fn whitespace(&mut self) {
        let start = self.pos;
        while let Some(ch) = self.peek(0) {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += 1;
            if ch == '\n' {
                break;
            }
            if ch == '\r' {
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
                break;
            }
        }
        let text = self.text(start, self.pos);
        self.emit(TokenKind::Whitespace, text);
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        while let Some(ch) = self.peek(0) {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.pos += 1;
        }
        let text = self.text(start, self.pos);
        self.emit(TokenKind::Comment, text);
    }

    fn block_comment(&mut self) -> Result<(), TokenizeError> {
        let start = self.pos;
        // `/**/` reads as both openers; the plain comment wins.
        let doc = self.peek(2) == Some('*') && self.peek(3) != Some('/');
        let search_from = start + if doc { 3 } else { 2 };

        let mut end = self.chars.len();
        let mut i = search_from;
        while i + 1 < self.chars.len() {
            if self.chars[i] == '*' && self.chars[i + 1] == '/' {
                end = i + 2;
                break;
            }
            i += 1;
        }
        let text = self.text(start, end);
        self.pos = end;

        if doc {
            let open_pos = self.tokens.len();
            let tokens = doc_comment::tokenize(&text, open_pos)?;
            self.tokens.extend(tokens);
        } else {
            for line in text.split_inclusive('\n') {
                self.emit(TokenKind::Comment, line.to_string());
            }
        }
        Ok(())
    }

    fn regex_allowed(&self) -> bool {
        self.tokens
            .iter()
            .rev()
            .find(|t| !t.kind.is_empty())
            .is_some_and(|t| t.kind.is_assignment() || REGEX_PRECEDERS.contains(&t.kind))
    }

    fn regex(&mut self) -> bool {
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match self.chars.get(i) {
                None | Some('\n' | '\r') => return false,
                Some('/') if self.backslashes_before(i, start + 1) % 2 == 0 => break,
                Some(_) => i += 1,
            }
        }
        let mut end = i + 1;
        while self
            .chars
            .get(end)
            .is_some_and(|c| REGEX_FLAGS.contains(c) && !self.chars[i + 1..end].contains(c))
        {
            end += 1;
        }
        let text = self.text(start, end);
        self.emit(TokenKind::Regex, text);
        self.pos = end;
        true
    }

    fn operator(&mut self) {
        let remaining = self.chars.len() - self.pos;
        for len in (1..=MAX_OPERATOR_LEN.min(remaining)).rev() {
            let candidate = self.text(self.pos, self.pos + len);
            if let Some((_, kind)) = OPERATORS.iter().find(|(op, _)| *op == candidate) {
                self.emit(*kind, candidate);
                self.pos += len;
                return;
            }
        }
        let text = self.text(self.pos, self.pos + 1);
        self.emit(TokenKind::Identifier, text);
        self.pos += 1;
    }
}

fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].kind.is_empty())
}

fn previous_significant(tokens: &[Token], before: usize) -> Option<usize> {
    (0..before).rev().find(|&i| !tokens[i].kind.is_empty())
}

/// `function (` is an anonymous function.
fn classify_closures(tokens: &mut [Token]) {
    for pos in 0..tokens.len() {
        if tokens[pos].kind != TokenKind::Function {
            continue;
        }
        let anonymous = next_significant(tokens, pos + 1)
            .is_some_and(|next| tokens[next].kind == TokenKind::OpenParenthesis);
        if !anonymous {
            continue;
        }
        tokens[pos].kind = TokenKind::Closure;
        for token in tokens.iter_mut() {
            for condition in &mut token.conditions {
                if condition.owner == pos {
                    condition.kind = TokenKind::Closure;
                }
            }
        }
    }
}

/// A `name:` label directly before `pos`.
fn follows_label(tokens: &[Token], pos: usize) -> bool {
    let Some(colon) = previous_significant(tokens, pos) else {
        return false;
    };
    if tokens[colon].kind != TokenKind::Colon || is_ternary_else(tokens, colon) {
        return false;
    }
    let Some(name) = previous_significant(tokens, colon) else {
        return false;
    };
    if tokens[name].kind != TokenKind::Identifier {
        return false;
    }
    // An object property value is `{a: {...}}`, not a labelled block.
    match previous_significant(tokens, name) {
        None => true,
        Some(before) => match tokens[before].kind {
            TokenKind::Semicolon | TokenKind::OpenCurlyBracket | TokenKind::CloseCurlyBracket => true,
            TokenKind::CloseParenthesis => tokens[before].parenthesis_owner.is_some(),
            _ => false,
        },
    }
}

/// A brace that no keyword owns starts an object literal, unless it is the
/// block of a statement label.
fn classify_object_literals(tokens: &mut [Token]) {
    for pos in 0..tokens.len() {
        if tokens[pos].kind != TokenKind::OpenCurlyBracket || tokens[pos].scope_condition.is_some() {
            continue;
        }
        if follows_label(tokens, pos) {
            continue;
        }
        let Some(closer) = tokens[pos].bracket_closer else {
            continue;
        };
        tokens[pos].kind = TokenKind::Object;
        tokens[closer].kind = TokenKind::CloseObject;
        for at in [pos, closer] {
            tokens[at].scope_condition = Some(pos);
            tokens[at].scope_opener = Some(pos);
            tokens[at].scope_closer = Some(closer);
        }
        for token in &mut tokens[pos + 1..closer] {
            let index = token.conditions.partition_point(|c| c.owner < pos);
            token.conditions.insert(
                index,
                Condition {
                    owner: pos,
                    kind: TokenKind::Object,
                },
            );
        }
    }
}

fn is_ternary_else(tokens: &[Token], colon: usize) -> bool {
    let mut pos = colon;
    while pos > 0 {
        pos -= 1;
        let token = &tokens[pos];
        match token.kind {
            TokenKind::InlineThen => return true,
            TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::OpenCurlyBracket
            | TokenKind::Object
            | TokenKind::CloseCurlyBracket
            | TokenKind::OpenParenthesis
            | TokenKind::OpenSquareBracket => return false,
            TokenKind::CloseParenthesis | TokenKind::CloseSquareBracket | TokenKind::CloseObject => {
                match token.bracket_opener {
                    Some(opener) => pos = opener,
                    None => return false,
                }
            }
            _ => {}
        }
    }
    false
}

/// Colons become ternary elses, object properties or statement labels.
fn classify_colons(tokens: &mut [Token]) {
    for pos in 0..tokens.len() {
        if tokens[pos].kind != TokenKind::Colon || tokens[pos].scope_condition.is_some() {
            continue;
        }
        if is_ternary_else(tokens, pos) {
            tokens[pos].kind = TokenKind::InlineElse;
            continue;
        }
        let Some(name) = previous_significant(tokens, pos) else {
            continue;
        };
        if !matches!(tokens[name].kind, TokenKind::Identifier | TokenKind::StringLiteral) {
            continue;
        }
        let in_object = tokens[pos]
            .conditions
            .last()
            .is_some_and(|c| c.kind == TokenKind::Object);
        tokens[name].kind = if in_object {
            TokenKind::Property
        } else {
            TokenKind::Label
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use TokenKind::*;

    fn significant(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(&JsTokenizer::new(), source, 4)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        significant(source).into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn division_between_numbers() {
        assert_eq!(kinds("6/2"), vec![Number, Divide, Number]);
    }

    #[test]
    fn regex_after_assignment() {
        let tokens = significant("x = /ab\\/c/gi;");
        assert_eq!(tokens[2], (Regex, "/ab\\/c/gi".to_string()));
        assert_eq!(tokens[3].0, Semicolon);
    }

    #[test]
    fn regex_after_every_assignment() {
        for op in [
            "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
            "||=", "??=",
        ] {
            let tokens = significant(&format!("x {op} /re/g;"));
            assert_eq!(tokens[1].1, op, "operator {op}");
            assert!(tokens[1].0.is_assignment(), "operator {op}");
            assert_eq!(tokens[2], (Regex, "/re/g".to_string()), "after {op}");
        }
    }

    #[test]
    fn regex_flags_are_known_and_unique() {
        let tokens = significant("x = /a/zz;");
        assert_eq!(tokens[2], (Regex, "/a/".to_string()));
        assert_eq!(tokens[3], (Identifier, "zz".to_string()));

        let tokens = significant("x = /a/gig;");
        assert_eq!(tokens[2], (Regex, "/a/gi".to_string()));
    }

    #[test]
    fn regex_without_closing_slash_is_division() {
        assert_eq!(kinds("x = /a\nb"), vec![Identifier, Equal, Divide, Identifier, Identifier]);
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(kinds("a >>>= b !== c"), vec![Identifier, ZeroFillShiftRightEqual, Identifier, IsNotIdentical, Identifier]);
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        let tokens = significant(r#"'it\'s' "a\\" 'b'"#);
        assert_eq!(tokens[0], (StringLiteral, r"'it\'s'".to_string()));
        assert_eq!(tokens[1], (StringLiteral, r#""a\\""#.to_string()));
        assert_eq!(tokens[2], (StringLiteral, "'b'".to_string()));
    }

    #[test]
    fn unterminated_string_emits_bare_quote() {
        let tokens = significant("'abc\nd");
        assert_eq!(tokens[0], (Identifier, "'".to_string()));
        assert_eq!(tokens[1], (Identifier, "abc".to_string()));
    }

    #[test]
    fn decimal_numbers_stay_whole() {
        assert_eq!(significant("1.5")[0], (Number, "1.5".to_string()));
        assert_eq!(kinds("a.b"), vec![Identifier, Period, Identifier]);
    }

    #[test]
    fn empty_block_comment_is_plain() {
        assert_eq!(kinds("/**/ a"), vec![Comment, Identifier]);
        assert_eq!(kinds("/** doc */")[0], DocCommentOpen);
    }

    #[test]
    fn block_comments_split_per_line() {
        let tokens = tokenize(&JsTokenizer::new(), "/* a\n b */", 4).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn anonymous_functions_become_closures() {
        let tokens = tokenize(&JsTokenizer::new(), "var f = function () { a; };", 4).unwrap();
        let inner = tokens.iter().find(|t| t.text == "a").unwrap();
        assert_eq!(inner.conditions[0].kind, Closure);
        assert!(tokens.iter().any(|t| t.kind == Closure));
    }

    #[test]
    fn object_literal_properties() {
        let tokens = significant("var o = {a: 1, 'b': x ? 2 : 3};");
        assert_eq!(tokens[3].0, Object);
        assert_eq!(tokens[4], (Property, "a".to_string()));
        assert_eq!(tokens[8], (Property, "'b'".to_string()));
        assert!(tokens.iter().any(|(k, _)| *k == InlineElse));
        assert_eq!(tokens[15].0, CloseObject);
    }

    #[test]
    fn labels_outside_objects() {
        let tokens = significant("outer: for (;;) { break outer; }");
        assert_eq!(tokens[0], (Label, "outer".to_string()));
    }

    #[test]
    fn labelled_blocks_are_not_objects() {
        let tokens = significant("outer: {\n    break outer;\n}\nvar o = {a: {b: 1}};");
        assert_eq!(tokens[0], (Label, "outer".to_string()));
        assert_eq!(tokens[2].0, OpenCurlyBracket);
        assert!(!tokens.iter().take(7).any(|(k, _)| *k == Object || *k == CloseObject));

        let objects = tokens.iter().filter(|(k, _)| *k == Object).count();
        assert_eq!(objects, 2);
        assert!(tokens.iter().any(|(k, t)| *k == Property && t == "b"));
    }

    #[test]
    fn case_colons_are_scope_openers() {
        let tokens = tokenize(&JsTokenizer::new(), "switch (a) { case b: c(); break; }", 4).unwrap();
        let colon = tokens.iter().position(|t| t.text == ":").unwrap();
        assert_eq!(tokens[colon].kind, Colon);
        let b = tokens.iter().position(|t| t.text == "b").unwrap();
        assert_eq!(tokens[b].kind, Identifier);
    }

    #[test]
    fn lexing_is_lossless() {
        let source = "function a(b) {\r\n\treturn /x/.test(b) ? 'y' : \"z\";\n}\n/** @param b */\n";
        let tokens = tokenize(&JsTokenizer::new(), source, 4).unwrap();
        let joined: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, source);
    }
}
