//! Token model shared by every tokenizer and rule.
//!
//! A file is represented as a flat `Vec<Token>`. Structural links between
//! tokens (matching brackets, scope openers and closers, enclosing
//! conditions) are stored as indices into that vector and are fixed once
//! tokenization finishes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum TokenKind {
    // Layout and comments.
    Whitespace,
    Comment,
    DocCommentOpen,
    DocCommentClose,
    DocCommentStar,
    DocCommentWhitespace,
    DocCommentTag,
    DocCommentString,

    // Names and literals.
    /// A bare identifier, or any fragment the lexer could not classify.
    Identifier,
    Number,
    /// A complete single- or double-quoted string without interpolation.
    StringLiteral,
    /// A double-quoted string carrying embedded variables.
    DoubleQuotedString,
    Heredoc,
    Regex,
    Variable,
    /// The name on the left of a colon inside an object literal.
    Property,
    /// The name on the left of a colon that labels a statement.
    Label,

    // Declarations.
    Class,
    Interface,
    Trait,
    Function,
    Closure,
    Abstract,
    Final,
    Static,
    Public,
    Protected,
    Private,
    Var,

    // Control flow.
    If,
    Else,
    ElseIf,
    For,
    Foreach,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Throw,
    Try,
    Catch,
    Finally,

    // Other keywords.
    New,
    Delete,
    In,
    Instanceof,
    Typeof,
    True,
    False,
    Null,
    This,
    Prototype,

    // Brackets.
    OpenParenthesis,
    CloseParenthesis,
    OpenSquareBracket,
    CloseSquareBracket,
    OpenCurlyBracket,
    CloseCurlyBracket,
    /// An opening brace that starts an object literal.
    Object,
    /// The closing brace of an object literal.
    CloseObject,

    // Punctuation.
    Semicolon,
    Comma,
    Colon,
    Period,
    InlineThen,
    InlineElse,

    // Comparison.
    IsEqual,
    IsNotEqual,
    IsIdentical,
    IsNotIdentical,
    LessThan,
    GreaterThan,
    IsSmallerOrEqual,
    IsGreaterOrEqual,

    // Arithmetic and assignment.
    Equal,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulus,
    Pow,
    Increment,
    Decrement,
    PlusEqual,
    MinusEqual,
    MulEqual,
    DivEqual,
    ModEqual,
    PowEqual,

    // Logical and bitwise.
    BooleanAnd,
    BooleanOr,
    BooleanNot,
    /// `??`
    Coalesce,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    ShiftLeft,
    ShiftRight,
    ZeroFillShiftRight,
    AndEqual,
    OrEqual,
    XorEqual,
    ShiftLeftEqual,
    ShiftRightEqual,
    ZeroFillShiftRightEqual,
    BooleanAndEqual,
    BooleanOrEqual,
    CoalesceEqual,
}

impl TokenKind {
    /// Whitespace and comments: tokens that carry no syntax.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::Whitespace || self.is_comment()
    }

    /// Plain and documentation comment tokens.
    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            Self::Comment
                | Self::DocCommentOpen
                | Self::DocCommentClose
                | Self::DocCommentStar
                | Self::DocCommentWhitespace
                | Self::DocCommentTag
                | Self::DocCommentString
        )
    }

    /// Assignment operators.
    #[must_use]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::PlusEqual
                | Self::MinusEqual
                | Self::MulEqual
                | Self::DivEqual
                | Self::ModEqual
                | Self::PowEqual
                | Self::AndEqual
                | Self::OrEqual
                | Self::XorEqual
                | Self::ShiftLeftEqual
                | Self::ShiftRightEqual
                | Self::ZeroFillShiftRightEqual
                | Self::BooleanAndEqual
                | Self::BooleanOrEqual
                | Self::CoalesceEqual
        )
    }

    /// Opening bracket kinds.
    #[must_use]
    pub fn is_opener(self) -> bool {
        matches!(
            self,
            Self::OpenParenthesis | Self::OpenSquareBracket | Self::OpenCurlyBracket | Self::Object
        )
    }

    /// Closing bracket kinds.
    #[must_use]
    pub fn is_closer(self) -> bool {
        matches!(
            self,
            Self::CloseParenthesis
                | Self::CloseSquareBracket
                | Self::CloseCurlyBracket
                | Self::CloseObject
        )
    }

    /// Identifier-like tokens accepted by the pattern word wildcard.
    #[must_use]
    pub fn is_word(self) -> bool {
        matches!(self, Self::Identifier | Self::Property | Self::Label)
    }

    /// Selectivity weight: how rarely this kind occurs in ordinary code.
    ///
    /// Pattern rules register on the literal with the highest weight so the
    /// dispatcher wakes them as seldom as possible.
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            Self::Class | Self::Interface | Self::Trait => 1000,
            Self::Function | Self::Closure => 100,
            Self::If
            | Self::Else
            | Self::ElseIf
            | Self::For
            | Self::Foreach
            | Self::While
            | Self::Do
            | Self::Switch
            | Self::Case
            | Self::Default
            | Self::Try
            | Self::Catch
            | Self::Finally => 50,
            Self::Return | Self::Throw | Self::Break | Self::Continue => 25,
            Self::BitwiseAnd | Self::BitwiseOr | Self::BitwiseXor => 8,
            Self::Multiply
            | Self::Divide
            | Self::Modulus
            | Self::Plus
            | Self::Minus
            | Self::ShiftLeft
            | Self::ShiftRight
            | Self::ZeroFillShiftRight
            | Self::BooleanAnd
            | Self::BooleanOr
            | Self::Pow
            | Self::Coalesce
            | Self::InlineThen
            | Self::InlineElse => 5,
            kind if kind.is_assignment() => 5,
            Self::OpenCurlyBracket
            | Self::CloseCurlyBracket
            | Self::Object
            | Self::CloseObject
            | Self::OpenSquareBracket
            | Self::CloseSquareBracket => 2,
            Self::OpenParenthesis | Self::CloseParenthesis => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One entry of a token's enclosing-construct stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Stream position of the token that owns the scope (for example the
    /// `function` keyword, or the brace of an object literal).
    pub owner: usize,
    /// Kind of the owning token.
    pub kind: TokenKind,
}

/// A lexical unit plus its structural links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token category.
    pub kind: TokenKind,
    /// Exact source text. Never spans more than one physical line.
    pub text: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed, tabs expanded to the configured width).
    pub column: usize,
    /// Byte offset of the first character in the file.
    pub offset: usize,
    /// Matching bracket for `(`, `[` and `{` style tokens.
    pub bracket_opener: Option<usize>,
    /// Matching bracket for `)`, `]` and `}` style tokens.
    pub bracket_closer: Option<usize>,
    /// Keyword owning a parenthesis pair (`if`, `function`, ...).
    pub parenthesis_owner: Option<usize>,
    /// Opening parenthesis, set on parentheses and on their owner.
    pub parenthesis_opener: Option<usize>,
    /// Closing parenthesis, set on parentheses and on their owner.
    pub parenthesis_closer: Option<usize>,
    /// Openers of every parenthesis pair enclosing this token, outermost first.
    pub nested_parentheses: Vec<usize>,
    /// Keyword that owns the scope this token opens or closes.
    pub scope_condition: Option<usize>,
    /// Scope opener, set on the condition, opener and closer.
    pub scope_opener: Option<usize>,
    /// Scope closer, set on the condition, opener and closer.
    pub scope_closer: Option<usize>,
    /// Enclosing constructs, outermost first.
    pub conditions: Vec<Condition>,
    /// Tag positions; only populated on [`TokenKind::DocCommentOpen`].
    pub comment_tags: Vec<usize>,
    /// Doc comment closer; only populated on [`TokenKind::DocCommentOpen`].
    pub comment_closer: Option<usize>,
    /// Doc comment opener; populated on every doc comment sub-token.
    pub comment_opener: Option<usize>,
}

impl Token {
    /// Creates an unlinked token. Position fields are filled in later.
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line: 0,
            column: 0,
            offset: 0,
            bracket_opener: None,
            bracket_closer: None,
            parenthesis_owner: None,
            parenthesis_opener: None,
            parenthesis_closer: None,
            nested_parentheses: Vec::new(),
            scope_condition: None,
            scope_opener: None,
            scope_closer: None,
            conditions: Vec::new(),
            comment_tags: Vec::new(),
            comment_closer: None,
            comment_opener: None,
        }
    }

    /// Nesting depth: the number of enclosing conditions.
    #[must_use]
    pub fn level(&self) -> usize {
        self.conditions.len()
    }

    /// Returns true if any enclosing condition has the given kind.
    #[must_use]
    pub fn has_condition(&self, kind: TokenKind) -> bool {
        self.conditions.iter().any(|c| c.kind == kind)
    }

    /// Returns the innermost enclosing condition of the given kind.
    #[must_use]
    pub fn innermost_condition(&self, kind: TokenKind) -> Option<usize> {
        self.conditions
            .iter()
            .rev()
            .find(|c| c.kind == kind)
            .map(|c| c.owner)
    }

    /// Returns true if the text contains a line break.
    #[must_use]
    pub fn ends_line(&self) -> bool {
        self.text.ends_with('\n') || self.text.ends_with('\r')
    }
}
