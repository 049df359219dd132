//! Sniff to flag comments that refer to unfinished work.
//!
//! Matches `todo` as a whole word, in plain comments and in doc comments
//! (including an `@todo` tag). When text follows the marker it is quoted
//! in the message.

use codesniff_core::{SetupError, Sniff, SniffContext, SniffError, TokenKind, TokenizerFamily};
use regex::Regex;

/// Sniff code for todo.
pub const CODE: &str = "Generic.Commenting.Todo";

const MARKER: &str = r"(?i)(?:\A|[^\p{L}]+)todo(?:[^\p{L}]+(.*)|\z)";

/// Warns about `TODO` markers in comments.
#[derive(Debug, Clone)]
pub struct Todo {
    pattern: Regex,
}

impl Todo {
    /// Creates the sniff.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidPattern`] if the marker pattern does not
    /// compile.
    pub fn new() -> Result<Self, SetupError> {
        let pattern = Regex::new(MARKER).map_err(|e| SetupError::InvalidPattern {
            pattern: MARKER.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Returns the task text if `comment` mentions a todo.
    fn task<'t>(&self, comment: &'t str) -> Option<&'t str> {
        let captures = self.pattern.captures(comment)?;
        let rest = captures.get(1).map_or("", |m| m.as_str());
        Some(rest.trim_end().trim_end_matches("*/").trim())
    }
}

impl Sniff for Todo {
    fn register(&self) -> Vec<TokenKind> {
        vec![
            TokenKind::Comment,
            TokenKind::DocCommentTag,
            TokenKind::DocCommentString,
        ]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Comments should not contain TODO markers"
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let tokens = ctx.tokens();
        let token = &tokens[pos];

        let task = if token.kind == TokenKind::DocCommentTag {
            if !token.text.eq_ignore_ascii_case("@todo") {
                return Ok(());
            }
            // The task text is the string that follows the tag on its line.
            tokens[pos + 1..]
                .iter()
                .take_while(|t| t.line == token.line)
                .find(|t| t.kind == TokenKind::DocCommentString)
                .map_or("", |t| t.text.trim())
        } else {
            if token.kind == TokenKind::DocCommentString && previous_is_todo_tag(ctx, pos) {
                return Ok(());
            }
            match self.task(&token.text) {
                Some(task) => task,
                None => return Ok(()),
            }
        };

        if task.is_empty() {
            ctx.add_warning(pos, "Comment refers to a TODO task", "CommentFound", &[]);
        } else {
            ctx.add_warning(pos, "Comment refers to a TODO task \"%s\"", "TaskFound", &[task]);
        }
        Ok(())
    }
}

fn previous_is_todo_tag(ctx: &SniffContext<'_>, pos: usize) -> bool {
    let tokens = ctx.tokens();
    tokens[..pos]
        .iter()
        .rev()
        .find(|t| t.kind != TokenKind::DocCommentWhitespace)
        .is_some_and(|t| t.kind == TokenKind::DocCommentTag && t.text.eq_ignore_ascii_case("@todo"))
}
