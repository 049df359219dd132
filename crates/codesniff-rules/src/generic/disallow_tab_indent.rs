//! Sniff to forbid tabs in indentation.
//!
//! # Rationale
//!
//! Tabs render at different widths in different editors, so code indented
//! with them lines up differently for every reader.
//!
//! Only the whitespace that starts a line is inspected; tabs used for
//! alignment later in a line are left alone.

use codesniff_core::{Sniff, SniffContext, SniffError, TokenKind, TokenizerFamily};

/// Sniff code for disallow-tab-indent.
pub const CODE: &str = "Generic.WhiteSpace.DisallowTabIndent";

/// Forbids tabs in the leading whitespace of a line.
#[derive(Debug, Clone, Default)]
pub struct DisallowTabIndent;

impl DisallowTabIndent {
    /// Creates the sniff.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sniff for DisallowTabIndent {
    fn register(&self) -> Vec<TokenKind> {
        vec![
            TokenKind::Whitespace,
            TokenKind::DocCommentWhitespace,
            TokenKind::Comment,
        ]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js, TokenizerFamily::Css]
    }

    fn description(&self) -> &'static str {
        "Lines must be indented with spaces, not tabs"
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let token = &ctx.tokens()[pos];
        if token.column != 1 {
            return Ok(());
        }
        let indent = leading_blanks(&token.text);
        if indent.contains('\t') {
            ctx.add_error(
                pos,
                "Spaces must be used to indent lines; tabs are not allowed",
                "TabsUsed",
                &[],
            );
        }
        Ok(())
    }
}

fn leading_blanks(text: &str) -> &str {
    let rest = text.trim_start_matches([' ', '\t']);
    &text[..text.len() - rest.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check_js;

    #[test]
    fn test_detects_tab_indent() {
        let violations = check_js(&mut DisallowTabIndent::new(), CODE, "if (a) {\n\tb();\n}\n");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "Generic.WhiteSpace.DisallowTabIndent.TabsUsed");
        assert_eq!(violations[0].location.line, 2);
    }

    #[test]
    fn test_allows_space_indent_and_inner_tabs() {
        let violations = check_js(&mut DisallowTabIndent::new(), CODE, "if (a) {\n    b =\t1;\n}\n");
        assert!(violations.is_empty());
    }

    #[test]
    fn test_checks_comment_lines() {
        let source = "/*\n\t * block\n */\n/**\n\t * doc\n */\nx();\n";
        let violations = check_js(&mut DisallowTabIndent::new(), CODE, source);
        let lines: Vec<usize> = violations.iter().map(|v| v.location.line).collect();
        assert_eq!(lines, vec![2, 5]);
    }
}
