//! Sniff to forbid a comma after the last member of an object literal.

use codesniff_core::{Sniff, SniffContext, SniffError, TokenKind, TokenizerFamily};

/// Sniff code for object-member-comma.
pub const CODE: &str = "Squiz.Objects.ObjectMemberComma";

/// Reports a trailing comma before the closing brace of an object literal.
#[derive(Debug, Clone, Default)]
pub struct ObjectMemberComma;

impl ObjectMemberComma {
    /// Creates the sniff.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Sniff for ObjectMemberComma {
    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::CloseObject]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "The last member of an object literal must not be followed by a comma"
    }

    fn process(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let Some(prev) = pos.checked_sub(1).and_then(|p| ctx.file().previous_significant(p)) else {
            return Ok(());
        };
        if ctx.tokens()[prev].kind == TokenKind::Comma {
            ctx.add_error(
                prev,
                "Last member of object must not be followed by a comma",
                "Found",
                &[],
            );
        }
        Ok(())
    }
}
