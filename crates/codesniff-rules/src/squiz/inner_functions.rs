//! Sniff to forbid named functions declared inside other functions.
//!
//! Built on the scope adapter: it listens for names and is only woken for
//! names that sit inside a function. A closure between the two functions
//! makes the inner declaration legitimate.

use codesniff_core::{
    ScopeHandler, ScopedSniff, SetupError, SniffContext, SniffError, TokenKind, TokenizerFamily,
};

/// Sniff code for inner-functions.
pub const CODE: &str = "Squiz.Functions.InnerFunctions";

/// Builds the sniff.
///
/// # Errors
///
/// Never fails for the fixed kind sets; the adapter validates them anyway.
pub fn sniff() -> Result<ScopedSniff<InnerFunctions>, SetupError> {
    ScopedSniff::new(
        &[TokenKind::Function],
        &[TokenKind::Identifier],
        false,
        InnerFunctions,
    )
}

/// Reports declarations nested in a function body.
#[derive(Debug, Clone, Default)]
pub struct InnerFunctions;

impl ScopeHandler for InnerFunctions {
    fn process_within_scope(
        &mut self,
        ctx: &mut SniffContext<'_>,
        pos: usize,
        scope: usize,
    ) -> Result<(), SniffError> {
        let tokens = ctx.tokens();
        let token = &tokens[pos];

        let Some(keyword) = ctx.file().previous_significant(pos.saturating_sub(1)) else {
            return Ok(());
        };
        if keyword == pos || tokens[keyword].kind != TokenKind::Function {
            return Ok(());
        }
        // Woken once per enclosing function; only the innermost one counts.
        if token.innermost_condition(TokenKind::Function) != Some(scope) {
            return Ok(());
        }
        let inside_closure = token
            .conditions
            .iter()
            .skip_while(|c| c.owner != scope)
            .any(|c| c.kind == TokenKind::Closure);
        if inside_closure {
            return Ok(());
        }

        ctx.add_error(keyword, "The use of inner functions is forbidden", "NotAllowed", &[]);
        Ok(())
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Named functions must not be declared inside other functions"
    }
}
