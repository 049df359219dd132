//! Sniff for camel-caps variable names in the primary language.
//!
//! Built on the variable classifier, which routes every variable to one
//! of three callbacks:
//!
//! - member variables may carry one leading underscore
//! - local variables may not
//! - variables interpolated into strings are checked like locals
//!
//! `$this` and the superglobals are always accepted.

use codesniff_core::{
    SetupError, SniffContext, SniffError, TokenizerFamily, VariableHandler, VariableSniff,
};

/// Sniff code for valid-variable-name.
pub const CODE: &str = "Squiz.NamingConventions.ValidVariableName";

const RESERVED: [&str; 10] = [
    "this", "GLOBALS", "_SERVER", "_GET", "_POST", "_FILES", "_COOKIE", "_SESSION", "_REQUEST",
    "_ENV",
];

/// Builds the sniff.
///
/// # Errors
///
/// Propagates adapter validation.
pub fn sniff() -> Result<VariableSniff<ValidVariableName>, SetupError> {
    VariableSniff::new(ValidVariableName)
}

/// Naming checks for the three variable positions.
#[derive(Debug, Clone, Default)]
pub struct ValidVariableName;

/// A name made of ASCII letters and digits that starts lowercase.
fn is_camel_caps(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase()) && chars.all(|c| c.is_ascii_alphanumeric())
}

fn check(ctx: &mut SniffContext<'_>, pos: usize, name: &str, member: bool, code: &str) {
    if RESERVED.contains(&name) {
        return;
    }
    let bare = if member { name.strip_prefix('_').unwrap_or(name) } else { name };
    if is_camel_caps(bare) {
        return;
    }
    let message = if member {
        "Member variable \"%s\" is not in valid camel caps format"
    } else {
        "Variable \"%s\" is not in valid camel caps format"
    };
    ctx.add_error(pos, message, code, &[name]);
}

/// Names of the `$name` references in interpolating string text.
fn interpolated_names(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let escaped = i > 0 && bytes[i - 1] == b'\\';
        if bytes[i] == b'$' && !escaped {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            let starts_like_name = bytes.get(start).is_some_and(|b| !b.is_ascii_digit());
            if end > start && starts_like_name {
                names.push(&text[start..end]);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    names
}

impl VariableHandler for ValidVariableName {
    fn process_member_var(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let name = ctx.tokens()[pos].text.trim_start_matches('$');
        check(ctx, pos, name, true, "MemberNotCamelCaps");
        Ok(())
    }

    fn process_variable(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let name = ctx.tokens()[pos].text.trim_start_matches('$');
        check(ctx, pos, name, false, "NotCamelCaps");
        Ok(())
    }

    fn process_variable_in_string(&mut self, ctx: &mut SniffContext<'_>, pos: usize) -> Result<(), SniffError> {
        let text = ctx.tokens()[pos].text.as_str();
        for name in interpolated_names(text) {
            check(ctx, pos, name, false, "StringNotCamelCaps");
        }
        Ok(())
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php]
    }

    fn description(&self) -> &'static str {
        "Variable names must be in camel caps format"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{php, run};
    use codesniff_core::TokenKind::{
        Class, CloseCurlyBracket, CloseParenthesis, DoubleQuotedString, Equal, Function, Identifier,
        OpenCurlyBracket, OpenParenthesis, Semicolon, Var, Variable, Whitespace,
    };

    #[test]
    fn test_classifies_and_checks_each_position() {
        let file = php(&[
            (Class, "class"),
            (Whitespace, " "),
            (Identifier, "A"),
            (Whitespace, " "),
            (OpenCurlyBracket, "{"),
            (Var, "var"),
            (Whitespace, " "),
            (Variable, "$_cache_map"),
            (Semicolon, ";"),
            (Var, "var"),
            (Whitespace, " "),
            (Variable, "$_okMember"),
            (Semicolon, ";"),
            (Function, "function"),
            (Whitespace, " "),
            (Identifier, "f"),
            (OpenParenthesis, "("),
            (CloseParenthesis, ")"),
            (OpenCurlyBracket, "{"),
            (Variable, "$_local"),
            (Equal, "="),
            (Variable, "$this"),
            (Semicolon, ";"),
            (DoubleQuotedString, "\"$user_name and \\$not_a_var\""),
            (Semicolon, ";"),
            (CloseCurlyBracket, "}"),
            (CloseCurlyBracket, "}"),
        ]);
        let mut sniff = sniff().unwrap();
        let found: Vec<(String, String)> = run(&mut sniff, CODE, &file)
            .into_iter()
            .map(|v| (v.code, v.message))
            .collect();
        assert_eq!(
            found,
            vec![
                (
                    "Squiz.NamingConventions.ValidVariableName.MemberNotCamelCaps".to_string(),
                    "Member variable \"_cache_map\" is not in valid camel caps format".to_string()
                ),
                (
                    "Squiz.NamingConventions.ValidVariableName.NotCamelCaps".to_string(),
                    "Variable \"_local\" is not in valid camel caps format".to_string()
                ),
                (
                    "Squiz.NamingConventions.ValidVariableName.StringNotCamelCaps".to_string(),
                    "Variable \"user_name\" is not in valid camel caps format".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_interpolated_names() {
        assert_eq!(interpolated_names("\"$a {$bB} $1 \\$c $\""), vec!["a", "bB"]);
    }

    #[test]
    fn test_camel_caps() {
        assert!(is_camel_caps("userName2"));
        assert!(!is_camel_caps("UserName"));
        assert!(!is_camel_caps("user_name"));
        assert!(!is_camel_caps(""));
    }
}
