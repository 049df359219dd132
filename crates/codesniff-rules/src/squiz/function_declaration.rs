//! Pattern sniff: `function name(` with one space after the keyword and
//! none before the parenthesis.

use codesniff_core::pattern::PatternRule;
use codesniff_core::TokenizerFamily;

/// Sniff code for function-declaration.
pub const CODE: &str = "Squiz.Functions.FunctionDeclaration";

/// Named function declaration template.
#[derive(Debug, Clone, Default)]
pub struct FunctionDeclaration;

impl FunctionDeclaration {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PatternRule for FunctionDeclaration {
    fn patterns(&self) -> Vec<String> {
        vec!["function abc(...)".to_string()]
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Function declarations must follow the standard layout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::check_js;
    use codesniff_core::pattern::PatternSniff;
    use codesniff_core::tokenizer::JsTokenizer;

    fn messages(source: &str) -> Vec<String> {
        let mut sniff = PatternSniff::new(FunctionDeclaration::new(), &JsTokenizer::new()).unwrap();
        check_js(&mut sniff, CODE, source)
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_accepts_standard_declaration() {
        assert!(messages("function load(a, b) {\n}\n").is_empty());
    }

    #[test]
    fn test_reports_space_before_parenthesis() {
        assert_eq!(
            messages("function load (a) {\n}\n"),
            vec!["Expected \"function abc(...)\"; found \"function abc (...)\""]
        );
    }

    #[test]
    fn test_ignores_anonymous_functions() {
        assert!(messages("var f = function (a) {\n};\n").is_empty());
    }
}
