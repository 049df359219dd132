//! Pattern sniff for the layout of control-structure signatures.
//!
//! One space between keyword and condition, one space before the opening
//! brace, and the brace last on its line. `else`, `catch` and the `while`
//! of a `do` loop sit on the line of the preceding closing brace.

use codesniff_core::pattern::PatternRule;
use codesniff_core::{PropertyValue, SniffError, TokenizerFamily};

/// Sniff code for control-signature.
pub const CODE: &str = "Squiz.ControlStructures.ControlSignature";

const TEMPLATES: [&str; 11] = [
    "do {EOL",
    "} while (...);EOL",
    "while (...) {EOL",
    "for (...) {EOL",
    "if (...) {EOL",
    "} else if (...) {EOL",
    "} else {EOL",
    "switch (...) {EOL",
    "try {EOL",
    "} catch (...) {EOL",
    "} finally {EOL",
];

/// Control-structure signature templates.
#[derive(Debug, Clone, Default)]
pub struct ControlSignature {
    ignore_comments: bool,
}

impl ControlSignature {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatternRule for ControlSignature {
    fn patterns(&self) -> Vec<String> {
        TEMPLATES.iter().map(ToString::to_string).collect()
    }

    fn ignore_comments(&self) -> bool {
        self.ignore_comments
    }

    fn supported_families(&self) -> &'static [TokenizerFamily] {
        &[TokenizerFamily::Php, TokenizerFamily::Js]
    }

    fn description(&self) -> &'static str {
        "Control structures must follow the standard signature layout"
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Result<(), SniffError> {
        match name {
            "ignoreComments" => {
                self.ignore_comments = value.as_bool().ok_or_else(|| SniffError::InvalidProperty {
                    name: name.to_string(),
                    message: format!("expected true or false, got '{value}'"),
                })?;
                Ok(())
            }
            _ => Err(SniffError::UnknownProperty {
                name: name.to_string(),
            }),
        }
    }
}
