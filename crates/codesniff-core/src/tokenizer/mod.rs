//! Tokenizers: raw lexing plus structural annotation.
//!
//! ```text
//! source text
//!   ↓ Tokenizer::lex          (family-specific, lossless)
//! Vec<Token> (unlinked)
//!   ↓ structure::assign_positions / structure::annotate
//! Vec<Token> (brackets, scopes, conditions)
//!   ↓ Tokenizer::post_process (family-specific reclassification)
//! token stream
//! ```

pub mod doc_comment;
pub mod js;
pub mod structure;

pub use js::JsTokenizer;
pub use structure::{ScopeMode, ScopeRules};

use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language family a tokenizer handles and a sniff supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerFamily {
    /// The primary language. Its tokenizer is supplied by the host.
    Php,
    /// JavaScript.
    Js,
    /// Stylesheets.
    Css,
}

impl fmt::Display for TokenizerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Php => write!(f, "php"),
            Self::Js => write!(f, "js"),
            Self::Css => write!(f, "css"),
        }
    }
}

/// Errors raised while turning text into tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    /// No tokenizer is registered for the family.
    #[error("no tokenizer available for {family} files")]
    Unsupported {
        /// The requested family.
        family: TokenizerFamily,
    },

    /// The input does not have the shape the tokenizer expects.
    #[error("malformed input at line {line}: {message}")]
    Malformed {
        /// Line the problem was found on.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}

/// A language tokenizer.
pub trait Tokenizer: Send + Sync {
    /// The family this tokenizer handles.
    fn family(&self) -> TokenizerFamily;

    /// Splits `source` into unlinked tokens whose texts concatenate back
    /// to `source` exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be tokenized at all.
    fn lex(&self, source: &str) -> Result<Vec<Token>, TokenizeError>;

    /// Keywords that open scopes, and how their scopes are delimited.
    fn scope_rules(&self) -> ScopeRules;

    /// Reclassifies tokens once structural links exist.
    fn post_process(&self, _tokens: &mut [Token]) {}
}

/// Runs the full pipeline: lex, position, annotate, post-process.
///
/// # Errors
///
/// Propagates lexing failures.
pub fn tokenize(
    tokenizer: &dyn Tokenizer,
    source: &str,
    tab_width: usize,
) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = tokenizer.lex(source)?;
    structure::assign_positions(&mut tokens, tab_width);
    structure::annotate(&mut tokens, &tokenizer.scope_rules());
    tokenizer.post_process(&mut tokens);
    Ok(tokens)
}
