//! # codesniff-core
//!
//! Core framework for coding-standard analysis over annotated token streams.
//!
//! This crate provides:
//!
//! - [`tokenizer`]: the JavaScript lexer, the doc-comment sub-lexer and the
//!   structural annotation shared by every tokenizer
//! - [`SourceFile`]: a tokenized file with its search API
//! - [`Sniff`] and [`BatchSniff`]: the rule plug-in contracts
//! - [`SniffRegistry`] and [`ruleset`]: rule-set expansion into active sniffs
//! - [`Engine`]: file selection, dispatch, batch pass and fault isolation
//! - [`ScopedSniff`] and [`VariableSniff`]: scope-aware dispatch
//! - [`pattern`]: template-based shape checks
//!
//! ## Example
//!
//! ```ignore
//! use codesniff_core::{Config, Engine};
//!
//! let mut engine = Engine::builder(Config::default())
//!     .registry(registry)
//!     .standard("Squiz")
//!     .build()?;
//!
//! let result = engine.process(&[PathBuf::from("src")], true)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod registry;
mod rule;
mod scope;
mod types;
mod variable;

/// File discovery and exclusion patterns.
pub mod discovery;
/// Tokenized files.
pub mod file;
/// Template-based shape checks.
pub mod pattern;
/// Rule-set descriptors and expansion.
pub mod ruleset;
/// The token model.
pub mod token;
/// Tokenizers.
pub mod tokenizer;

pub use config::{Config, ConfigError, Encoding};
pub use engine::{Engine, EngineBuilder, EngineError, ABORTED_PREFIX, INTERNAL_NAMESPACE};
pub use file::SourceFile;
pub use registry::{
    ActiveBatchSniff, ActiveSniff, NamingConvention, RegistryError, SniffCode, SniffFactory,
    SniffRegistry, SniffSet, Standard, NAMING_CONVENTIONS,
};
pub use rule::{
    fill_placeholders, BatchContext, BatchSniff, PropertyValue, ReportPolicy, SetupError, Sniff,
    SniffContext, SniffError, SniffInstance,
};
pub use scope::{ScopeHandler, ScopedSniff};
pub use token::{Condition, Token, TokenKind};
pub use tokenizer::{Tokenizer, TokenizerFamily};
pub use types::{
    FileReport, FileStatus, LintResult, Location, Severity, Violation, ViolationDiagnostic,
    DEFAULT_LEVEL,
};
pub use variable::{VariableClassifier, VariableHandler, VariableSniff};
