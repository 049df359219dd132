//! Rule-set descriptors and their expansion into an active sniff set.

mod descriptor;
mod resolver;

pub use descriptor::{RuleEntry, RulesetDescriptor};
pub use resolver::{resolve, ResolvedRuleset};

use crate::rule::PropertyValue;
use crate::types::Severity;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// An exclusion pattern as written in a descriptor or configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PatternSpec {
    /// Pattern text; `*` matches any run of characters.
    pub pattern: String,
    /// Match against the path relative to the processing base.
    pub relative: bool,
}

impl PatternSpec {
    /// An absolute pattern.
    #[must_use]
    pub fn absolute(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            relative: false,
        }
    }
}

/// Settings a rule-set attaches to a sniff code or message code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOverride {
    /// Severity level; 0 silences.
    pub severity: Option<u8>,
    /// Diagnostic type.
    pub kind: Option<Severity>,
    /// Replacement message template.
    pub message: Option<String>,
    /// Properties pushed into the sniff after construction.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Files the sniff must not run on.
    pub exclude_patterns: Vec<PatternSpec>,
}

impl RuleOverride {
    /// Layers `later` on top of `self`; set fields in `later` win.
    pub fn merge(&mut self, later: &Self) {
        if later.severity.is_some() {
            self.severity = later.severity;
        }
        if later.kind.is_some() {
            self.kind = later.kind;
        }
        if later.message.is_some() {
            self.message.clone_from(&later.message);
        }
        self.properties
            .extend(later.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        for pattern in &later.exclude_patterns {
            if !self.exclude_patterns.contains(pattern) {
                self.exclude_patterns.push(pattern.clone());
            }
        }
    }

    /// Returns true if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Errors raised while reading or expanding rule-sets. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    /// A descriptor file could not be read.
    #[error("Failed to read rule-set {path}: {source}")]
    Io {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A descriptor is not well-formed XML.
    #[error("Malformed rule-set {origin}: {message}")]
    Xml {
        /// Descriptor path or standard name.
        origin: String,
        /// Parser message.
        message: String,
    },

    /// A reference names nothing known.
    #[error("Referenced sniff, category or standard \"{reference}\" does not exist")]
    UnknownReference {
        /// The reference as written.
        reference: String,
    },

    /// Expansion re-entered a descriptor or standard it is already inside.
    #[error("Rule-set reference cycle: {}", chain.join(" -> "))]
    Cycle {
        /// Chain of references, ending with the repeated one.
        chain: Vec<String>,
    },

    /// An allow-list entry is not a three-part sniff code.
    #[error("\"{code}\" is not a valid sniff code (expected Standard.Category.Name)")]
    InvalidSniffCode {
        /// The offending entry.
        code: String,
    },

    /// A discovered sniff has no implementation under any naming convention.
    #[error(transparent)]
    Registry(#[from] crate::registry::RegistryError),
}
