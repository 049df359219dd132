//! Sniff registry: maps codes to factories and instantiates active sets.
//!
//! Implementations are registered under a type name. Resolving a code
//! `Std.Cat.Name` tries each naming convention in [`NAMING_CONVENTIONS`]
//! order and takes the first type name that is registered.

use crate::rule::{BatchSniff, SetupError, Sniff, SniffInstance};
use crate::ruleset::{PatternSpec, ResolvedRuleset};
use crate::token::TokenKind;
use crate::tokenizer::TokenizerFamily;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Builds a fresh sniff instance.
pub type SniffFactory = Box<dyn Fn() -> Result<SniffInstance, SetupError> + Send + Sync>;

/// Type-name conventions tried in order when resolving a code.
pub const NAMING_CONVENTIONS: &[NamingConvention] = &[
    NamingConvention::Module,
    NamingConvention::SniffsModule,
    NamingConvention::Legacy,
];

/// One way of turning a sniff code into an implementation type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    /// `Std::Cat::NameSniff`
    Module,
    /// `Std::sniffs::Cat::NameSniff`
    SniffsModule,
    /// `Std_Sniffs_Cat_NameSniff`
    Legacy,
}

impl NamingConvention {
    /// Type name for a code under this convention.
    #[must_use]
    pub fn type_name(self, code: &SniffCode) -> String {
        let SniffCode {
            standard,
            category,
            name,
        } = code;
        match self {
            Self::Module => format!("{standard}::{category}::{name}Sniff"),
            Self::SniffsModule => format!("{standard}::sniffs::{category}::{name}Sniff"),
            Self::Legacy => format!("{standard}_Sniffs_{category}_{name}Sniff"),
        }
    }
}

/// A validated three-part sniff code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SniffCode {
    /// Standard name.
    pub standard: String,
    /// Category name.
    pub category: String,
    /// Sniff name.
    pub name: String,
}

impl SniffCode {
    /// Parses `Std.Cat.Name`.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        let mut parts = code.split('.');
        let (Some(standard), Some(category), Some(name), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if [standard, category, name].iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self {
            standard: standard.to_string(),
            category: category.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SniffCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.standard, self.category, self.name)
    }
}

/// Where a standard's rule-set comes from.
#[derive(Debug, Clone)]
pub struct Standard {
    /// Standard name (first code segment).
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Embedded descriptor XML that pulls in rules from other standards.
    pub ruleset: Option<&'static str>,
    /// Directory of an installed external standard.
    pub directory: Option<PathBuf>,
}

impl Standard {
    /// A built-in standard.
    #[must_use]
    pub fn builtin(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ruleset: None,
            directory: None,
        }
    }

    /// Attaches an embedded descriptor.
    #[must_use]
    pub fn with_ruleset(mut self, xml: &'static str) -> Self {
        self.ruleset = Some(xml);
        self
    }
}

/// Errors raised by the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No implementation exists under any naming convention.
    #[error("Sniff \"{code}\" has no implementation (tried {})", tried.join(", "))]
    NotFound {
        /// The requested code.
        code: String,
        /// Type names that were tried.
        tried: Vec<String>,
    },

    /// A code does not have three parts.
    #[error("\"{code}\" is not a valid sniff code")]
    InvalidCode {
        /// The offending code.
        code: String,
    },

    /// A sniff could not be constructed or listens for nothing.
    #[error("Sniff \"{code}\" failed to set up: {source}")]
    Setup {
        /// The sniff code.
        code: String,
        /// What went wrong.
        source: SetupError,
    },
}

/// Known sniff implementations and standards.
#[derive(Default)]
pub struct SniffRegistry {
    factories: HashMap<String, SniffFactory>,
    codes: BTreeSet<String>,
    standards: BTreeMap<String, Standard>,
}

impl fmt::Debug for SniffRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SniffRegistry")
            .field("codes", &self.codes)
            .field("standards", &self.standards.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SniffRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a standard.
    pub fn add_standard(&mut self, standard: Standard) {
        self.standards.insert(standard.name.clone(), standard);
    }

    /// Registers an implementation for `code` under the first naming
    /// convention.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidCode`] for a malformed code.
    pub fn register<F>(&mut self, code: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<SniffInstance, SetupError> + Send + Sync + 'static,
    {
        let parsed = SniffCode::parse(code).ok_or_else(|| RegistryError::InvalidCode {
            code: code.to_string(),
        })?;
        self.factories
            .insert(NAMING_CONVENTIONS[0].type_name(&parsed), Box::new(factory));
        self.codes.insert(code.to_string());
        Ok(())
    }

    /// Registers an implementation under an explicit type name. Used for
    /// sniffs of external standards, which are found by directory scan.
    pub fn register_type<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<SniffInstance, SetupError> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Finds the factory for a code.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] listing every tried type name.
    pub fn resolve(&self, code: &str) -> Result<&SniffFactory, RegistryError> {
        let parsed = SniffCode::parse(code).ok_or_else(|| RegistryError::InvalidCode {
            code: code.to_string(),
        })?;
        let mut tried = Vec::new();
        for convention in NAMING_CONVENTIONS {
            let type_name = convention.type_name(&parsed);
            if let Some(factory) = self.factories.get(&type_name) {
                return Ok(factory);
            }
            tried.push(type_name);
        }
        Err(RegistryError::NotFound {
            code: code.to_string(),
            tried,
        })
    }

    /// Builds a fresh instance for a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown or construction fails.
    pub fn instantiate(&self, code: &str) -> Result<SniffInstance, RegistryError> {
        let factory = self.resolve(code)?;
        factory().map_err(|source| RegistryError::Setup {
            code: code.to_string(),
            source,
        })
    }

    /// Returns true if a code resolves.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.resolve(code).is_ok()
    }

    /// A standard by name.
    #[must_use]
    pub fn standard(&self, name: &str) -> Option<&Standard> {
        self.standards.get(name)
    }

    /// Every standard, sorted by name.
    pub fn standards(&self) -> impl Iterator<Item = &Standard> {
        self.standards.values()
    }

    /// Registered codes belonging to a standard, sorted.
    #[must_use]
    pub fn codes_in_standard(&self, standard: &str) -> Vec<String> {
        let prefix = format!("{standard}.");
        self.codes
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Instantiates every sniff of a resolved rule-set.
    ///
    /// # Errors
    ///
    /// Any construction failure or empty listen set is fatal.
    pub fn instantiate_ruleset(&self, ruleset: &ResolvedRuleset) -> Result<SniffSet, RegistryError> {
        let mut set = SniffSet::default();

        for code in &ruleset.sniffs {
            let mut instance = self.instantiate(code)?;
            let settings = ruleset.overrides.get(code);

            if let Some(settings) = settings {
                for (name, value) in &settings.properties {
                    if let Err(e) = instance.set_property(name, value) {
                        warn!(sniff = %code, property = %name, "Ignoring property: {e}");
                    }
                }
            }
            let exclude_patterns = settings.map(|s| s.exclude_patterns.clone()).unwrap_or_default();
            let families = instance.supported_families().to_vec();

            match instance {
                SniffInstance::Token(sniff) => {
                    let kinds = sniff.register();
                    if kinds.is_empty() {
                        return Err(RegistryError::Setup {
                            code: code.clone(),
                            source: SetupError::NoListeners,
                        });
                    }
                    let index = set.token.len();
                    for kind in &kinds {
                        let listeners = set.listeners.entry(*kind).or_default();
                        if !listeners.contains(&index) {
                            listeners.push(index);
                        }
                    }
                    debug!(sniff = %code, kinds = ?kinds, "Registered sniff");
                    set.token.push(ActiveSniff {
                        code: code.clone(),
                        families,
                        exclude_patterns,
                        sniff,
                    });
                }
                SniffInstance::Batch(sniff) => {
                    debug!(sniff = %code, "Registered batch sniff");
                    set.batch.push(ActiveBatchSniff {
                        code: code.clone(),
                        families,
                        exclude_patterns,
                        sniff,
                    });
                }
            }
        }
        Ok(set)
    }
}

/// A token sniff with its registration data.
pub struct ActiveSniff {
    /// Sniff code.
    pub code: String,
    /// Families it runs on.
    pub families: Vec<TokenizerFamily>,
    /// Files it must not run on.
    pub exclude_patterns: Vec<PatternSpec>,
    /// The instance.
    pub sniff: Box<dyn Sniff>,
}

/// A batch sniff with its registration data.
pub struct ActiveBatchSniff {
    /// Sniff code.
    pub code: String,
    /// Families it runs on.
    pub families: Vec<TokenizerFamily>,
    /// Files it must not see.
    pub exclude_patterns: Vec<PatternSpec>,
    /// The instance.
    pub sniff: Box<dyn BatchSniff>,
}

/// The instantiated active sniffs plus the kind-to-listener index.
#[derive(Default)]
pub struct SniffSet {
    /// Token sniffs in registration order.
    pub token: Vec<ActiveSniff>,
    /// Batch sniffs in registration order.
    pub batch: Vec<ActiveBatchSniff>,
    /// Token kind to indices into `token`, in registration order.
    pub listeners: HashMap<TokenKind, Vec<usize>>,
}

impl SniffSet {
    /// Listener indices for a kind.
    #[must_use]
    pub fn listeners_for(&self, kind: TokenKind) -> &[usize] {
        self.listeners.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Number of active sniffs of both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.token.len() + self.batch.len()
    }

    /// Returns true if no sniff is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{SniffContext, SniffError};

    struct Noop(Vec<TokenKind>);

    impl Sniff for Noop {
        fn register(&self) -> Vec<TokenKind> {
            self.0.clone()
        }

        fn process(&mut self, _ctx: &mut SniffContext<'_>, _pos: usize) -> Result<(), SniffError> {
            Ok(())
        }
    }

    #[test]
    fn code_parsing() {
        assert!(SniffCode::parse("A.B.C").is_some());
        assert!(SniffCode::parse("A.B").is_none());
        assert!(SniffCode::parse("A.B.C.D").is_none());
        assert!(SniffCode::parse("A..C").is_none());
    }

    #[test]
    fn conventions_are_tried_in_order() {
        let mut registry = SniffRegistry::new();
        registry.register_type("Ext_Sniffs_Files_LengthSniff", || {
            Ok(SniffInstance::token(Noop(vec![TokenKind::Whitespace])))
        });
        assert!(registry.contains("Ext.Files.Length"));

        let Err(RegistryError::NotFound { tried, .. }) = registry.resolve("Ext.Files.Width") else {
            panic!("expected NotFound");
        };
        assert_eq!(
            tried,
            vec![
                "Ext::Files::WidthSniff".to_string(),
                "Ext::sniffs::Files::WidthSniff".to_string(),
                "Ext_Sniffs_Files_WidthSniff".to_string(),
            ]
        );
    }

    #[test]
    fn empty_listen_set_is_fatal() {
        let mut registry = SniffRegistry::new();
        registry
            .register("Std.Cat.Empty", || Ok(SniffInstance::token(Noop(Vec::new()))))
            .unwrap();
        let ruleset = ResolvedRuleset {
            sniffs: vec!["Std.Cat.Empty".to_string()],
            ..ResolvedRuleset::default()
        };
        let err = registry.instantiate_ruleset(&ruleset).err().unwrap();
        assert!(matches!(err, RegistryError::Setup { source: SetupError::NoListeners, .. }));
    }

    #[test]
    fn listener_index_keeps_registration_order() {
        let mut registry = SniffRegistry::new();
        registry
            .register("Std.Cat.First", || Ok(SniffInstance::token(Noop(vec![TokenKind::If, TokenKind::If]))))
            .unwrap();
        registry
            .register("Std.Cat.Second", || Ok(SniffInstance::token(Noop(vec![TokenKind::If]))))
            .unwrap();
        let ruleset = ResolvedRuleset {
            sniffs: vec!["Std.Cat.Second".to_string(), "Std.Cat.First".to_string()],
            ..ResolvedRuleset::default()
        };
        let set = registry.instantiate_ruleset(&ruleset).unwrap();
        assert_eq!(set.listeners_for(TokenKind::If), &[0, 1]);
        assert_eq!(set.token[0].code, "Std.Cat.Second");
        assert!(set.listeners_for(TokenKind::Else).is_empty());
        assert_eq!(registry.codes_in_standard("Std").len(), 2);
    }
}
