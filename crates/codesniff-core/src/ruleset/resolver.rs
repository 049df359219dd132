//! Recursive expansion of rule-set references.
//!
//! A reference may name a standard, a category (`Std.Cat`), a sniff
//! (`Std.Cat.Name`), a message code (`Std.Cat.Name.Code`, overrides only),
//! a descriptor file (`*.xml`) or a standard directory. The active set is
//! the union of all expansions minus the union of all exclusions, so the
//! order in which rules and exclusions appear does not matter.

use super::descriptor::RulesetDescriptor;
use super::{PatternSpec, RuleOverride, RulesetError};
use crate::registry::{RegistryError, SniffCode, SniffRegistry, Standard};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const INTERNAL_NAMESPACE: &str = "Internal";

/// The active sniff set plus everything the rule-set attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRuleset {
    /// Active sniff codes, in first-inclusion order.
    pub sniffs: Vec<String>,
    /// Overrides keyed by sniff code or message code.
    pub overrides: BTreeMap<String, RuleOverride>,
    /// File exclusion patterns declared at descriptor level.
    pub exclude_patterns: Vec<PatternSpec>,
}

/// Expands `reference` (several may be joined with commas) and applies the
/// optional allow-list.
///
/// # Errors
///
/// Any unknown reference, missing implementation, malformed descriptor,
/// reference cycle or invalid allow-list entry is fatal.
pub fn resolve(
    registry: &SniffRegistry,
    reference: &str,
    allow_list: &[String],
) -> Result<ResolvedRuleset, RulesetError> {
    for code in allow_list {
        if SniffCode::parse(code).is_none() {
            return Err(RulesetError::InvalidSniffCode { code: code.clone() });
        }
    }

    let mut resolver = Resolver::new(registry);
    let mut included = Vec::new();
    for part in reference.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let codes = resolver.expand(part, None)?;
        push_unique(&mut included, codes);
    }

    let sniffs: Vec<String> = included
        .into_iter()
        .filter(|code| !resolver.excluded.contains(code))
        .filter(|code| allow_list.is_empty() || allow_list.contains(code))
        .collect();
    debug!(
        reference,
        active = sniffs.len(),
        excluded = resolver.excluded.len(),
        "Resolved rule-set"
    );

    Ok(ResolvedRuleset {
        sniffs,
        overrides: resolver.overrides,
        exclude_patterns: resolver.exclude_patterns,
    })
}

fn push_unique(target: &mut Vec<String>, codes: Vec<String>) {
    for code in codes {
        if !target.contains(&code) {
            target.push(code);
        }
    }
}

struct Resolver<'r> {
    registry: &'r SniffRegistry,
    chain: Vec<String>,
    excluded: BTreeSet<String>,
    overrides: BTreeMap<String, RuleOverride>,
    exclude_patterns: Vec<PatternSpec>,
    external: BTreeMap<String, Vec<String>>,
}

impl<'r> Resolver<'r> {
    fn new(registry: &'r SniffRegistry) -> Self {
        Self {
            registry,
            chain: Vec::new(),
            excluded: BTreeSet::new(),
            overrides: BTreeMap::new(),
            exclude_patterns: Vec::new(),
            external: BTreeMap::new(),
        }
    }

    fn enter<T>(
        &mut self,
        key: String,
        f: impl FnOnce(&mut Self) -> Result<T, RulesetError>,
    ) -> Result<T, RulesetError> {
        if self.chain.contains(&key) {
            let mut chain = self.chain.clone();
            chain.push(key);
            return Err(RulesetError::Cycle { chain });
        }
        self.chain.push(key);
        let result = f(self);
        self.chain.pop();
        result
    }

    fn expand(&mut self, reference: &str, base_dir: Option<&Path>) -> Result<Vec<String>, RulesetError> {
        if reference == INTERNAL_NAMESPACE || reference.starts_with("Internal.") {
            return Ok(Vec::new());
        }
        if let Some(standard) = self.registry.standard(reference) {
            return self.expand_standard(standard);
        }
        if let Some(codes) = self.external.get(reference) {
            return Ok(codes.clone());
        }

        let path = match base_dir {
            Some(base) if Path::new(reference).is_relative() => base.join(reference),
            _ => PathBuf::from(reference),
        };
        if is_descriptor_name(reference) {
            if !path.is_file() {
                return Err(RulesetError::UnknownReference {
                    reference: reference.to_string(),
                });
            }
            let descriptor = RulesetDescriptor::load(&path)?;
            return self.enter(canonical_key(&path), |s| s.process_descriptor(&descriptor));
        }
        if path.is_dir() {
            return self.expand_directory(&path);
        }

        let parts: Vec<&str> = reference.split('.').collect();
        match parts.len() {
            2 => {
                let prefix = format!("{reference}.");
                let codes: Vec<String> = self
                    .standard_codes(parts[0])
                    .into_iter()
                    .filter(|c| c.starts_with(&prefix))
                    .collect();
                if codes.is_empty() {
                    return Err(RulesetError::UnknownReference {
                        reference: reference.to_string(),
                    });
                }
                debug!(reference, count = codes.len(), "Expanded category");
                Ok(codes)
            }
            3 => {
                let known = self
                    .external
                    .values()
                    .any(|codes| codes.iter().any(|c| c == reference));
                if !known {
                    self.registry.resolve(reference)?;
                }
                Ok(vec![reference.to_string()])
            }
            // A single message: overrides only.
            4 => Ok(Vec::new()),
            _ => Err(RulesetError::UnknownReference {
                reference: reference.to_string(),
            }),
        }
    }

    fn standard_codes(&self, standard: &str) -> Vec<String> {
        let mut codes = self.registry.codes_in_standard(standard);
        if let Some(external) = self.external.get(standard) {
            push_unique(&mut codes, external.clone());
        }
        codes
    }

    fn expand_standard(&mut self, standard: &Standard) -> Result<Vec<String>, RulesetError> {
        if let Some(directory) = &standard.directory {
            return self.expand_directory(directory);
        }
        let key = format!("standard:{}", standard.name);
        self.enter(key, |s| {
            let mut codes = s.registry.codes_in_standard(&standard.name);
            if let Some(xml) = standard.ruleset {
                let descriptor = RulesetDescriptor::parse(xml, &standard.name, None)?;
                let referenced = s.process_descriptor(&descriptor)?;
                push_unique(&mut codes, referenced);
            }
            debug!(standard = %standard.name, count = codes.len(), "Expanded standard");
            Ok(codes)
        })
    }

    fn expand_directory(&mut self, dir: &Path) -> Result<Vec<String>, RulesetError> {
        let ruleset_path = dir.join("ruleset.xml");
        if !ruleset_path.is_file() {
            return Err(RulesetError::UnknownReference {
                reference: dir.display().to_string(),
            });
        }
        let descriptor = RulesetDescriptor::load(&ruleset_path)?;
        let name = descriptor
            .name
            .clone()
            .or_else(|| dir.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_default();

        self.enter(canonical_key(&ruleset_path), |s| {
            let mut codes = discover_sniffs(dir, &name);
            for code in &codes {
                s.registry.resolve(code)?;
            }
            s.external.insert(name.clone(), codes.clone());
            let referenced = s.process_descriptor(&descriptor)?;
            push_unique(&mut codes, referenced);
            debug!(standard = %name, count = codes.len(), "Expanded directory standard");
            Ok(codes)
        })
    }

    fn process_descriptor(&mut self, descriptor: &RulesetDescriptor) -> Result<Vec<String>, RulesetError> {
        for pattern in &descriptor.exclude_patterns {
            if !self.exclude_patterns.contains(pattern) {
                self.exclude_patterns.push(pattern.clone());
            }
        }

        let base = descriptor.base_dir.as_deref();
        let mut codes = Vec::new();
        for rule in &descriptor.rules {
            let expanded = self.expand(&rule.reference, base)?;

            for exclusion in &rule.excludes {
                self.exclude(exclusion, base)?;
            }

            let settings = rule.to_override();
            if !settings.is_empty() {
                let targets_code = rule.reference.starts_with("Internal.")
                    || rule.reference.split('.').count() >= 3;
                if targets_code {
                    self.add_override(&rule.reference, &settings);
                } else {
                    for code in &expanded {
                        self.add_override(code, &settings);
                    }
                }
            }
            push_unique(&mut codes, expanded);
        }
        Ok(codes)
    }

    fn exclude(&mut self, exclusion: &str, base: Option<&Path>) -> Result<(), RulesetError> {
        if exclusion.split('.').count() == 4 {
            let silence = RuleOverride {
                severity: Some(0),
                ..RuleOverride::default()
            };
            self.add_override(exclusion, &silence);
            return Ok(());
        }
        match self.expand(exclusion, base) {
            Ok(codes) => {
                debug!(exclusion, count = codes.len(), "Excluded");
                self.excluded.extend(codes);
                Ok(())
            }
            Err(RulesetError::UnknownReference { .. } | RulesetError::Registry(RegistryError::NotFound { .. })) => {
                warn!(exclusion, "Exclusion matches no known sniff");
                self.excluded.insert(exclusion.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn add_override(&mut self, key: &str, settings: &RuleOverride) {
        self.overrides
            .entry(key.to_string())
            .or_default()
            .merge(settings);
    }
}

/// `*.xml` or a distributed `*.xml.dist` default.
fn is_descriptor_name(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".xml.dist")
}

fn canonical_key(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

/// Finds `Sniffs/<Category>/<Name>Sniff.*` under a standard directory.
fn discover_sniffs(dir: &Path, standard: &str) -> Vec<String> {
    let mut codes: Vec<String> = WalkDir::new(dir.join("Sniffs"))
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let stem = entry.path().file_stem()?.to_str()?;
            let name = stem.strip_suffix("Sniff")?;
            let category = entry.path().parent()?.file_name()?.to_str()?;
            (!name.is_empty()).then(|| format!("{standard}.{category}.{name}"))
        })
        .collect();
    codes.dedup();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{SniffContext, SniffError, SniffInstance, Sniff};
    use crate::token::TokenKind;

    struct Noop;

    impl Sniff for Noop {
        fn register(&self) -> Vec<TokenKind> {
            vec![TokenKind::Identifier]
        }

        fn process(&mut self, _ctx: &mut SniffContext<'_>, _pos: usize) -> Result<(), SniffError> {
            Ok(())
        }
    }

    fn registry() -> SniffRegistry {
        let mut registry = SniffRegistry::new();
        for code in ["Alpha.Cat.One", "Alpha.Cat.Two", "Alpha.Other.Three", "Beta.Misc.Four"] {
            registry.register(code, || Ok(SniffInstance::token(Noop))).unwrap();
        }
        registry.add_standard(Standard::builtin("Alpha", "Alpha rules"));
        registry.add_standard(
            Standard::builtin("Beta", "Beta rules").with_ruleset(
                r#"<ruleset name="Beta"><rule ref="Alpha.Cat.One"><severity>2</severity></rule></ruleset>"#,
            ),
        );
        registry
    }

    fn write(dir: &Path, name: &str, xml: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, xml).unwrap();
        path
    }

    #[test]
    fn standard_pulls_in_embedded_references() {
        let resolved = resolve(&registry(), "Beta", &[]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Beta.Misc.Four", "Alpha.Cat.One"]);
        assert_eq!(resolved.overrides["Alpha.Cat.One"].severity, Some(2));
    }

    #[test]
    fn category_and_sniff_references() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "mine.xml",
            r#"<ruleset name="Mine"><rule ref="Alpha.Cat"/><rule ref="Beta.Misc.Four"/></ruleset>"#,
        );
        let resolved = resolve(&registry, &path.display().to_string(), &[]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Alpha.Cat.One", "Alpha.Cat.Two", "Beta.Misc.Four"]);
    }

    #[test]
    fn dist_descriptors_are_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "project.xml.dist", r#"<ruleset><rule ref="Alpha.Cat.Two"/></ruleset>"#);
        let resolved = resolve(&registry(), &path.display().to_string(), &[]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Alpha.Cat.Two"]);
    }

    #[test]
    fn exclusions_apply_regardless_of_order() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let first = write(
            dir.path(),
            "first.xml",
            r#"<ruleset><rule ref="Alpha"><exclude name="Alpha.Cat"/></rule><rule ref="Alpha.Cat.One"/></ruleset>"#,
        );
        let second = write(
            dir.path(),
            "second.xml",
            r#"<ruleset><rule ref="Alpha.Cat.One"/><rule ref="Alpha"><exclude name="Alpha.Cat"/></rule></ruleset>"#,
        );
        let a = resolve(&registry, &first.display().to_string(), &[]).unwrap();
        let b = resolve(&registry, &second.display().to_string(), &[]).unwrap();
        assert_eq!(a.sniffs, vec!["Alpha.Other.Three"]);
        let mut sorted = b.sniffs.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["Alpha.Other.Three"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let registry = registry();
        let first = resolve(&registry, "Alpha, Beta", &[]).unwrap();
        let second = resolve(&registry, "Alpha, Beta", &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn allow_list_filters_and_validates() {
        let registry = registry();
        let resolved = resolve(&registry, "Alpha", &["Alpha.Cat.Two".to_string()]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Alpha.Cat.Two"]);

        let err = resolve(&registry, "Alpha", &["Alpha.Cat".to_string()]).unwrap_err();
        assert!(matches!(err, RulesetError::InvalidSniffCode { .. }));
    }

    #[test]
    fn unknown_references_are_fatal() {
        let registry = registry();
        assert!(matches!(
            resolve(&registry, "Gamma", &[]).unwrap_err(),
            RulesetError::UnknownReference { .. }
        ));
        assert!(matches!(
            resolve(&registry, "Alpha.Cat.Missing", &[]).unwrap_err(),
            RulesetError::Registry(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            resolve(&registry, "Alpha.Nothing", &[]).unwrap_err(),
            RulesetError::UnknownReference { .. }
        ));
    }

    #[test]
    fn cycles_are_detected() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.xml", r#"<ruleset><rule ref="b.xml"/></ruleset>"#);
        write(dir.path(), "b.xml", r#"<ruleset><rule ref="a.xml"/></ruleset>"#);
        let err = resolve(&registry, &dir.path().join("a.xml").display().to_string(), &[]).unwrap_err();
        let RulesetError::Cycle { chain } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn message_code_rules_only_override() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "m.xml",
            r#"<ruleset>
                <rule ref="Alpha.Other"/>
                <rule ref="Alpha.Other.Three.Found"><type>warning</type></rule>
                <rule ref="Internal.NoCodeFound"><severity>0</severity></rule>
                <rule ref="Alpha.Cat.One"><exclude name="Alpha.Cat.One.Noisy"/></rule>
            </ruleset>"#,
        );
        let resolved = resolve(&registry, &path.display().to_string(), &[]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Alpha.Other.Three", "Alpha.Cat.One"]);
        assert!(resolved.overrides.contains_key("Alpha.Other.Three.Found"));
        assert_eq!(resolved.overrides["Internal.NoCodeFound"].severity, Some(0));
        assert_eq!(resolved.overrides["Alpha.Cat.One.Noisy"].severity, Some(0));
    }

    #[test]
    fn directory_standard_discovers_sniffs() {
        let mut registry = registry();
        registry.register_type("Ext_Sniffs_Files_LengthSniff", || Ok(SniffInstance::token(Noop)));
        let dir = tempfile::tempdir().unwrap();
        let std_dir = dir.path().join("Ext");
        std::fs::create_dir_all(std_dir.join("Sniffs/Files")).unwrap();
        std::fs::write(std_dir.join("Sniffs/Files/LengthSniff.php"), "").unwrap();
        write(&std_dir, "ruleset.xml", r#"<ruleset name="Ext"><rule ref="Alpha.Other.Three"/></ruleset>"#);

        let resolved = resolve(&registry, &std_dir.display().to_string(), &[]).unwrap();
        assert_eq!(resolved.sniffs, vec!["Ext.Files.Length", "Alpha.Other.Three"]);
    }
}
