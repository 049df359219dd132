//! The dispatch engine: file selection, per-file token dispatch, the batch
//! pass, fault isolation and the interactive re-check loop.

use crate::config::{Config, ConfigError};
use crate::discovery::{self, Candidate, ExcludePattern};
use crate::file::{self, SourceFile};
use crate::registry::{RegistryError, SniffRegistry, SniffSet};
use crate::rule::{BatchContext, ReportPolicy, SniffContext, SniffError};
use crate::ruleset::{self, PatternSpec, ResolvedRuleset, RulesetError};
use crate::tokenizer::{JsTokenizer, ScopeRules, Tokenizer, TokenizerFamily};
use crate::types::{FileReport, FileStatus, LintResult, Severity, Violation};

use std::collections::HashMap;
use std::io::{self, BufRead};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Code namespace for diagnostics the engine raises itself.
pub const INTERNAL_NAMESPACE: &str = "Internal";

/// Prefix of the diagnostic that replaces a failed file's results.
pub const ABORTED_PREFIX: &str = "An error occurred during processing; checking has been aborted.";

/// Errors that stop a run before or between files.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The rule-set could not be expanded.
    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    /// A sniff could not be resolved or constructed.
    #[error("Setup error: {0}")]
    Setup(#[from] RegistryError),

    /// An exclusion pattern is not a valid regular expression.
    #[error("Invalid exclude pattern \"{pattern}\": {source}")]
    Pattern {
        /// Pattern text.
        pattern: String,
        /// Regex error.
        source: regex::Error,
    },

    /// A path given on the command line does not exist.
    #[error("The file \"{}\" does not exist", path.display())]
    PathNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Reading interactive input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for configuring an [`Engine`].
pub struct EngineBuilder {
    config: Config,
    registry: Option<Arc<SniffRegistry>>,
    tokenizers: Vec<Arc<dyn Tokenizer>>,
    standard: Option<String>,
    sniffs: Option<Vec<String>>,
}

impl EngineBuilder {
    /// Creates a builder around a configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: None,
            tokenizers: vec![Arc::new(JsTokenizer::new())],
            standard: None,
            sniffs: None,
        }
    }

    /// Sets the sniff registry. Without one no sniff can be resolved.
    #[must_use]
    pub fn registry(mut self, registry: Arc<SniffRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Adds a tokenizer, replacing any earlier one for the same family.
    #[must_use]
    pub fn tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
        self.tokenizers.retain(|t| t.family() != tokenizer.family());
        self.tokenizers.push(Arc::new(tokenizer));
        self
    }

    /// Overrides the configured standard reference.
    #[must_use]
    pub fn standard(mut self, reference: impl Into<String>) -> Self {
        self.standard = Some(reference.into());
        self
    }

    /// Overrides the configured sniff allow-list.
    #[must_use]
    pub fn sniffs<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sniffs = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the configuration, resolves the rule-set and
    /// instantiates every sniff.
    ///
    /// # Errors
    ///
    /// Every setup failure is returned here, before any file is read.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut config = self.config;
        if let Some(standard) = self.standard {
            config.standard = standard;
        }
        if let Some(sniffs) = self.sniffs {
            config.sniffs = sniffs;
        }
        config.validate()?;

        let registry = self.registry.unwrap_or_default();
        let ruleset = ruleset::resolve(&registry, &config.standard, &config.sniffs)?;
        let sniffs = registry.instantiate_ruleset(&ruleset)?;

        let mut specs = ruleset.exclude_patterns.clone();
        specs.extend(config.exclude.iter().map(PatternSpec::absolute));
        let exclusions = compile(&specs)?;

        let tokenizers = self
            .tokenizers
            .into_iter()
            .map(|t| (t.family(), t))
            .collect();

        info!(
            standard = %config.standard,
            sniffs = sniffs.len(),
            "Rule-set resolved"
        );

        let mut engine = Engine {
            config,
            registry,
            tokenizers,
            ruleset,
            sniffs,
            exclusions,
            token_exclusions: Vec::new(),
            batch_exclusions: Vec::new(),
        };
        engine.compile_sniff_exclusions()?;
        Ok(engine)
    }
}

/// Runs a resolved rule-set over files.
///
/// Use [`Engine::builder()`] to construct an instance.
pub struct Engine {
    config: Config,
    registry: Arc<SniffRegistry>,
    tokenizers: HashMap<TokenizerFamily, Arc<dyn Tokenizer>>,
    ruleset: ResolvedRuleset,
    sniffs: SniffSet,
    exclusions: Vec<ExcludePattern>,
    token_exclusions: Vec<Vec<ExcludePattern>>,
    batch_exclusions: Vec<Vec<ExcludePattern>>,
}

struct Interaction<'a> {
    input: &'a mut dyn BufRead,
    render: &'a mut dyn FnMut(&FileReport),
}

enum Choice {
    Recheck,
    Skip,
    Quit,
}

impl Interaction<'_> {
    fn choose(&mut self, report: &FileReport) -> Result<Choice, EngineError> {
        (self.render)(report);
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Choice::Quit);
            }
            match line.trim() {
                "" => return Ok(Choice::Recheck),
                "s" | "S" => return Ok(Choice::Skip),
                "q" | "Q" => return Ok(Choice::Quit),
                other => debug!(input = other, "Unrecognised interactive input"),
            }
        }
    }
}

impl Engine {
    /// Creates a new builder.
    #[must_use]
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolved rule-set.
    #[must_use]
    pub fn ruleset(&self) -> &ResolvedRuleset {
        &self.ruleset
    }

    /// Codes of every active sniff, token sniffs first.
    #[must_use]
    pub fn sniff_codes(&self) -> Vec<&str> {
        self.sniffs
            .token
            .iter()
            .map(|s| s.code.as_str())
            .chain(self.sniffs.batch.iter().map(|s| s.code.as_str()))
            .collect()
    }

    /// Returns true if the file's extension is known and a tokenizer for
    /// its family is available.
    #[must_use]
    pub fn should_process_file(&self, path: &Path) -> bool {
        self.config
            .family_for(path)
            .is_some_and(|family| self.tokenizers.contains_key(&family))
    }

    /// Returns true if an exclusion pattern matches the path.
    #[must_use]
    pub fn should_ignore_file(&self, path: &Path, base: &Path) -> bool {
        discovery::is_excluded(&self.exclusions, path, base)
    }

    /// Expands paths into the files a run would process, in order.
    ///
    /// Directories are walked to `max_depth` when `recurse` is set and one
    /// level deep otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PathNotFound`] for a missing path.
    pub fn files_to_process(
        &self,
        paths: &[PathBuf],
        recurse: bool,
    ) -> Result<Vec<Candidate>, EngineError> {
        let mut candidates = Vec::new();
        for path in paths {
            if !path.exists() {
                return Err(EngineError::PathNotFound { path: path.clone() });
            }
            if path.is_dir() {
                let depth = if recurse { self.config.max_depth } else { Some(1) };
                let accept_dir = |dir: &Path| {
                    let ignored = self.should_ignore_file(&dir.join(""), path);
                    if ignored {
                        debug!(path = %dir.display(), "Ignoring directory");
                    }
                    !ignored
                };
                for file in discovery::walk(path, depth, accept_dir) {
                    if self.accepts(&file, path) {
                        candidates.push(Candidate {
                            path: file,
                            base: path.clone(),
                        });
                    }
                }
            } else {
                let base = path
                    .parent()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                if self.accepts(path, &base) {
                    candidates.push(Candidate {
                        path: path.clone(),
                        base,
                    });
                }
            }
        }
        Ok(candidates)
    }

    fn accepts(&self, path: &Path, base: &Path) -> bool {
        if self.should_ignore_file(path, base) {
            debug!(path = %path.display(), "Ignoring file");
            return false;
        }
        if !self.should_process_file(path) {
            debug!(path = %path.display(), "Skipping file with unknown extension");
            return false;
        }
        true
    }

    /// Processes every file under `paths`, then runs batch sniffs.
    ///
    /// # Errors
    ///
    /// Fails only for missing paths; per-file failures become diagnostics.
    pub fn process(&mut self, paths: &[PathBuf], recurse: bool) -> Result<LintResult, EngineError> {
        self.run(paths, recurse, None)
    }

    /// Like [`Engine::process`], but after a file with diagnostics is
    /// rendered, waits for one line of input: blank re-checks the file
    /// with freshly built sniffs, `s` moves on, `q` or end of input stops
    /// the run.
    ///
    /// # Errors
    ///
    /// Fails for missing paths, reading input, or rebuilding sniffs.
    pub fn process_interactive(
        &mut self,
        paths: &[PathBuf],
        recurse: bool,
        input: &mut dyn BufRead,
        render: &mut dyn FnMut(&FileReport),
    ) -> Result<LintResult, EngineError> {
        self.run(paths, recurse, Some(Interaction { input, render }))
    }

    fn run(
        &mut self,
        paths: &[PathBuf],
        recurse: bool,
        mut interaction: Option<Interaction<'_>>,
    ) -> Result<LintResult, EngineError> {
        let candidates = self.files_to_process(paths, recurse)?;
        info!("Found {} files to process", candidates.len());

        let batch_mode = !self.sniffs.batch.is_empty()
            && (candidates.len() > 1 || paths.iter().any(|p| p.is_dir()));
        let mut result = LintResult::new();
        let mut retained: Vec<(usize, SourceFile, PathBuf)> = Vec::new();

        'files: for candidate in &candidates {
            let (mut report, mut parsed) = self.process_candidate(candidate);

            if let Some(interaction) = interaction.as_mut() {
                while report.status != FileStatus::Skipped && !report.violations.is_empty() {
                    match interaction.choose(&report)? {
                        Choice::Recheck => {
                            self.reload()?;
                            (report, parsed) = self.process_candidate(candidate);
                        }
                        Choice::Skip => break,
                        Choice::Quit => {
                            info!("Run interrupted at {}", candidate.path.display());
                            result.files.push(report);
                            result.interrupted = true;
                            break 'files;
                        }
                    }
                }
            }

            if batch_mode {
                if let Some(file) = parsed {
                    retained.push((result.files.len(), file, candidate.base.clone()));
                }
            }
            result.files.push(report);
        }

        if batch_mode && !result.interrupted {
            self.run_batch(&mut result, &retained);
        }

        let (errors, warnings) = result.count_by_severity();
        info!(
            "Run complete: {} errors, {} warnings in {} files",
            errors,
            warnings,
            result.files_checked()
        );
        Ok(result)
    }

    /// Checks in-memory content as if it had been read from `path`. Batch
    /// sniffs do not run.
    #[must_use]
    pub fn process_source(&mut self, path: &Path, content: String) -> FileReport {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        self.process_content(path, base, content).0
    }

    /// Runs every applicable token sniff over an already tokenized file.
    pub fn check_file(&mut self, file: &SourceFile, base: &Path) -> FileReport {
        let policy = ReportPolicy::new(&self.ruleset.overrides, self.config.show_warnings);
        let mut violations = Vec::new();

        if file.tokens().is_empty() {
            violations.extend(policy.apply(
                file,
                INTERNAL_NAMESPACE,
                0,
                Severity::Warning,
                "No code was found in this file",
                "NoCodeFound",
                &[],
            ));
        }

        let sniffs = &mut self.sniffs;
        let exclusions = &self.token_exclusions;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatch(sniffs, exclusions, file, base, policy, &mut violations)
        }));

        let failure = match outcome {
            Ok(Ok(())) => {
                return FileReport {
                    path: file.path().to_path_buf(),
                    status: FileStatus::Processed,
                    violations,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(path = %file.path().display(), "Processing failed: {failure}");
        self.aborted(file, &failure)
    }

    fn process_candidate(&mut self, candidate: &Candidate) -> (FileReport, Option<SourceFile>) {
        debug!(path = %candidate.path.display(), "Processing");
        match std::fs::read(&candidate.path) {
            Ok(bytes) => {
                let content = self.config.encoding.decode(&bytes);
                self.process_content(&candidate.path, &candidate.base, content)
            }
            Err(e) => {
                warn!(path = %candidate.path.display(), "Failed to read: {e}");
                let placeholder = self.placeholder(&candidate.path);
                (self.aborted(&placeholder, &e.to_string()), None)
            }
        }
    }

    fn process_content(
        &mut self,
        path: &Path,
        base: &Path,
        content: String,
    ) -> (FileReport, Option<SourceFile>) {
        if file::has_ignore_file_marker(&content) {
            debug!(path = %path.display(), "Skipping file with ignore marker");
            return (FileReport::new(path.to_path_buf(), FileStatus::Skipped), None);
        }

        let family = self.config.family_for(path).unwrap_or(TokenizerFamily::Php);
        let Some(tokenizer) = self.tokenizers.get(&family).cloned() else {
            let placeholder = self.placeholder(path);
            let message = format!("no tokenizer available for {family} files");
            return (self.aborted(&placeholder, &message), None);
        };

        let tab_width = self.config.tab_width;
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            SourceFile::parse(path, content, tokenizer.as_ref(), tab_width)
        }));
        match parsed {
            Ok(Ok(file)) => {
                let report = self.check_file(&file, base);
                let keep = report.status == FileStatus::Processed;
                (report, keep.then_some(file))
            }
            Ok(Err(e)) => {
                let placeholder = self.placeholder(path);
                (self.aborted(&placeholder, &e.to_string()), None)
            }
            Err(payload) => {
                let placeholder = self.placeholder(path);
                let message = panic_message(payload.as_ref());
                (self.aborted(&placeholder, &message), None)
            }
        }
    }

    fn placeholder(&self, path: &Path) -> SourceFile {
        let family = self.config.family_for(path).unwrap_or(TokenizerFamily::Php);
        SourceFile::from_tokens(path, family, Vec::new(), &ScopeRules::new(), self.config.tab_width)
    }

    fn aborted(&self, file: &SourceFile, message: &str) -> FileReport {
        let policy = ReportPolicy::new(&self.ruleset.overrides, self.config.show_warnings);
        let mut report = FileReport::new(file.path().to_path_buf(), FileStatus::Aborted);
        report
            .violations
            .extend(internal_exception(policy, file, message));
        report
    }

    fn run_batch(&mut self, result: &mut LintResult, retained: &[(usize, SourceFile, PathBuf)]) {
        let policy = ReportPolicy::new(&self.ruleset.overrides, self.config.show_warnings);

        for (index, batch) in self.sniffs.batch.iter_mut().enumerate() {
            let exclusions = self.batch_exclusions.get(index).map_or(&[][..], Vec::as_slice);
            let selected: Vec<&(usize, SourceFile, PathBuf)> = retained
                .iter()
                .filter(|(_, file, base)| {
                    batch.families.contains(&file.family())
                        && !discovery::is_excluded(exclusions, file.path(), base)
                })
                .collect();
            let Some(&&(first_report, ref first_file, _)) = selected.first() else {
                continue;
            };

            debug!(sniff = %batch.code, files = selected.len(), "Running batch sniff");
            let files: Vec<&SourceFile> = selected.iter().map(|(_, file, _)| file).collect();
            let mut sinks = vec![Vec::new(); files.len()];
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = BatchContext::new(&files, &batch.code, policy, &mut sinks);
                batch.sniff.process_batch(&mut ctx)
            }));

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(failure) = failure {
                warn!(sniff = %batch.code, "Batch sniff failed: {failure}");
                if let Some(report) = result.files.get_mut(first_report) {
                    report
                        .violations
                        .extend(internal_exception(policy, first_file, &failure));
                }
                continue;
            }

            for ((report_index, _, _), sink) in selected.iter().zip(sinks) {
                if let Some(report) = result.files.get_mut(*report_index) {
                    report.violations.extend(sink);
                }
            }
        }
    }

    /// Rebuilds every sniff from the resolved rule-set, discarding any
    /// state they carry.
    fn reload(&mut self) -> Result<(), EngineError> {
        debug!("Re-registering sniffs");
        self.sniffs = self.registry.instantiate_ruleset(&self.ruleset)?;
        self.compile_sniff_exclusions()
    }

    fn compile_sniff_exclusions(&mut self) -> Result<(), EngineError> {
        self.token_exclusions = self
            .sniffs
            .token
            .iter()
            .map(|s| compile(&s.exclude_patterns))
            .collect::<Result<_, _>>()?;
        self.batch_exclusions = self
            .sniffs
            .batch
            .iter()
            .map(|s| compile(&s.exclude_patterns))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Writes documentation for every active sniff.
    ///
    /// # Errors
    ///
    /// Returns the first write failure.
    pub fn generate_docs(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "# {} coding standard", self.config.standard)?;
        for sniff in &self.sniffs.token {
            let kinds: Vec<String> = sniff
                .sniff
                .register()
                .iter()
                .map(|k| format!("{k:?}"))
                .collect();
            writeln!(out, "\n## {}\n", sniff.code)?;
            writeln!(out, "{}\n", sniff.sniff.description())?;
            writeln!(out, "Listens for: {}", kinds.join(", "))?;
            writeln!(out, "Languages: {}", families(&sniff.families))?;
        }
        for sniff in &self.sniffs.batch {
            writeln!(out, "\n## {}\n", sniff.code)?;
            writeln!(out, "{}\n", sniff.sniff.description())?;
            writeln!(out, "Runs once over every processed file.")?;
            writeln!(out, "Languages: {}", families(&sniff.families))?;
        }
        Ok(())
    }
}

fn dispatch(
    sniffs: &mut SniffSet,
    exclusions: &[Vec<ExcludePattern>],
    file: &SourceFile,
    base: &Path,
    policy: ReportPolicy<'_>,
    violations: &mut Vec<Violation>,
) -> Result<(), SniffError> {
    let SniffSet {
        token: active,
        listeners,
        ..
    } = sniffs;

    let enabled: Vec<bool> = active
        .iter()
        .enumerate()
        .map(|(index, sniff)| {
            sniff.families.contains(&file.family())
                && !exclusions
                    .get(index)
                    .is_some_and(|patterns| discovery::is_excluded(patterns, file.path(), base))
        })
        .collect();

    for (sniff, _) in active.iter_mut().zip(&enabled).filter(|(_, on)| **on) {
        sniff.sniff.begin_file(file);
    }

    for (pos, token) in file.tokens().iter().enumerate() {
        let Some(indices) = listeners.get(&token.kind) else {
            continue;
        };
        for &index in indices {
            if !enabled.get(index).copied().unwrap_or(false) {
                continue;
            }
            let Some(sniff) = active.get_mut(index) else {
                continue;
            };
            let mut ctx = SniffContext::new(file, &sniff.code, policy, violations);
            sniff.sniff.process(&mut ctx, pos)?;
        }
    }
    Ok(())
}

fn internal_exception(policy: ReportPolicy<'_>, file: &SourceFile, message: &str) -> Option<Violation> {
    policy.apply(
        file,
        INTERNAL_NAMESPACE,
        0,
        Severity::Error,
        "%s The error message was: %s",
        "Exception",
        &[ABORTED_PREFIX, message],
    )
}

fn compile(specs: &[PatternSpec]) -> Result<Vec<ExcludePattern>, EngineError> {
    discovery::compile_patterns(specs).map_err(|(pattern, source)| EngineError::Pattern { pattern, source })
}

fn families(families: &[TokenizerFamily]) -> String {
    families
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
