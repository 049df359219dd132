//! Locating the run configuration and the project rule-set.
//!
//! Starting from the checked path, the nearest ancestor directory wins for
//! each kind of file independently:
//!
//! - settings: `--config`, else `codesniff.toml` / `.codesniff.toml`, else
//!   `config.toml` in the global directory, else built-in defaults
//! - rule-set: `codesniff.xml`, `codesniff.xml.dist` or `.codesniff.xml`,
//!   used as the standard unless `--standard` names one

use anyhow::{Context, Result};
use codesniff_core::Config;
use std::path::{Path, PathBuf};

/// Settings file names, in order of preference within one directory.
pub const SETTINGS_FILES: &[&str] = &["codesniff.toml", ".codesniff.toml"];

/// Rule-set descriptor names, in order of preference within one directory.
pub const RULESET_FILES: &[&str] = &["codesniff.xml", "codesniff.xml.dist", ".codesniff.xml"];

const GLOBAL_SETTINGS: &str = "config.toml";

/// Where the settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named with `--config`.
    Explicit(PathBuf),
    /// Found in the project tree.
    Project(PathBuf),
    /// Found in the global directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Settings file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }
}

/// Everything found for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// Settings source.
    pub settings: ConfigSource,
    /// Nearest project rule-set descriptor.
    pub ruleset: Option<PathBuf>,
}

impl Discovered {
    /// Reads the settings and applies the project rule-set as the standard.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or is invalid.
    pub fn load(&self) -> Result<Config> {
        let mut config = match self.settings.path() {
            Some(path) => {
                tracing::info!("Using settings from {}", path.display());
                Config::from_file(path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?
            }
            None => Config::default(),
        };
        if let Some(ruleset) = &self.ruleset {
            tracing::info!("Using project rule-set {}", ruleset.display());
            config.standard = ruleset.to_string_lossy().into_owned();
        }
        Ok(config)
    }
}

/// Discovers settings and rule-set for a run over `paths`.
#[must_use]
pub fn discover(paths: &[PathBuf], explicit: Option<&Path>) -> Discovered {
    discover_from(&start_dir(paths), explicit, global_dir().as_deref())
}

fn discover_from(start: &Path, explicit: Option<&Path>, global: Option<&Path>) -> Discovered {
    let settings = match explicit {
        Some(path) => ConfigSource::Explicit(path.to_path_buf()),
        None => nearest(start, SETTINGS_FILES)
            .map(ConfigSource::Project)
            .or_else(|| {
                global
                    .map(|dir| dir.join(GLOBAL_SETTINGS))
                    .filter(|p| p.is_file())
                    .map(ConfigSource::Global)
            })
            .unwrap_or(ConfigSource::Default),
    };
    Discovered {
        settings,
        ruleset: nearest(start, RULESET_FILES),
    }
}

/// The first of `names` in `start` or its closest ancestor holding one.
fn nearest(start: &Path, names: &[&str]) -> Option<PathBuf> {
    let found = start
        .ancestors()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file());
    if let Some(path) = &found {
        tracing::debug!("Found {}", path.display());
    }
    found
}

/// Directory the search starts in: the first path, or its parent for a file.
fn start_dir(paths: &[PathBuf]) -> PathBuf {
    let first = paths.first().map_or_else(|| PathBuf::from("."), Clone::clone);
    let dir = if first.is_file() {
        first.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    } else {
        first
    };
    let dir = if dir.as_os_str().is_empty() { PathBuf::from(".") } else { dir };
    dir.canonicalize().unwrap_or(dir)
}

/// `$CODESNIFF_CONFIG_DIR`, else `~/.codesniff`.
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    match std::env::var_os("CODESNIFF_CONFIG_DIR") {
        Some(dir) => Some(PathBuf::from(dir)),
        None => home::home_dir().map(|h| h.join(".codesniff")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout(files: &[&str]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for file in files {
            let path = tmp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        tmp
    }

    #[test]
    fn settings_are_found_in_an_ancestor() {
        let tmp = layout(&["codesniff.toml", "src/lib/a.js"]);
        let found = discover_from(&tmp.path().join("src/lib"), None, None);
        assert_eq!(found.settings, ConfigSource::Project(tmp.path().join("codesniff.toml")));
    }

    #[test]
    fn nearest_directory_wins_over_file_name_order() {
        let tmp = layout(&["codesniff.toml", "src/.codesniff.toml"]);
        let found = discover_from(&tmp.path().join("src"), None, None);
        assert_eq!(found.settings, ConfigSource::Project(tmp.path().join("src/.codesniff.toml")));
    }

    #[test]
    fn explicit_settings_skip_the_search_but_not_the_ruleset() {
        let tmp = layout(&["codesniff.toml", "codesniff.xml.dist"]);
        let found = discover_from(tmp.path(), Some(Path::new("/elsewhere.toml")), None);
        assert_eq!(found.settings, ConfigSource::Explicit(PathBuf::from("/elsewhere.toml")));
        assert_eq!(found.ruleset, Some(tmp.path().join("codesniff.xml.dist")));
    }

    #[test]
    fn global_settings_only_without_project_settings() {
        let project = layout(&[]);
        let global = layout(&["config.toml"]);
        let found = discover_from(project.path(), None, Some(global.path()));
        assert_eq!(found.settings, ConfigSource::Global(global.path().join("config.toml")));

        let empty_global = layout(&[]);
        let found = discover_from(project.path(), None, Some(empty_global.path()));
        assert_eq!(found.settings, ConfigSource::Default);
    }

    #[test]
    fn project_ruleset_becomes_the_standard() {
        let tmp = layout(&["codesniff.xml", "codesniff.xml.dist"]);
        fs::write(tmp.path().join("codesniff.toml"), "standard = \"Generic\"\ntab_width = 2\n").unwrap();

        let config = discover_from(tmp.path(), None, None).load().unwrap();
        assert_eq!(config.standard, tmp.path().join("codesniff.xml").to_string_lossy());
        assert_eq!(config.tab_width, 2);
    }

    #[test]
    fn invalid_settings_name_the_field() {
        let tmp = layout(&[]);
        fs::write(tmp.path().join(".codesniff.toml"), "tab_width = 0\n").unwrap();

        let err = discover_from(tmp.path(), None, None).load().unwrap_err();
        assert!(format!("{err:#}").contains("tab_width"));
    }

    #[test]
    fn search_starts_beside_a_file_argument() {
        let tmp = layout(&["pkg/app.js"]);
        let start = start_dir(&[tmp.path().join("pkg/app.js")]);
        assert_eq!(start, tmp.path().join("pkg").canonicalize().unwrap());
    }
}
