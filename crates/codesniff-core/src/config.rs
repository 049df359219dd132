//! Run configuration.

use crate::tokenizer::TokenizerFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Source file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8; invalid sequences are replaced.
    #[default]
    #[serde(rename = "utf-8", alias = "utf8", alias = "UTF-8")]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[serde(rename = "iso-8859-1", alias = "latin1", alias = "ISO-8859-1")]
    Latin1,
}

impl Encoding {
    /// Decodes raw file bytes.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Standard reference: a name, a directory or a descriptor path.
    /// Several may be joined with commas.
    #[serde(default = "default_standard")]
    pub standard: String,

    /// Optional allow-list of sniff codes.
    #[serde(default)]
    pub sniffs: Vec<String>,

    /// File extension to tokenizer family.
    #[serde(default = "default_extensions")]
    pub extensions: BTreeMap<String, TokenizerFamily>,

    /// Extra exclusion patterns (`*` is a wildcard).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Maximum directory recursion depth (`None` is unbounded).
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Columns per tab stop.
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Source encoding.
    #[serde(default)]
    pub encoding: Encoding,

    /// Verbosity level (0 to 3).
    #[serde(default)]
    pub verbosity: u8,

    /// Pause after each file with diagnostics.
    #[serde(default)]
    pub interactive: bool,

    /// Report warnings as well as errors.
    #[serde(default = "default_true")]
    pub show_warnings: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            standard: default_standard(),
            sniffs: Vec::new(),
            extensions: default_extensions(),
            exclude: Vec::new(),
            max_depth: None,
            tab_width: default_tab_width(),
            encoding: Encoding::default(),
            verbosity: 0,
            interactive: false,
            show_warnings: true,
        }
    }
}

fn default_standard() -> String {
    "Squiz".to_string()
}

fn default_extensions() -> BTreeMap<String, TokenizerFamily> {
    [
        ("php", TokenizerFamily::Php),
        ("inc", TokenizerFamily::Php),
        ("js", TokenizerFamily::Js),
        ("css", TokenizerFamily::Css),
    ]
    .into_iter()
    .map(|(ext, family)| (ext.to_string(), family))
    .collect()
}

fn default_tab_width() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_width == 0 {
            return Err(ConfigError::Invalid {
                field: "tab_width",
                message: "must be at least 1".to_string(),
            });
        }
        if self.verbosity > 3 {
            return Err(ConfigError::Invalid {
                field: "verbosity",
                message: format!("{} is above the maximum of 3", self.verbosity),
            });
        }
        if self.standard.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "standard",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Tokenizer family for a path, by extension.
    #[must_use]
    pub fn family_for(&self, path: &Path) -> Option<TokenizerFamily> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.get(&ext).copied()
    }

    /// Replaces the extension map from `ext` or `ext/family` entries.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown family name.
    pub fn set_extensions(&mut self, entries: &[String]) -> Result<(), ConfigError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            let (ext, family) = match entry.split_once('/') {
                Some((ext, family)) => (ext, family),
                None => (entry.as_str(), entry.as_str()),
            };
            let family = match family.to_ascii_lowercase().as_str() {
                "php" | "inc" => TokenizerFamily::Php,
                "js" => TokenizerFamily::Js,
                "css" => TokenizerFamily::Css,
                other => {
                    return Err(ConfigError::Invalid {
                        field: "extensions",
                        message: format!("unknown tokenizer family '{other}'"),
                    })
                }
            };
            map.insert(ext.trim_start_matches('.').to_ascii_lowercase(), family);
        }
        self.extensions = map;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A value is out of range.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.standard, "Squiz");
        assert_eq!(config.tab_width, 4);
        assert!(config.show_warnings);
        assert_eq!(config.family_for(Path::new("a/b.JS")), Some(TokenizerFamily::Js));
        assert_eq!(config.family_for(Path::new("a/b.txt")), None);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
standard = "Generic"
sniffs = ["Generic.Commenting.Todo"]
exclude = ["*/vendor/*"]
tab_width = 2
encoding = "iso-8859-1"

[extensions]
js = "js"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.standard, "Generic");
        assert_eq!(config.encoding, Encoding::Latin1);
        assert_eq!(config.extensions.len(), 1);
        assert_eq!(config.tab_width, 2);
    }

    #[test]
    fn unsupported_encoding_is_rejected() {
        let err = Config::parse("encoding = \"shift-jis\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_tab_width_is_rejected() {
        let err = Config::parse("tab_width = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tab_width", .. }));
    }

    #[test]
    fn latin1_maps_bytes_to_code_points() {
        assert_eq!(Encoding::Latin1.decode(&[0x63, 0xe9]), "c\u{e9}");
    }

    #[test]
    fn extension_entries() {
        let mut config = Config::default();
        config
            .set_extensions(&["js".to_string(), "module/php".to_string()])
            .unwrap();
        assert_eq!(config.family_for(Path::new("x.module")), Some(TokenizerFamily::Php));
        assert!(config.set_extensions(&["x/cobol".to_string()]).is_err());
    }
}
