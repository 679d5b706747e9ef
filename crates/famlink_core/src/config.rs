//! Runtime configuration for the record store front ends.
//!
//! # Invariants
//! - A validated config has a non-empty `db_path` (relative paths resolve
//!   against the working directory, `:memory:` selects an in-memory store),
//!   an `http(s)` base URL and short alphabetic xref prefixes.

use crate::logging::default_log_level;
use crate::repo::record_repo::XrefPrefixes;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Special `db_path` value selecting an in-memory database.
pub const MEMORY_DB_PATH: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file, or `:memory:`.
    pub db_path: PathBuf,
    /// Site root used for redirects, e.g. `https://example.org/family`.
    pub base_url: String,
    pub log_level: String,
    /// Absolute log directory; file logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub individual_prefix: String,
    pub family_prefix: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let prefixes = XrefPrefixes::default();
        Self {
            db_path: PathBuf::from("famlink.sqlite3"),
            base_url: "http://localhost".to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            individual_prefix: prefixes.individual,
            family_prefix: prefixes.family,
        }
    }
}

/// Configuration loading/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config file: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl CoreConfig {
    /// Reads a JSON config file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got `{base}`"
            )));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        self.xref_prefixes()
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn xref_prefixes(&self) -> XrefPrefixes {
        XrefPrefixes {
            individual: self.individual_prefix.clone(),
            family: self.family_prefix.clone(),
        }
    }

    pub fn uses_memory_db(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_DB_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.individual_prefix, "I");
        assert!(!config.uses_memory_db());
    }

    #[test]
    fn relative_db_path_is_accepted() {
        let config = CoreConfig {
            db_path: "data/tree.sqlite3".into(),
            ..CoreConfig::default()
        };
        config.validate().expect("relative db_path should validate");
        assert!(CoreConfig {
            db_path: "".into(),
            ..CoreConfig::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn load_merges_partial_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"db_path": ":memory:", "base_url": "https://example.org/family"}}"#
        )
        .expect("write config");

        let config = CoreConfig::load(file.path()).expect("config should load");
        assert!(config.uses_memory_db());
        assert_eq!(config.base_url, "https://example.org/family");
        assert_eq!(config.family_prefix, "F");
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"dbpath": "x"}}"#).expect("write config");
        assert!(matches!(
            CoreConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));

        let config = CoreConfig {
            base_url: "ftp://example.org".to_string(),
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = CoreConfig {
            family_prefix: "F-".to_string(),
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
