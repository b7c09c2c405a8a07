//! Service configuration.
//!
//! Loaded from a TOML file; every section and field is optional and falls
//! back to its default. A handful of fields can be overridden from the
//! environment (`EMBARGO_*`), which wins over the file.
//!
//! ```toml
//! [storage]
//! collections_dir = "/var/embargo/collections"
//! key_database = "/var/embargo/keys.db"
//!
//! [approval]
//! workers = 8
//!
//! [alerts]
//! channels = ["#publishing", "#dev-alerts"]
//!
//! [logging]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub approval: ApprovalConfig,
    pub alerts: AlertsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of `<id>.json` collection descriptions.
    pub collections_dir: PathBuf,
    /// Root of the collections' content trees.
    pub content_root: PathBuf,
    /// Root of the published content tree.
    pub published_root: PathBuf,
    /// SQLite key database. `None` keeps keys in an in-memory database.
    pub key_database: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            collections_dir: PathBuf::from("collections"),
            content_root: PathBuf::from("content"),
            published_root: PathBuf::from("published"),
            key_database: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Maximum approval runs executing at once.
    pub workers: usize,
    /// Compression attempts before time series archives are reported unverified.
    pub zip_verification_attempts: u32,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            zip_verification_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Channels that receive start-up warnings.
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.level).map_err(|_| ConfigError::InvalidValue {
            key: "logging.level",
            value: self.level.clone(),
        })
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EMBARGO_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EMBARGO_COLLECTIONS_DIR") {
            self.storage.collections_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("EMBARGO_CONTENT_ROOT") {
            self.storage.content_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("EMBARGO_PUBLISHED_ROOT") {
            self.storage.published_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("EMBARGO_KEY_DATABASE") {
            self.storage.key_database = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("EMBARGO_APPROVAL_WORKERS") {
            self.approval.workers = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "EMBARGO_APPROVAL_WORKERS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("EMBARGO_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("EMBARGO_LOG_JSON") {
            self.logging.json = matches!(v.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.approval.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "approval.workers",
                value: "0".to_string(),
            });
        }
        if self.approval.zip_verification_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "approval.zip_verification_attempts",
                value: "0".to_string(),
            });
        }
        self.logging.level()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r##"
            [approval]
            workers = 2

            [alerts]
            channels = ["#publishing"]
            "##,
        )
        .unwrap();

        assert_eq!(config.approval.workers, 2);
        assert_eq!(config.approval.zip_verification_attempts, 3);
        assert_eq!(config.alerts.channels, vec!["#publishing"]);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = Config::from_toml_str("[approval]\nworkers = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "approval.workers", .. }));
    }

    #[test]
    fn test_rejects_bad_level() {
        assert!(Config::from_toml_str("[logging]\nlevel = \"loud\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("EMBARGO_KEY_DATABASE", "/tmp/keys.db"),
            ("EMBARGO_APPROVAL_WORKERS", "16"),
            ("EMBARGO_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.key_database, Some(PathBuf::from("/tmp/keys.db")));
        assert_eq!(config.approval.workers, 16);
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embargo.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level().unwrap(), tracing::Level::DEBUG);
    }
}
