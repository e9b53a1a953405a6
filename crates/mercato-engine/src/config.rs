//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     MERCATO_DB_PATH=/var/lib/mercato/mercato.db                         │
//! │     MERCATO_USAGE_WARNING_PERCENT=90                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/mercato-ledger/mercato.toml (Linux)                       │
//! │     ~/Library/Application Support/com.mercato.ledger/mercato.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "mercato.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [usage]
//! warning_threshold_percent = 80
//!
//! [sales]
//! number_prefix = "S"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use mercato_core::subscription::DEFAULT_WARNING_PERCENT;
use mercato_db::DbConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a queued writer waits for the lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mercato.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Percent of a plan limit at which the gate starts warning (1-100).
    #[serde(default = "default_warning_percent")]
    pub warning_threshold_percent: u8,
}

fn default_warning_percent() -> u8 {
    DEFAULT_WARNING_PERCENT
}

impl Default for UsageSettings {
    fn default() -> Self {
        UsageSettings {
            warning_threshold_percent: default_warning_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    /// Sale numbers read `{prefix}-000001`.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
}

fn default_number_prefix() -> String {
    "S".to_string()
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            number_prefix: default_number_prefix(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub usage: UsageSettings,

    #[serde(default)]
    pub sales: SalesSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (mercato.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let pct = self.usage.warning_threshold_percent;
        if !(1..=100).contains(&pct) {
            return Err(ConfigError::Invalid(format!(
                "usage.warning_threshold_percent must be between 1 and 100, got {}",
                pct
            )));
        }

        if self.sales.number_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("sales.number_prefix must not be empty".into()));
        }

        Ok(())
    }

    /// Applies overrides from `lookup` (the process environment in
    /// [`load`](Self::load)). Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MERCATO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("MERCATO_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring MERCATO_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(pct) = lookup("MERCATO_USAGE_WARNING_PERCENT") {
            match pct.parse::<u8>() {
                Ok(p) => self.usage.warning_threshold_percent = p,
                Err(_) => warn!(value = %pct, "Ignoring MERCATO_USAGE_WARNING_PERCENT"),
            }
        }

        if let Some(prefix) = lookup("MERCATO_SALE_PREFIX") {
            self.sales.number_prefix = prefix;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mercato", "ledger")
            .map(|dirs| dirs.config_dir().join("mercato.toml"))
    }

    /// Pool settings for [`mercato_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.path, PathBuf::from("mercato.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.usage.warning_threshold_percent, 80);
        assert_eq!(config.sales.number_prefix, "S");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [database]
            path = "/tmp/shop.db"

            [usage]
            warning_threshold_percent = 90
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.usage.warning_threshold_percent, 90);
        assert_eq!(config.sales.number_prefix, "S");
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = EngineConfig::from_toml("[sales]\nnumber_prefix = \"POS\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("MERCATO_SALE_PREFIX", "WEB"),
            ("MERCATO_DB_MAX_CONNECTIONS", "12"),
            ("MERCATO_USAGE_WARNING_PERCENT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.sales.number_prefix, "WEB");
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.usage.warning_threshold_percent, 80);
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.usage.warning_threshold_percent = 0;
        assert!(config.validate().is_err());
        config.usage.warning_threshold_percent = 101;
        assert!(config.validate().is_err());
        config.usage.warning_threshold_percent = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mercato.toml");

        let mut config = EngineConfig::default();
        config.sales.number_prefix = "T".into();
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert_eq!(EngineConfig::from_toml(&contents).unwrap(), config);
    }

    #[test]
    fn test_db_config() {
        let mut config = EngineConfig::default();
        config.database.busy_timeout_ms = 250;
        let db = config.db_config();
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
        assert_eq!(db.max_connections, 5);
    }
}
