use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{DEFAULT_DB_FILE, DEFAULT_SUBSCRIPTION_GRACE_MS};
use crate::db::DynError;

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_FILE)
}

fn default_subscription_grace_ms() -> u64 {
    DEFAULT_SUBSCRIPTION_GRACE_MS
}

/// Configuration file structure
///
/// ```toml
/// database_path = "/var/lib/pill_alarm/medicines.sqlite"
/// subscription_grace_ms = 5000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file (default: pill_alarm.sqlite)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// How long the list subscription outlives its last observer, in ms (default: 5000)
    #[serde(default = "default_subscription_grace_ms")]
    pub subscription_grace_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            subscription_grace_ms: default_subscription_grace_ms(),
        }
    }
}

impl AppConfig {
    /// Read and validate a TOML config file
    pub fn load(config_path: &Path) -> Result<Self, DynError> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            )
        })?;
        let config = Self::parse(&content).map_err(|e| {
            format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            )
        })?;
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self, DynError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }
        Ok(())
    }

    pub fn subscription_grace(&self) -> Duration {
        Duration::from_millis(self.subscription_grace_ms)
    }
}
