#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for roller
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/roller/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;
pub mod sections;

pub use sections::{BuiltinConfig, DatabaseConfig, LoggingConfig, RolloutConfig};

use roller_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub rollout: RolloutConfig,

    #[serde(default)]
    pub builtin: BuiltinConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Write configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub async fn save_to_file(&self, path: &Path) -> Result<(), Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            error: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(path) = std::env::var(constants::ENV_DB_PATH) {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Ok(max) = std::env::var(constants::ENV_DB_MAX_CONNECTIONS) {
            self.database.max_connections = parse_env(constants::ENV_DB_MAX_CONNECTIONS, max)?;
        }

        if let Ok(secs) = std::env::var(constants::ENV_INSTANCE_VALIDITY_SECS) {
            self.rollout.instance_validity_secs =
                parse_env(constants::ENV_INSTANCE_VALIDITY_SECS, secs)?;
        }

        if let Ok(strict) = std::env::var(constants::ENV_STRICT_ADMISSION) {
            self.rollout.strict_admission = parse_bool(constants::ENV_STRICT_ADMISSION, strict)?;
        }

        if let Ok(app_id) = std::env::var(constants::ENV_BUILTIN_APP_ID) {
            self.builtin.app_id = Some(app_id);
        }

        if let Ok(level) = std::env::var(constants::ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var(constants::ENV_LOG_JSON) {
            self.logging.json = parse_bool(constants::ENV_LOG_JSON, json)?;
        }

        Ok(())
    }

    /// Check values that serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero-sized pool, a zero
    /// validity window or builtin ids that are not UUIDs.
    pub fn validate(&self) -> Result<(), Error> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.rollout.instance_validity_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rollout.instance_validity_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        let builtin_ids = self
            .builtin
            .app_id
            .iter()
            .map(|id| ("builtin.app_id".to_string(), id))
            .chain(
                self.builtin
                    .groups
                    .iter()
                    .map(|(name, id)| (format!("builtin.groups.{name}"), id)),
            );
        for (field, id) in builtin_ids {
            if uuid::Uuid::parse_str(id).is_err() {
                return Err(ConfigError::InvalidValue {
                    field,
                    value: id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Get the database path (with default)
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(constants::APP_DIR)
                .join(constants::DB_FILE)
        })
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> Result<T, Error> {
    value.parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()
    })
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
