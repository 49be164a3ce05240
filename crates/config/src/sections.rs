//! Configuration sections

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

/// Rollout engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Instances that have not checked in for this long are left out of
    /// statistics and listings.
    #[serde(default = "default_instance_validity_secs")]
    pub instance_validity_secs: u64,
    /// Serialize decisions per group so rollout limits are exact.
    #[serde(default = "default_strict_admission")]
    pub strict_admission: bool,
    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: u32,
    #[serde(default = "default_status_history_limit")]
    pub status_history_limit: u32,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            instance_validity_secs: default_instance_validity_secs(),
            strict_admission: default_strict_admission(),
            activity_window_days: default_activity_window_days(),
            status_history_limit: default_status_history_limit(),
        }
    }
}

impl RolloutConfig {
    #[must_use]
    pub fn instance_validity(&self) -> Duration {
        Duration::from_secs(self.instance_validity_secs)
    }
}

/// The builtin distribution: an application whose updater reports
/// completion twice, plus well-known group ids keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BuiltinConfig {
    pub app_id: Option<String>,
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
}

/// Logging configuration for the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions for serde
fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_secs() -> u64 {
    30
}

fn default_instance_validity_secs() -> u64 {
    24 * 60 * 60
}

fn default_strict_admission() -> bool {
    true
}

fn default_activity_window_days() -> u32 {
    3
}

fn default_status_history_limit() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}
