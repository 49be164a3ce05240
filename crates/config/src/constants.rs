//! Fixed names shared by the config loader and the binary

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "roller";

pub const CONFIG_FILE: &str = "config.toml";

pub const DB_FILE: &str = "roller.sqlite";

pub const ENV_DB_PATH: &str = "ROLLER_DB_PATH";
pub const ENV_DB_MAX_CONNECTIONS: &str = "ROLLER_DB_MAX_CONNECTIONS";
pub const ENV_INSTANCE_VALIDITY_SECS: &str = "ROLLER_INSTANCE_VALIDITY_SECS";
pub const ENV_STRICT_ADMISSION: &str = "ROLLER_STRICT_ADMISSION";
pub const ENV_BUILTIN_APP_ID: &str = "ROLLER_BUILTIN_APP_ID";
pub const ENV_LOG_LEVEL: &str = "ROLLER_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "ROLLER_LOG_JSON";
