#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(
    clippy::needless_raw_string_hashes,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::too_many_arguments
)]
#![allow(clippy::module_name_repetitions)]

//! Persistence for roller
//!
//! This crate owns the `SQLite` schema (catalog, instances, status history,
//! client events and the activity log) and the runtime queries the rollout
//! engine runs against it. Timestamps are stored as UTC epoch milliseconds.

pub mod models;
pub mod queries;

pub use models::{now_millis, to_datetime};
pub use queries::stats::StatsWindow;

use roller_errors::Error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }
}

/// Create a new `SQLite` connection pool with default settings
///
/// # Errors
///
/// Returns an error if the database connection fails or configuration is invalid.
pub async fn create_pool(db_path: &Path) -> Result<Pool<Sqlite>, Error> {
    create_pool_with(db_path, PoolSettings::default()).await
}

/// Create a new `SQLite` connection pool
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// database connection fails.
pub async fn create_pool_with(
    db_path: &Path,
    settings: PoolSettings,
) -> Result<Pool<Sqlite>, Error> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout)
        .pragma("synchronous", "NORMAL")
        .pragma("temp_store", "MEMORY");

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            Error::from(roller_errors::StateError::DatabaseError {
                message: e.to_string(),
            })
        })?;

    Ok(pool)
}

/// Run database migrations
///
/// # Errors
///
/// Returns an error if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        roller_errors::StateError::MigrationFailed {
            message: e.to_string(),
        }
        .into()
    })
}
