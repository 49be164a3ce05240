//! Aggregate reads over a group's active instances

use crate::models::{StatusCountsRow, UpdatesStatsRow, VersionCountRow};
use roller_errors::Error;
use roller_types::{InstancesStatusStats, UpdatesStats, VersionBreakdownEntry};
use sqlx::{query_as, SqliteConnection};

/// Window parameters for [`updates_stats`], all in epoch milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct StatsWindow {
    pub now: i64,
    /// Instances that last checked in at or before this instant are ignored.
    pub active_since: i64,
    pub period_interval: i64,
    pub update_timeout: i64,
}

/// Rollout counters for `target_version` in one statement, so every
/// counter comes from the same snapshot.
pub async fn updates_stats(
    conn: &mut SqliteConnection,
    group_id: &str,
    target_version: &str,
    window: StatsWindow,
) -> Result<UpdatesStats, Error> {
    let row = query_as::<_, UpdatesStatsRow>(
        "SELECT
            COUNT(*) AS total_instances,
            COALESCE(SUM(CASE WHEN last_update_version = ?1 THEN 1 ELSE 0 END), 0)
                AS granted_current_version,
            COALESCE(SUM(CASE WHEN last_update_version = ?1 AND update_in_progress = 0
                THEN 1 ELSE 0 END), 0) AS attempted_current_version,
            COALESCE(SUM(CASE WHEN last_update_version = ?1 AND update_in_progress = 0
                AND version = last_update_version THEN 1 ELSE 0 END), 0)
                AS succeeded_current_version,
            COALESCE(SUM(CASE WHEN last_update_version = ?1 AND update_in_progress = 0
                AND version <> last_update_version THEN 1 ELSE 0 END), 0)
                AS failed_current_version,
            COALESCE(SUM(CASE WHEN last_update_granted_ts > ?2 - ?3 THEN 1 ELSE 0 END), 0)
                AS granted_in_period,
            COALESCE(SUM(CASE WHEN update_in_progress = 1
                AND ?2 - last_update_granted_ts <= ?4 THEN 1 ELSE 0 END), 0) AS in_progress,
            COALESCE(SUM(CASE WHEN update_in_progress = 1
                AND ?2 - last_update_granted_ts > ?4 THEN 1 ELSE 0 END), 0) AS timed_out
         FROM instance_application
         WHERE group_id = ?5 AND last_check_for_updates > ?6",
    )
    .bind(target_version)
    .bind(window.now)
    .bind(window.period_interval)
    .bind(window.update_timeout)
    .bind(group_id)
    .bind(window.active_since)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Number of active instances per status. A missing status counts as
/// undefined.
pub async fn instances_status_stats(
    conn: &mut SqliteConnection,
    group_id: &str,
    active_since: i64,
) -> Result<InstancesStatusStats, Error> {
    let row = query_as::<_, StatusCountsRow>(
        "SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN status IS NULL OR status = 1 THEN 1 ELSE 0 END), 0) AS undefined,
            COALESCE(SUM(CASE WHEN status = 2 THEN 1 ELSE 0 END), 0) AS update_granted,
            COALESCE(SUM(CASE WHEN status = 3 THEN 1 ELSE 0 END), 0) AS error,
            COALESCE(SUM(CASE WHEN status = 4 THEN 1 ELSE 0 END), 0) AS complete,
            COALESCE(SUM(CASE WHEN status = 5 THEN 1 ELSE 0 END), 0) AS installed,
            COALESCE(SUM(CASE WHEN status = 6 THEN 1 ELSE 0 END), 0) AS downloaded,
            COALESCE(SUM(CASE WHEN status = 7 THEN 1 ELSE 0 END), 0) AS downloading,
            COALESCE(SUM(CASE WHEN status = 8 THEN 1 ELSE 0 END), 0) AS on_hold
         FROM instance_application
         WHERE group_id = ?1 AND last_check_for_updates > ?2",
    )
    .bind(group_id)
    .bind(active_since)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Active instances per reported version, unsorted.
pub async fn version_breakdown(
    conn: &mut SqliteConnection,
    group_id: &str,
    active_since: i64,
) -> Result<Vec<VersionBreakdownEntry>, Error> {
    let rows = query_as::<_, VersionCountRow>(
        "SELECT version, COUNT(*) AS instances
         FROM instance_application
         WHERE group_id = ?1 AND last_check_for_updates > ?2
         GROUP BY version",
    )
    .bind(group_id)
    .bind(active_since)
    .fetch_all(&mut *conn)
    .await?;

    let total: i64 = rows.iter().map(|row| row.instances).sum();
    Ok(rows
        .into_iter()
        .map(|row| VersionBreakdownEntry {
            percentage: if total == 0 {
                0.0
            } else {
                row.instances as f64 * 100.0 / total as f64
            },
            instances: u32::try_from(row.instances).unwrap_or(0),
            version: row.version,
        })
        .collect())
}
