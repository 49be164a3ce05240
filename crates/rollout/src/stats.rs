//! Rollout counters over a group's active instances

use roller_errors::{Error, StateError};
use roller_state::models::{duration_millis, GroupRow};
use roller_state::queries::{groups, stats};
use roller_state::{now_millis, StatsWindow};
use roller_types::{GroupPolicy, UpdatesStats};
use sqlx::SqliteConnection;

use crate::Rollout;

impl Rollout {
    pub(crate) fn stats_window(&self, policy: &GroupPolicy, now_ms: i64) -> StatsWindow {
        StatsWindow {
            now: now_ms,
            active_since: self.settings.active_since(now_ms),
            period_interval: duration_millis(policy.period_interval),
            update_timeout: duration_millis(policy.update_timeout),
        }
    }

    pub(crate) async fn stats_for(
        &self,
        conn: &mut SqliteConnection,
        group: &GroupRow,
        target_version: &str,
        now_ms: i64,
    ) -> Result<UpdatesStats, Error> {
        let window = self.stats_window(&group.policy(), now_ms);
        stats::updates_stats(conn, &group.id, target_version, window).await
    }

    /// Rollout counters of a group for `target_version`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown group.
    pub async fn get_group_updates_stats(
        &self,
        group_id: &str,
        target_version: &str,
    ) -> Result<UpdatesStats, Error> {
        let group_id = roller_types::normalize_id(group_id)?;
        let mut conn = self.pool.acquire().await?;
        let group = groups::get_group_row(&mut conn, &group_id)
            .await?
            .ok_or_else(|| StateError::not_found("group", &group_id))?;
        self.stats_for(&mut conn, &group, target_version, now_millis())
            .await
    }
}
