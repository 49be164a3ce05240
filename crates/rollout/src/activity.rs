//! Activity log writes and reads

use roller_errors::Error;
use roller_events::EventEmitter;
use roller_state::models::{duration_millis, ActivityRow};
use roller_state::now_millis;
use roller_state::queries::activity;
use roller_types::{normalize_id, Activity, ActivityQuery, NewActivity};
use sqlx::SqliteConnection;

use crate::Rollout;

impl Rollout {
    /// Append to the activity log. Failures are reported as warnings and
    /// never fail the operation that produced the entry.
    pub(crate) async fn record_activity(&self, conn: &mut SqliteConnection, entry: NewActivity) {
        if let Err(err) = activity::insert_activity(conn, &entry, now_millis()).await {
            self.emit_warning_with_context(
                format!("failed to record {:?} activity", entry.class),
                err.to_string(),
            );
        }
    }

    /// Read the activity log, newest first. Without an explicit range the
    /// configured lookback window ending now is used.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed ids or a failed query.
    pub async fn get_activity(&self, query: &ActivityQuery) -> Result<Vec<Activity>, Error> {
        let mut query = query.clone();
        for id in [
            &mut query.application_id,
            &mut query.group_id,
            &mut query.channel_id,
        ] {
            if let Some(value) = id.as_deref() {
                *id = Some(normalize_id(value)?);
            }
        }

        let end = query
            .end
            .map_or_else(now_millis, |end| end.timestamp_millis());
        let start = query.start.map_or_else(
            || end.saturating_sub(duration_millis(self.settings.activity_window)),
            |start| start.timestamp_millis(),
        );

        let mut conn = self.pool.acquire().await?;
        let rows = activity::query_activity(&mut conn, &query, start, end).await?;
        Ok(rows
            .into_iter()
            .filter_map(ActivityRow::into_activity)
            .collect())
    }
}
