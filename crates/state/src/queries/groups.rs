//! Groups and their rollout flags

use std::cmp::Ordering;

use crate::models::{duration_millis, GroupRow};
use crate::queries::{catalog, stats};
use roller_errors::{Error, StateError};
use roller_types::{Group, NewGroup};
use sqlx::{query, query_as, query_scalar, SqliteConnection};

const GROUP_COLUMNS: &str = "id, name, description, created_ts, application_id, channel_id,
    policy_updates_enabled, policy_safe_mode, policy_office_hours, policy_timezone,
    policy_period_interval_ms, policy_max_updates_per_period, policy_update_timeout_ms,
    rollout_in_progress";

pub async fn insert_group(
    conn: &mut SqliteConnection,
    id: &str,
    group: &NewGroup,
    now: i64,
) -> Result<(), Error> {
    let policy = &group.policy;
    query(
        "INSERT INTO groups
            (id, name, description, created_ts, application_id, channel_id,
             policy_updates_enabled, policy_safe_mode, policy_office_hours, policy_timezone,
             policy_period_interval_ms, policy_max_updates_per_period, policy_update_timeout_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(id)
    .bind(&group.name)
    .bind(&group.description)
    .bind(now)
    .bind(&group.application_id)
    .bind(group.channel_id.as_deref())
    .bind(policy.updates_enabled)
    .bind(policy.safe_mode)
    .bind(policy.office_hours)
    .bind(policy.timezone.as_deref())
    .bind(duration_millis(policy.period_interval))
    .bind(i64::from(policy.max_updates_per_period))
    .bind(duration_millis(policy.update_timeout))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update a group's name, channel and policy. The application and the
/// rollout flag are not touched.
pub async fn update_group(
    conn: &mut SqliteConnection,
    id: &str,
    group: &NewGroup,
) -> Result<(), Error> {
    let policy = &group.policy;
    let result = query(
        "UPDATE groups SET
            name = ?1, description = ?2, channel_id = ?3,
            policy_updates_enabled = ?4, policy_safe_mode = ?5, policy_office_hours = ?6,
            policy_timezone = ?7, policy_period_interval_ms = ?8,
            policy_max_updates_per_period = ?9, policy_update_timeout_ms = ?10
         WHERE id = ?11",
    )
    .bind(&group.name)
    .bind(&group.description)
    .bind(group.channel_id.as_deref())
    .bind(policy.updates_enabled)
    .bind(policy.safe_mode)
    .bind(policy.office_hours)
    .bind(policy.timezone.as_deref())
    .bind(duration_millis(policy.period_interval))
    .bind(i64::from(policy.max_updates_per_period))
    .bind(duration_millis(policy.update_timeout))
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StateError::NoRowsAffected {
            message: format!("group {id}"),
        }
        .into());
    }
    Ok(())
}

pub async fn get_group_row(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<GroupRow>, Error> {
    let row = query_as::<_, GroupRow>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn list_group_rows(
    conn: &mut SqliteConnection,
    application_id: &str,
) -> Result<Vec<GroupRow>, Error> {
    let rows = query_as::<_, GroupRow>(&format!(
        "SELECT {GROUP_COLUMNS} FROM groups WHERE application_id = ?1 ORDER BY name"
    ))
    .bind(application_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Application owning `group_id`, if the group exists.
pub async fn group_application(
    conn: &mut SqliteConnection,
    group_id: &str,
) -> Result<Option<String>, Error> {
    let app = query_scalar::<_, String>("SELECT application_id FROM groups WHERE id = ?1")
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(app)
}

/// Load a group with its channel, package and instance breakdowns over the
/// instances that checked in after `active_since`.
pub async fn load_group(
    conn: &mut SqliteConnection,
    id: &str,
    active_since: i64,
) -> Result<Option<Group>, Error> {
    let Some(row) = get_group_row(conn, id).await? else {
        return Ok(None);
    };
    Ok(Some(assemble_group(conn, row, active_since).await?))
}

pub async fn assemble_group(
    conn: &mut SqliteConnection,
    row: GroupRow,
    active_since: i64,
) -> Result<Group, Error> {
    let channel = match row.channel_id.as_deref() {
        Some(channel_id) => catalog::load_channel(conn, channel_id).await?,
        None => None,
    };
    let instances_stats = stats::instances_status_stats(conn, &row.id, active_since).await?;
    let mut version_breakdown = stats::version_breakdown(conn, &row.id, active_since).await?;
    version_breakdown.sort_by(|a, b| {
        match (
            roller_types::Version::parse(&a.version),
            roller_types::Version::parse(&b.version),
        ) {
            (Ok(va), Ok(vb)) => roller_types::version::precedence(&vb, &va),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => b.version.cmp(&a.version),
        }
    });

    let policy = row.policy();
    Ok(Group {
        id: row.id,
        name: row.name,
        description: row.description,
        created_ts: crate::models::to_datetime(row.created_ts),
        application_id: row.application_id,
        channel_id: row.channel_id,
        policy,
        rollout_in_progress: row.rollout_in_progress,
        channel,
        instances_stats,
        version_breakdown,
    })
}

/// Set the group's updates flag. Returns whether the flag changed.
pub async fn set_updates_enabled(
    conn: &mut SqliteConnection,
    id: &str,
    enabled: bool,
) -> Result<bool, Error> {
    let result = query(
        "UPDATE groups SET policy_updates_enabled = ?1 WHERE id = ?2 AND policy_updates_enabled <> ?1",
    )
    .bind(enabled)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Set the group's rollout flag. Returns whether the flag changed.
pub async fn set_rollout_in_progress(
    conn: &mut SqliteConnection,
    id: &str,
    in_progress: bool,
) -> Result<bool, Error> {
    let result = query(
        "UPDATE groups SET rollout_in_progress = ?1 WHERE id = ?2 AND rollout_in_progress <> ?1",
    )
    .bind(in_progress)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
