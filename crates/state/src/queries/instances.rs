//! Instances, per-application instance state and status history

use crate::models::{
    InstanceApplicationRow, InstanceListingRow, InstanceRow, StatusHistoryRow, StatusUpdateRow,
};
use roller_errors::Error;
use roller_types::{InstanceStatus, InstancesQuery};
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, SqliteConnection};

const INSTANCE_APPLICATION_COLUMNS: &str = "instance_id, application_id, group_id, version,
    created_ts, status, last_check_for_updates, last_update_granted_ts, last_update_version,
    update_in_progress";

/// Create the instance or refresh its IP.
pub async fn upsert_instance(
    conn: &mut SqliteConnection,
    id: &str,
    ip: &str,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO instance (id, ip, created_ts) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET ip = excluded.ip",
    )
    .bind(id)
    .bind(ip)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Create the instance-application row or refresh its group, version and
/// check-in time. Update bookkeeping columns are left alone.
pub async fn upsert_instance_application(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    group_id: &str,
    version: &str,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO instance_application
            (instance_id, application_id, group_id, version, created_ts, last_check_for_updates)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(instance_id, application_id) DO UPDATE SET
            group_id = excluded.group_id,
            version = excluded.version,
            last_check_for_updates = excluded.last_check_for_updates",
    )
    .bind(instance_id)
    .bind(application_id)
    .bind(group_id)
    .bind(version)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_instance(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<InstanceRow>, Error> {
    let row = query_as::<_, InstanceRow>("SELECT id, ip, created_ts FROM instance WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

/// The instance's row for `application_id` if it checked in after
/// `active_since`.
pub async fn get_instance_application(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    active_since: i64,
) -> Result<Option<InstanceApplicationRow>, Error> {
    let row = query_as::<_, InstanceApplicationRow>(&format!(
        "SELECT {INSTANCE_APPLICATION_COLUMNS} FROM instance_application
         WHERE instance_id = ?1 AND application_id = ?2 AND last_check_for_updates > ?3"
    ))
    .bind(instance_id)
    .bind(application_id)
    .bind(active_since)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn instance_application_exists(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
) -> Result<bool, Error> {
    let found = query_scalar::<_, i64>(
        "SELECT 1 FROM instance_application WHERE instance_id = ?1 AND application_id = ?2",
    )
    .bind(instance_id)
    .bind(application_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

/// Record a grant: stamp the grant time and target version and mark the
/// update as in progress.
pub async fn grant_update(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    version: &str,
    now: i64,
) -> Result<u64, Error> {
    let result = query(
        "UPDATE instance_application
         SET last_update_granted_ts = ?1, last_update_version = ?2, update_in_progress = 1
         WHERE instance_id = ?3 AND application_id = ?4",
    )
    .bind(now)
    .bind(version)
    .bind(instance_id)
    .bind(application_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Set the status unless it already has that value.
///
/// Complete promotes `last_update_version` to `version`; Complete and Error
/// end the update in progress. Returns `None` when nothing changed, either
/// because the status was already set or the row does not exist.
pub async fn update_status(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    status: InstanceStatus,
) -> Result<Option<StatusUpdateRow>, Error> {
    let row = query_as::<_, StatusUpdateRow>(
        "UPDATE instance_application SET
            status = ?1,
            version = CASE WHEN ?1 = ?2 THEN COALESCE(last_update_version, version) ELSE version END,
            update_in_progress = CASE WHEN ?1 IN (?2, ?3) THEN 0 ELSE update_in_progress END
         WHERE instance_id = ?4 AND application_id = ?5 AND (status IS NULL OR status <> ?1)
         RETURNING version, last_update_version, group_id",
    )
    .bind(status.code())
    .bind(InstanceStatus::Complete.code())
    .bind(InstanceStatus::Error.code())
    .bind(instance_id)
    .bind(application_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn insert_status_history(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    group_id: &str,
    status: InstanceStatus,
    version: &str,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO instance_status_history
            (status, version, created_ts, instance_id, application_id, group_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(status.code())
    .bind(version)
    .bind(now)
    .bind(instance_id)
    .bind(application_id)
    .bind(group_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Newest first.
pub async fn get_status_history(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    group_id: &str,
    limit: u32,
) -> Result<Vec<StatusHistoryRow>, Error> {
    let rows = query_as::<_, StatusHistoryRow>(
        "SELECT status, version, created_ts FROM instance_status_history
         WHERE instance_id = ?1 AND application_id = ?2 AND group_id = ?3
         ORDER BY created_ts DESC, id DESC
         LIMIT ?4",
    )
    .bind(instance_id)
    .bind(application_id)
    .bind(group_id)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Active instances of a group, filtered and paginated.
pub async fn list_instances(
    conn: &mut SqliteConnection,
    filter: &InstancesQuery,
    active_since: i64,
) -> Result<Vec<InstanceListingRow>, Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT i.ip, i.created_ts AS instance_created_ts,
                ia.instance_id, ia.application_id, ia.group_id, ia.version, ia.created_ts,
                ia.status, ia.last_check_for_updates, ia.last_update_granted_ts,
                ia.last_update_version, ia.update_in_progress
         FROM instance_application ia
         JOIN instance i ON i.id = ia.instance_id
         WHERE ia.application_id = ",
    );
    builder.push_bind(&filter.application_id);
    builder.push(" AND ia.group_id = ");
    builder.push_bind(&filter.group_id);
    builder.push(" AND ia.last_check_for_updates > ");
    builder.push_bind(active_since);
    if let Some(status) = filter.status {
        builder.push(" AND ia.status = ");
        builder.push_bind(status.code());
    }
    if let Some(version) = &filter.version {
        builder.push(" AND ia.version = ");
        builder.push_bind(version);
    }
    builder.push(" ORDER BY ia.created_ts DESC, ia.instance_id LIMIT ");
    builder.push_bind(filter.page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(filter.page.offset());

    let rows = builder
        .build_query_as::<InstanceListingRow>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}
