//! Activity log and recorded client events

use crate::models::ActivityRow;
use roller_errors::Error;
use roller_types::{ActivityQuery, EventKind, NewActivity};
use sqlx::{query, QueryBuilder, Sqlite, SqliteConnection};

pub async fn insert_activity(
    conn: &mut SqliteConnection,
    activity: &NewActivity,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO activity
            (created_ts, class, severity, version, application_id, group_id, channel_id, instance_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(now)
    .bind(activity.class.code())
    .bind(activity.severity.code())
    .bind(&activity.version)
    .bind(&activity.application_id)
    .bind(activity.group_id.as_deref())
    .bind(activity.channel_id.as_deref())
    .bind(activity.instance_id.as_deref())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Activity entries in `[start, end]`, newest first, with context names
/// joined in.
pub async fn query_activity(
    conn: &mut SqliteConnection,
    filter: &ActivityQuery,
    start: i64,
    end: i64,
) -> Result<Vec<ActivityRow>, Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT a.id, a.created_ts, a.class, a.severity, a.version,
                a.application_id, app.name AS application_name,
                a.group_id, g.name AS group_name,
                a.channel_id, c.name AS channel_name,
                a.instance_id
         FROM activity a
         LEFT JOIN application app ON app.id = a.application_id
         LEFT JOIN groups g ON g.id = a.group_id
         LEFT JOIN channel c ON c.id = a.channel_id
         WHERE a.created_ts >= ",
    );
    builder.push_bind(start);
    builder.push(" AND a.created_ts <= ");
    builder.push_bind(end);

    let text_filters = [
        ("a.application_id", &filter.application_id),
        ("a.group_id", &filter.group_id),
        ("a.channel_id", &filter.channel_id),
        ("a.instance_id", &filter.instance_id),
        ("a.version", &filter.version),
    ];
    for (column, value) in text_filters {
        if let Some(value) = value {
            builder.push(format!(" AND {column} = "));
            builder.push_bind(value.clone());
        }
    }
    if let Some(severity) = filter.severity {
        builder.push(" AND a.severity = ");
        builder.push_bind(severity.code());
    }

    builder.push(" ORDER BY a.created_ts DESC, a.id DESC LIMIT ");
    builder.push_bind(filter.page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(filter.page.offset());

    let rows = builder
        .build_query_as::<ActivityRow>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

/// Store a client-reported event.
pub async fn insert_event(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
    kind: EventKind,
    previous_version: &str,
    error_code: &str,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO event
            (event_type, event_result, previous_version, error_code, created_ts,
             instance_id, application_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(i64::from(kind.event_type.code()))
    .bind(i64::from(kind.result.code()))
    .bind(Some(previous_version).filter(|v| !v.is_empty()))
    .bind(Some(error_code).filter(|v| !v.is_empty()))
    .bind(now)
    .bind(instance_id)
    .bind(application_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Number of events stored for an instance and application.
pub async fn count_events(
    conn: &mut SqliteConnection,
    instance_id: &str,
    application_id: &str,
) -> Result<i64, Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM event WHERE instance_id = ?1 AND application_id = ?2",
    )
    .bind(instance_id)
    .bind(application_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
