//! Applications, channels and packages

use crate::models::{ApplicationRow, ChannelRow, CoreosActionRow, PackageRow};
use roller_errors::{Error, StateError};
use roller_types::{Channel, CoreosAction, NewChannel, NewPackage, Package};
use sqlx::{query, query_as, query_scalar, SqliteConnection};

pub async fn insert_application(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    description: &str,
    now: i64,
) -> Result<(), Error> {
    query("INSERT INTO application (id, name, description, created_ts) VALUES (?1, ?2, ?3, ?4)")
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn get_application(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<ApplicationRow>, Error> {
    let row = query_as::<_, ApplicationRow>(
        "SELECT id, name, description, created_ts FROM application WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn insert_channel(
    conn: &mut SqliteConnection,
    id: &str,
    channel: &NewChannel,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO channel (id, name, color, application_id, package_id, created_ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(id)
    .bind(&channel.name)
    .bind(&channel.color)
    .bind(&channel.application_id)
    .bind(channel.package_id.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Update a channel's name, color and package. The application is immutable.
pub async fn update_channel(
    conn: &mut SqliteConnection,
    id: &str,
    channel: &NewChannel,
) -> Result<(), Error> {
    let result = query("UPDATE channel SET name = ?1, color = ?2, package_id = ?3 WHERE id = ?4")
        .bind(&channel.name)
        .bind(&channel.color)
        .bind(channel.package_id.as_deref())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StateError::NoRowsAffected {
            message: format!("channel {id}"),
        }
        .into());
    }
    Ok(())
}

pub async fn get_channel_row(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<ChannelRow>, Error> {
    let row = query_as::<_, ChannelRow>(
        "SELECT id, name, color, application_id, package_id, created_ts FROM channel WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Load a channel with its package.
pub async fn load_channel(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Channel>, Error> {
    let Some(row) = get_channel_row(conn, id).await? else {
        return Ok(None);
    };
    let package = match row.package_id.as_deref() {
        Some(package_id) => load_package(conn, package_id).await?,
        None => None,
    };
    Ok(Some(row.into_channel(package)))
}

/// Ids of the channels currently pointing at `package_id`.
pub async fn channels_with_package(
    conn: &mut SqliteConnection,
    package_id: &str,
) -> Result<Vec<String>, Error> {
    let ids = query_scalar::<_, String>("SELECT id FROM channel WHERE package_id = ?1")
        .bind(package_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

pub async fn insert_package(
    conn: &mut SqliteConnection,
    id: &str,
    package: &NewPackage,
    now: i64,
) -> Result<(), Error> {
    query(
        "INSERT INTO package
            (id, application_id, type, version, url, filename, description, size, hash, created_ts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(id)
    .bind(&package.application_id)
    .bind(package.kind.code())
    .bind(&package.version)
    .bind(&package.url)
    .bind(package.filename.as_deref())
    .bind(package.description.as_deref())
    .bind(package.size.as_deref())
    .bind(package.hash.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    write_package_extras(conn, id, package).await
}

/// Update a package's fields, blacklist and action. The application is immutable.
pub async fn update_package(
    conn: &mut SqliteConnection,
    id: &str,
    package: &NewPackage,
) -> Result<(), Error> {
    let result = query(
        "UPDATE package
         SET type = ?1, version = ?2, url = ?3, filename = ?4, description = ?5, size = ?6, hash = ?7
         WHERE id = ?8",
    )
    .bind(package.kind.code())
    .bind(&package.version)
    .bind(&package.url)
    .bind(package.filename.as_deref())
    .bind(package.description.as_deref())
    .bind(package.size.as_deref())
    .bind(package.hash.as_deref())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StateError::NoRowsAffected {
            message: format!("package {id}"),
        }
        .into());
    }
    write_package_extras(conn, id, package).await
}

async fn write_package_extras(
    conn: &mut SqliteConnection,
    id: &str,
    package: &NewPackage,
) -> Result<(), Error> {
    query("DELETE FROM package_channel_blacklist WHERE package_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    for channel_id in &package.channels_blacklist {
        query("INSERT INTO package_channel_blacklist (package_id, channel_id) VALUES (?1, ?2)")
            .bind(id)
            .bind(channel_id)
            .execute(&mut *conn)
            .await?;
    }

    match package.kind.coreos_action() {
        Some(action) => upsert_coreos_action(conn, id, action).await,
        None => {
            query("DELETE FROM coreos_action WHERE package_id = ?1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
    }
}

async fn upsert_coreos_action(
    conn: &mut SqliteConnection,
    package_id: &str,
    action: &CoreosAction,
) -> Result<(), Error> {
    query(
        "INSERT INTO coreos_action
            (package_id, event, chromeos_version, sha256, needs_admin, is_delta,
             disable_payload_backoff, metadata_signature_rsa, metadata_size, deadline)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(package_id) DO UPDATE SET
            event = excluded.event,
            chromeos_version = excluded.chromeos_version,
            sha256 = excluded.sha256,
            needs_admin = excluded.needs_admin,
            is_delta = excluded.is_delta,
            disable_payload_backoff = excluded.disable_payload_backoff,
            metadata_signature_rsa = excluded.metadata_signature_rsa,
            metadata_size = excluded.metadata_size,
            deadline = excluded.deadline",
    )
    .bind(package_id)
    .bind(&action.event)
    .bind(&action.chromeos_version)
    .bind(&action.sha256)
    .bind(action.needs_admin)
    .bind(action.is_delta)
    .bind(action.disable_payload_backoff)
    .bind(&action.metadata_signature_rsa)
    .bind(&action.metadata_size)
    .bind(&action.deadline)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_package_row(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<PackageRow>, Error> {
    let row = query_as::<_, PackageRow>(
        "SELECT id, application_id, type, version, url, filename, description, size, hash, created_ts
         FROM package WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Load a package with its blacklist and CoreOS action.
pub async fn load_package(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Package>, Error> {
    let Some(row) = get_package_row(conn, id).await? else {
        return Ok(None);
    };

    let blacklist = query_scalar::<_, String>(
        "SELECT channel_id FROM package_channel_blacklist WHERE package_id = ?1 ORDER BY channel_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let action = query_as::<_, CoreosActionRow>(
        "SELECT event, chromeos_version, sha256, needs_admin, is_delta, disable_payload_backoff,
                metadata_signature_rsa, metadata_size, deadline
         FROM coreos_action WHERE package_id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(CoreosAction::from);

    Ok(Some(row.into_package(action, blacklist)))
}
