//! Applications, packages, channels and groups

use roller_errors::{Error, StateError, ValidationError};
use roller_state::now_millis;
use roller_state::queries::{catalog, groups};
use roller_types::{
    new_id, normalize_id, parse_version, ActivityClass, ActivitySeverity, Application, Channel,
    Group, NewActivity, NewChannel, NewGroup, NewPackage, Package,
};
use sqlx::SqliteConnection;

use crate::policy;
use crate::Rollout;

async fn require_application(conn: &mut SqliteConnection, id: &str) -> Result<(), Error> {
    match catalog::get_application(conn, id).await? {
        Some(_) => Ok(()),
        None => Err(StateError::not_found("application", id).into()),
    }
}

/// Normalize every id a package refers to and check them against the
/// application.
async fn prepare_package(
    conn: &mut SqliteConnection,
    package: &NewPackage,
) -> Result<NewPackage, Error> {
    parse_version(&package.version)?;
    let mut package = package.clone();
    package.application_id = normalize_id(&package.application_id)?;
    require_application(conn, &package.application_id).await?;

    let mut blacklist = Vec::with_capacity(package.channels_blacklist.len());
    for channel_id in &package.channels_blacklist {
        let channel_id = normalize_id(channel_id)?;
        match catalog::get_channel_row(conn, &channel_id).await? {
            Some(row) if row.application_id == package.application_id => {}
            _ => return Err(ValidationError::InvalidChannel { channel_id }.into()),
        }
        if !blacklist.contains(&channel_id) {
            blacklist.push(channel_id);
        }
    }
    package.channels_blacklist = blacklist;
    Ok(package)
}

/// Normalize a channel's ids and check that its package may be served
/// through it.
async fn prepare_channel(
    conn: &mut SqliteConnection,
    channel_id: Option<&str>,
    channel: &NewChannel,
) -> Result<(NewChannel, Option<Package>), Error> {
    let mut channel = channel.clone();
    channel.application_id = normalize_id(&channel.application_id)?;
    require_application(conn, &channel.application_id).await?;

    let Some(package_id) = channel.package_id.as_deref() else {
        return Ok((channel, None));
    };
    let package_id = normalize_id(package_id)?;
    let package = match catalog::load_package(conn, &package_id).await? {
        Some(package) if package.application_id == channel.application_id => package,
        _ => return Err(ValidationError::InvalidPackage { package_id }.into()),
    };
    if let Some(channel_id) = channel_id {
        if package.is_blacklisted_for(channel_id) {
            return Err(ValidationError::BlacklistedChannel {
                package_id,
                channel_id: channel_id.to_string(),
            }
            .into());
        }
    }
    channel.package_id = Some(package_id);
    Ok((channel, Some(package)))
}

async fn prepare_group(conn: &mut SqliteConnection, group: &NewGroup) -> Result<NewGroup, Error> {
    policy::validate_policy(&group.policy)?;
    let mut group = group.clone();
    group.application_id = normalize_id(&group.application_id)?;
    require_application(conn, &group.application_id).await?;

    if let Some(channel_id) = group.channel_id.as_deref() {
        let channel_id = normalize_id(channel_id)?;
        match catalog::get_channel_row(conn, &channel_id).await? {
            Some(row) if row.application_id == group.application_id => {}
            _ => return Err(ValidationError::InvalidChannel { channel_id }.into()),
        }
        group.channel_id = Some(channel_id);
    }
    Ok(group)
}

impl Rollout {
    /// # Errors
    ///
    /// Returns an error if the application cannot be stored.
    pub async fn add_application(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Application, Error> {
        let id = new_id();
        let mut conn = self.pool.acquire().await?;
        catalog::insert_application(&mut conn, &id, name, description, now_millis()).await?;
        catalog::get_application(&mut conn, &id)
            .await?
            .map(Into::into)
            .ok_or_else(|| StateError::not_found("application", id).into())
    }

    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown application.
    pub async fn get_application(&self, id: &str) -> Result<Application, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        catalog::get_application(&mut conn, &id)
            .await?
            .map(Into::into)
            .ok_or_else(|| StateError::not_found("application", id).into())
    }

    /// Add a package to an application's catalog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSemver` for a malformed version and `InvalidChannel`
    /// for a blacklisted channel of another application.
    pub async fn add_package(&self, package: &NewPackage) -> Result<Package, Error> {
        let id = new_id();
        let mut conn = self.pool.acquire().await?;
        let package = prepare_package(&mut conn, package).await?;

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        catalog::insert_package(&mut tx, &id, &package, now_millis()).await?;
        tx.commit().await?;
        drop(conn);

        self.get_package(&id).await
    }

    /// Update a package. Its application cannot change.
    ///
    /// # Errors
    ///
    /// Returns `BlacklistingChannel` when a channel that currently points
    /// at the package would be blacklisted.
    pub async fn update_package(&self, id: &str, package: &NewPackage) -> Result<Package, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        let existing = catalog::get_package_row(&mut conn, &id)
            .await?
            .ok_or_else(|| StateError::not_found("package", &id))?;

        let mut package = package.clone();
        package.application_id = existing.application_id;
        let package = prepare_package(&mut conn, &package).await?;

        let serving = catalog::channels_with_package(&mut conn, &id).await?;
        if let Some(channel_id) = package
            .channels_blacklist
            .iter()
            .find(|channel_id| serving.contains(channel_id))
        {
            return Err(ValidationError::BlacklistingChannel {
                package_id: id,
                channel_id: channel_id.clone(),
            }
            .into());
        }

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        catalog::update_package(&mut tx, &id, &package).await?;
        tx.commit().await?;
        drop(conn);

        self.get_package(&id).await
    }

    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown package.
    pub async fn get_package(&self, id: &str) -> Result<Package, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        catalog::load_package(&mut conn, &id)
            .await?
            .ok_or_else(|| StateError::not_found("package", id).into())
    }

    /// # Errors
    ///
    /// Returns `InvalidPackage` when the package belongs to another
    /// application.
    pub async fn add_channel(&self, channel: &NewChannel) -> Result<Channel, Error> {
        let id = new_id();
        let mut conn = self.pool.acquire().await?;
        let (channel, _) = prepare_channel(&mut conn, None, channel).await?;
        catalog::insert_channel(&mut conn, &id, &channel, now_millis()).await?;
        drop(conn);
        self.get_channel(&id).await
    }

    /// Update a channel. Pointing it at a new package records a
    /// channel-package-updated activity entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPackage` when the package belongs to another
    /// application and `BlacklistedChannel` when the package blacklists
    /// this channel.
    pub async fn update_channel(&self, id: &str, channel: &NewChannel) -> Result<Channel, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        let existing = catalog::get_channel_row(&mut conn, &id)
            .await?
            .ok_or_else(|| StateError::not_found("channel", &id))?;

        let mut channel = channel.clone();
        channel.application_id = existing.application_id;
        let (channel, package) = prepare_channel(&mut conn, Some(&id), &channel).await?;
        catalog::update_channel(&mut conn, &id, &channel).await?;

        if let Some(package) = package {
            if existing.package_id.as_deref() != Some(package.id.as_str()) {
                let entry = NewActivity::new(
                    ActivityClass::ChannelPackageUpdated,
                    ActivitySeverity::Info,
                    &package.version,
                    &channel.application_id,
                )
                .channel(Some(id.clone()));
                self.record_activity(&mut conn, entry).await;
            }
        }
        drop(conn);
        self.get_channel(&id).await
    }

    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown channel.
    pub async fn get_channel(&self, id: &str) -> Result<Channel, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        catalog::load_channel(&mut conn, &id)
            .await?
            .ok_or_else(|| StateError::not_found("channel", id).into())
    }

    /// # Errors
    ///
    /// Returns `ExpectingValidTimezone` or `InvalidPolicy` for a bad policy
    /// and `InvalidChannel` for a channel of another application.
    pub async fn add_group(&self, group: &NewGroup) -> Result<Group, Error> {
        let id = new_id();
        let mut conn = self.pool.acquire().await?;
        let group = prepare_group(&mut conn, group).await?;
        groups::insert_group(&mut conn, &id, &group, now_millis()).await?;
        drop(conn);
        self.get_group(&id).await
    }

    /// Update a group's name, channel and policy. Its application cannot
    /// change.
    ///
    /// # Errors
    ///
    /// Same as [`Rollout::add_group`].
    pub async fn update_group(&self, id: &str, group: &NewGroup) -> Result<Group, Error> {
        let id = normalize_id(id)?;
        let mut conn = self.pool.acquire().await?;
        let existing = groups::get_group_row(&mut conn, &id)
            .await?
            .ok_or_else(|| StateError::not_found("group", &id))?;

        let mut group = group.clone();
        group.application_id = existing.application_id;
        let group = prepare_group(&mut conn, &group).await?;
        groups::update_group(&mut conn, &id, &group).await?;
        drop(conn);
        self.get_group(&id).await
    }

    /// A group with its channel, package and instance breakdowns.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown group.
    pub async fn get_group(&self, id: &str) -> Result<Group, Error> {
        let id = normalize_id(id)?;
        let active_since = self.settings.active_since(now_millis());
        let mut conn = self.pool.acquire().await?;
        groups::load_group(&mut conn, &id, active_since)
            .await?
            .ok_or_else(|| StateError::not_found("group", id).into())
    }

    /// # Errors
    ///
    /// Returns an error for a malformed id or a failed query.
    pub async fn get_groups(&self, application_id: &str) -> Result<Vec<Group>, Error> {
        let application_id = normalize_id(application_id)?;
        let active_since = self.settings.active_since(now_millis());
        let mut conn = self.pool.acquire().await?;
        let rows = groups::list_group_rows(&mut conn, &application_id).await?;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(groups::assemble_group(&mut conn, row, active_since).await?);
        }
        Ok(result)
    }
}
