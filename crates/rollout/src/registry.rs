//! Instance registration, status tracking and instance reads

use roller_errors::{Error, StateError, ValidationError};
use roller_events::{EventEmitter, InstanceEvent};
use roller_state::models::StatusHistoryRow;
use roller_state::now_millis;
use roller_state::queries::{groups, instances};
use roller_types::{
    normalize_id, parse_version, Instance, InstanceStatus, InstancesQuery, StatusHistoryEntry,
};
use sqlx::{Connection, SqliteConnection};

use crate::Rollout;

impl Rollout {
    /// Normalize the application and group ids and check that the group
    /// belongs to the application. For the builtin application a track name
    /// is accepted in place of the group id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidApplicationOrGroup` otherwise.
    pub async fn validate_application_and_group(
        &self,
        application_id: &str,
        group_id: &str,
    ) -> Result<(String, String), Error> {
        let invalid = |_| ValidationError::InvalidApplicationOrGroup;
        let application_id = normalize_id(application_id).map_err(invalid)?;
        let group_id = match &self.settings.builtin {
            Some(builtin) => builtin.resolve_group(&application_id, group_id),
            None => group_id,
        };
        let group_id = normalize_id(group_id).map_err(invalid)?;

        let mut conn = self.pool.acquire().await?;
        match groups::group_application(&mut conn, &group_id).await? {
            Some(owner) if owner == application_id => Ok((application_id, group_id)),
            _ => Err(ValidationError::InvalidApplicationOrGroup.into()),
        }
    }

    /// Create or refresh an instance and its per-application state.
    ///
    /// Re-registering moves the instance to the given group and records the
    /// reported version and check-in time. Status and update bookkeeping
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSemver` for a malformed version, `InvalidInstance`
    /// for an empty instance id and `InvalidApplicationOrGroup` when the
    /// group does not belong to the application.
    pub async fn register_instance(
        &self,
        instance_id: &str,
        ip: &str,
        version: &str,
        application_id: &str,
        group_id: &str,
    ) -> Result<Instance, Error> {
        parse_version(version)?;
        if instance_id.trim().is_empty() {
            return Err(ValidationError::InvalidInstance {
                instance_id: instance_id.to_string(),
            }
            .into());
        }
        let (application_id, group_id) = self
            .validate_application_and_group(application_id, group_id)
            .await?;

        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        instances::upsert_instance(&mut tx, instance_id, ip, now).await?;
        instances::upsert_instance_application(
            &mut tx,
            instance_id,
            &application_id,
            &group_id,
            version,
            now,
        )
        .await?;
        let instance = instances::get_instance(&mut tx, instance_id)
            .await?
            .ok_or_else(|| Error::internal(format!("instance {instance_id} missing after upsert")))?;
        let application =
            instances::get_instance_application(&mut tx, instance_id, &application_id, i64::MIN)
                .await?;
        tx.commit().await?;

        self.emit_instance(InstanceEvent::Registered {
            instance_id: instance_id.to_string(),
            application_id,
            group_id,
            version: version.to_string(),
        });
        Ok(instance.into_instance(application.map(Into::into)))
    }

    /// Set an instance's status for an application and record it in the
    /// status history. Setting the current status again is a no-op.
    ///
    /// Returns whether the status changed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` when the instance has no state for the
    /// application.
    pub async fn update_instance_status(
        &self,
        instance_id: &str,
        application_id: &str,
        status: InstanceStatus,
    ) -> Result<bool, Error> {
        let application_id = normalize_id(application_id)?;
        let mut conn = self.pool.acquire().await?;
        self.set_status(&mut conn, instance_id, &application_id, status)
            .await
    }

    pub(crate) async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        instance_id: &str,
        application_id: &str,
        status: InstanceStatus,
    ) -> Result<bool, Error> {
        let now = now_millis();
        let mut tx = conn.begin().await?;
        let Some(updated) =
            instances::update_status(&mut tx, instance_id, application_id, status).await?
        else {
            let exists =
                instances::instance_application_exists(&mut tx, instance_id, application_id)
                    .await?;
            tx.rollback().await?;
            return if exists {
                Ok(false)
            } else {
                Err(ValidationError::InvalidInstance {
                    instance_id: instance_id.to_string(),
                }
                .into())
            };
        };

        let version = updated
            .last_update_version
            .as_deref()
            .unwrap_or(&updated.version);
        instances::insert_status_history(
            &mut tx,
            instance_id,
            application_id,
            &updated.group_id,
            status,
            version,
            now,
        )
        .await?;
        tx.commit().await?;

        self.emit_instance(InstanceEvent::StatusChanged {
            instance_id: instance_id.to_string(),
            application_id: application_id.to_string(),
            status,
        });
        Ok(true)
    }

    /// An instance with its state for `application_id`. The state is `None`
    /// when the instance has not checked in within the validity window.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown instance.
    pub async fn get_instance(
        &self,
        instance_id: &str,
        application_id: &str,
    ) -> Result<Instance, Error> {
        let application_id = normalize_id(application_id)?;
        let active_since = self.settings.active_since(now_millis());
        let mut conn = self.pool.acquire().await?;
        let instance = instances::get_instance(&mut conn, instance_id)
            .await?
            .ok_or_else(|| StateError::not_found("instance", instance_id))?;
        let application = instances::get_instance_application(
            &mut conn,
            instance_id,
            &application_id,
            active_since,
        )
        .await?;
        Ok(instance.into_instance(application.map(Into::into)))
    }

    /// Active instances of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed ids or a failed query.
    pub async fn get_instances(&self, query: &InstancesQuery) -> Result<Vec<Instance>, Error> {
        let mut query = query.clone();
        query.application_id = normalize_id(&query.application_id)?;
        query.group_id = normalize_id(&query.group_id)?;

        let active_since = self.settings.active_since(now_millis());
        let mut conn = self.pool.acquire().await?;
        let rows = instances::list_instances(&mut conn, &query, active_since).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The most recent status changes of an instance in a group, newest
    /// first. `limit` defaults to the configured history length.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed ids or a failed query.
    pub async fn get_instance_status_history(
        &self,
        instance_id: &str,
        application_id: &str,
        group_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<StatusHistoryEntry>, Error> {
        let application_id = normalize_id(application_id)?;
        let group_id = normalize_id(group_id)?;
        let limit = limit.unwrap_or(self.settings.status_history_limit);

        let mut conn = self.pool.acquire().await?;
        let rows = instances::get_status_history(
            &mut conn,
            instance_id,
            &application_id,
            &group_id,
            limit,
        )
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(StatusHistoryRow::into_entry)
            .collect())
    }
}
