//! Client event intake and its consequences

use roller_errors::{Error, ValidationError};
use roller_events::{EventEmitter, InstanceEvent, RolloutEvent};
use roller_state::now_millis;
use roller_state::queries::{activity, groups, instances};
use roller_types::{
    ActivityClass, ActivitySeverity, EventKind, EventResult, EventType, InstanceApplication,
    InstanceStatus, NewActivity,
};
use sqlx::SqliteConnection;

use crate::resolver::{GroupTarget, Target};
use crate::Rollout;

/// An event as reported by an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventReport {
    pub instance_id: String,
    pub application_id: String,
    pub group_id: String,
    pub event_type: u32,
    pub event_result: u32,
    /// Version the instance ran before the update. Empty if unknown.
    pub previous_version: String,
    pub error_code: String,
}

impl Rollout {
    /// Record an event reported by an instance that has an update in
    /// flight and apply its consequences to the instance status and the
    /// group's rollout state.
    ///
    /// # Errors
    ///
    /// Validation errors for an unknown application/group or instance, an
    /// instance without an update in progress, an unknown event pair, or an
    /// event the builtin distribution ignores.
    pub async fn register_event(&self, report: &EventReport) -> Result<(), Error> {
        let (application_id, _) = self
            .validate_application_and_group(&report.application_id, &report.group_id)
            .await?;
        let instance_id = report.instance_id.as_str();

        let mut conn = self.pool.acquire().await?;
        let active_since = self.settings.active_since(now_millis());
        let app: InstanceApplication = instances::get_instance_application(
            &mut conn,
            instance_id,
            &application_id,
            active_since,
        )
        .await?
        .ok_or_else(|| ValidationError::InvalidInstance {
            instance_id: instance_id.to_string(),
        })?
        .into();

        if !app.update_in_progress {
            return Err(ValidationError::NoUpdateInProgress {
                instance_id: instance_id.to_string(),
            }
            .into());
        }

        let kind = EventKind::from_codes(report.event_type, report.event_result)?;

        if let Some(reason) = self.settings.builtin.as_ref().and_then(|builtin| {
            builtin.ignored_event(&application_id, kind, &report.previous_version, &app.version)
        }) {
            self.emit_instance(InstanceEvent::EventIgnored {
                instance_id: instance_id.to_string(),
                reason: reason.clone(),
            });
            return Err(ValidationError::EventIgnored { reason }.into());
        }

        activity::insert_event(
            &mut conn,
            instance_id,
            &application_id,
            kind,
            &report.previous_version,
            &report.error_code,
            now_millis(),
        )
        .await?;
        self.emit_instance(InstanceEvent::EventReported {
            instance_id: instance_id.to_string(),
            application_id: application_id.clone(),
            kind,
        });

        self.apply_event(&mut conn, &app, kind).await
    }

    async fn apply_event(
        &self,
        conn: &mut SqliteConnection,
        app: &InstanceApplication,
        kind: EventKind,
    ) -> Result<(), Error> {
        let status = match (kind.event_type, kind.result) {
            (EventType::UpdateComplete, EventResult::SuccessReboot) => InstanceStatus::Complete,
            (EventType::DownloadStarted, EventResult::Success) => InstanceStatus::Downloading,
            (EventType::DownloadFinished, EventResult::Success) => InstanceStatus::Downloaded,
            (EventType::Installed, EventResult::Success) => InstanceStatus::Installed,
            (_, EventResult::Failed) => InstanceStatus::Error,
            _ => return Ok(()),
        };
        self.set_status(conn, &app.instance_id, &app.application_id, status)
            .await?;

        match status {
            InstanceStatus::Complete => self.check_rollout_finished(conn, app).await,
            InstanceStatus::Error => self.record_update_failure(conn, app).await,
            _ => Ok(()),
        }
    }

    async fn check_rollout_finished(
        &self,
        conn: &mut SqliteConnection,
        app: &InstanceApplication,
    ) -> Result<(), Error> {
        let group_id = app.group_id.as_str();
        let Some(target) = GroupTarget::load(conn, group_id).await? else {
            return Ok(());
        };
        let Target::Package(package) = target.target() else {
            return Ok(());
        };
        let stats = self
            .stats_for(conn, &target.group, &package.version, now_millis())
            .await?;
        if stats.succeeded_current_version != stats.total_instances {
            return Ok(());
        }
        if groups::set_rollout_in_progress(conn, group_id, false).await? {
            let version = app.last_update_version.as_deref().unwrap_or(&package.version);
            let entry = NewActivity::new(
                ActivityClass::RolloutFinished,
                ActivitySeverity::Success,
                version,
                &app.application_id,
            )
            .group(group_id)
            .channel(target.group.channel_id.clone());
            self.record_activity(conn, entry).await;
            self.emit_rollout(RolloutEvent::Finished {
                group_id: group_id.to_string(),
                version: version.to_string(),
            });
        }
        Ok(())
    }

    async fn record_update_failure(
        &self,
        conn: &mut SqliteConnection,
        app: &InstanceApplication,
    ) -> Result<(), Error> {
        let group_id = app.group_id.as_str();
        let version = app.last_update_version.clone().unwrap_or_default();
        let Some(target) = GroupTarget::load(conn, group_id).await? else {
            return Ok(());
        };
        let entry = NewActivity::new(
            ActivityClass::InstanceUpdateFailed,
            ActivitySeverity::Error,
            &version,
            &app.application_id,
        )
        .group(group_id)
        .channel(target.group.channel_id.clone())
        .instance(&app.instance_id);
        self.record_activity(conn, entry).await;

        // Only a failure counted against the group's current target can stop
        // its rollout.
        let Target::Package(package) = target.target() else {
            return Ok(());
        };
        let stats = self
            .stats_for(conn, &target.group, &package.version, now_millis())
            .await?;
        if stats.attempted_current_version != 1 {
            return Ok(());
        }
        let version = package.version.clone();

        // The first attempt at the target version failed: stop the rollout.
        if groups::set_updates_enabled(conn, group_id, false).await? {
            self.emit_rollout(RolloutEvent::UpdatesDisabled {
                group_id: group_id.to_string(),
                reason: format!("first update to {version} failed"),
            });
        }
        groups::set_rollout_in_progress(conn, group_id, false).await?;
        let entry = NewActivity::new(
            ActivityClass::RolloutFailed,
            ActivitySeverity::Error,
            &version,
            &app.application_id,
        )
        .group(group_id)
        .channel(target.group.channel_id.clone());
        self.record_activity(conn, entry).await;
        self.emit_rollout(RolloutEvent::Failed {
            group_id: group_id.to_string(),
            version,
        });
        Ok(())
    }
}
