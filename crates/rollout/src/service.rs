//! The rollout engine handle and the update-granting decision

use std::sync::Arc;

use chrono::Utc;
use roller_config::Config;
use roller_errors::{Error, StateError, UpdateError};
use roller_events::{EventEmitter, EventSender, FailureContext, RolloutEvent};
use roller_state::models::GroupRow;
use roller_state::queries::{groups, instances};
use roller_state::{create_pool_with, run_migrations, PoolSettings};
use roller_types::{
    is_upgrade, ActivityClass, ActivitySeverity, InstanceApplication, InstanceStatus,
    NewActivity, Package,
};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tokio::sync::OwnedMutexGuard;

use crate::locks::AdmissionLocks;
use crate::policy;
use crate::resolver::{GroupTarget, Target};
use crate::settings::RolloutSettings;

/// Handle to the rollout engine. Cheap to clone; clones share the pool and
/// the admission locks.
#[derive(Debug, Clone)]
pub struct Rollout {
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) settings: Arc<RolloutSettings>,
    locks: AdmissionLocks,
    tx: Option<EventSender>,
}

impl EventEmitter for Rollout {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Rollout {
    #[must_use]
    pub fn new(pool: Pool<Sqlite>, settings: RolloutSettings) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
            locks: AdmissionLocks::new(),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Open the configured database, apply migrations and build an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database cannot
    /// be opened or a migration fails.
    pub async fn open(config: &Config) -> Result<Self, Error> {
        let settings = RolloutSettings::from_config(config)?;
        let pool = create_pool_with(
            &config.db_path(),
            PoolSettings {
                max_connections: config.database.max_connections,
                busy_timeout: config.database.busy_timeout(),
            },
        )
        .await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool, settings))
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    #[must_use]
    pub fn settings(&self) -> &RolloutSettings {
        &self.settings
    }

    async fn admission(&self, group_id: &str) -> Option<OwnedMutexGuard<()>> {
        if self.settings.strict_admission {
            Some(self.locks.acquire(group_id).await)
        } else {
            None
        }
    }

    /// Register the instance's check-in and decide whether it may update.
    ///
    /// On success the instance is marked as updating to the returned
    /// package's version.
    ///
    /// # Errors
    ///
    /// Validation errors for malformed input or an application/group
    /// mismatch. An [`UpdateError`] when no update is granted: eligibility
    /// denials first, then policy denials in gate order.
    pub async fn get_update_package(
        &self,
        instance_id: &str,
        ip: &str,
        version: &str,
        application_id: &str,
        group_id: &str,
    ) -> Result<Package, Error> {
        let instance = self
            .register_instance(instance_id, ip, version, application_id, group_id)
            .await?;
        let application = instance
            .application
            .ok_or_else(|| Error::internal("registered instance has no application state"))?;

        let decision = self.decide(&application).await;
        if let Err(Error::Update(denial)) = &decision {
            self.emit_rollout(RolloutEvent::UpdateDenied {
                instance_id: application.instance_id.clone(),
                group_id: application.group_id.clone(),
                failure: FailureContext::from_error(denial),
            });
        }
        decision
    }

    async fn decide(&self, app: &InstanceApplication) -> Result<Package, Error> {
        if app.has_update_in_flight() {
            return Err(UpdateError::UpdateInProgressOnInstance.into());
        }

        let _admission = self.admission(&app.group_id).await;
        let mut conn = self.pool.acquire().await?;
        let target = GroupTarget::load(&mut conn, &app.group_id)
            .await?
            .ok_or_else(|| StateError::not_found("group", &app.group_id))?;

        let package = match target.target() {
            Target::Missing => {
                let activity = NewActivity::new(
                    ActivityClass::PackageNotFound,
                    ActivitySeverity::Warning,
                    "0.0.0",
                    &app.application_id,
                )
                .group(&target.group.id)
                .channel(target.group.channel_id.clone());
                self.record_activity(&mut conn, activity).await;
                return Err(UpdateError::NoPackageFound.into());
            }
            Target::Blacklisted => return Err(UpdateError::NoUpdatePackageAvailable.into()),
            Target::Package(package) => package,
        };
        if !is_upgrade(&app.version, &package.version) {
            return Err(UpdateError::NoUpdatePackageAvailable.into());
        }

        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let group = &target.group;
        let stats = self
            .stats_for(&mut conn, group, &package.version, now_ms)
            .await?;

        if let Err(denial) = policy::evaluate(&group.policy(), &stats, now) {
            self.apply_denial(&mut conn, group, app, &denial).await?;
            return Err(denial.into());
        }

        let granted = instances::grant_update(
            &mut conn,
            &app.instance_id,
            &app.application_id,
            &package.version,
            now_ms,
        )
        .await?;
        if granted == 0 {
            return Err(Error::internal(format!(
                "instance {} vanished while granting an update",
                app.instance_id
            )));
        }

        if stats.granted_current_version == 0 {
            let activity = NewActivity::new(
                ActivityClass::RolloutStarted,
                ActivitySeverity::Info,
                &package.version,
                &app.application_id,
            )
            .group(&group.id)
            .channel(group.channel_id.clone());
            self.record_activity(&mut conn, activity).await;
            self.emit_rollout(RolloutEvent::Started {
                group_id: group.id.clone(),
                version: package.version.clone(),
            });
        }
        groups::set_rollout_in_progress(&mut conn, &group.id, true).await?;
        self.set_status(
            &mut conn,
            &app.instance_id,
            &app.application_id,
            InstanceStatus::UpdateGranted,
        )
        .await?;

        self.emit_rollout(RolloutEvent::UpdateGranted {
            instance_id: app.instance_id.clone(),
            group_id: group.id.clone(),
            from_version: app.version.clone(),
            to_version: package.version.clone(),
        });
        Ok(package.clone())
    }

    async fn apply_denial(
        &self,
        conn: &mut SqliteConnection,
        group: &GroupRow,
        app: &InstanceApplication,
        denial: &UpdateError,
    ) -> Result<(), Error> {
        if *denial == UpdateError::MaxTimedOutUpdatesLimitReached
            && groups::set_updates_enabled(conn, &group.id, false).await?
        {
            self.emit_rollout(RolloutEvent::UpdatesDisabled {
                group_id: group.id.clone(),
                reason: denial.to_string(),
            });
        }
        if denial.holds_instance() {
            self.set_status(
                conn,
                &app.instance_id,
                &app.application_id,
                InstanceStatus::OnHold,
            )
            .await?;
        }
        Ok(())
    }
}
