//! Database row models and their conversion into domain types

use std::time::Duration;

use chrono::{DateTime, Utc};
use roller_types::{
    Activity, ActivityClass, ActivitySeverity, Application, Channel, CoreosAction, GroupPolicy,
    Instance, InstanceApplication, InstanceStatus, Package, PackageKind, StatusHistoryEntry,
    UpdatesStats,
};
use sqlx::FromRow;

/// Current time as stored in the database.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[must_use]
pub fn to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[must_use]
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_ts: i64,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            created_ts: to_datetime(row.created_ts),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub color: String,
    pub application_id: String,
    pub package_id: Option<String>,
    pub created_ts: i64,
}

impl ChannelRow {
    #[must_use]
    pub fn into_channel(self, package: Option<Package>) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            color: self.color,
            application_id: self.application_id,
            package_id: self.package_id,
            created_ts: to_datetime(self.created_ts),
            package,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PackageRow {
    pub id: String,
    pub application_id: String,
    #[sqlx(rename = "type")]
    pub kind: i64,
    pub version: String,
    pub url: String,
    pub filename: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub hash: Option<String>,
    pub created_ts: i64,
}

impl PackageRow {
    /// Assemble a package. Unknown kind codes fall back to `Other`.
    #[must_use]
    pub fn into_package(self, action: Option<CoreosAction>, blacklist: Vec<String>) -> Package {
        Package {
            kind: PackageKind::from_code(self.kind, action).unwrap_or(PackageKind::Other),
            id: self.id,
            application_id: self.application_id,
            version: self.version,
            url: self.url,
            filename: self.filename,
            description: self.description,
            size: self.size,
            hash: self.hash,
            created_ts: to_datetime(self.created_ts),
            channels_blacklist: blacklist,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CoreosActionRow {
    pub event: String,
    pub chromeos_version: String,
    pub sha256: String,
    pub needs_admin: bool,
    pub is_delta: bool,
    pub disable_payload_backoff: bool,
    pub metadata_signature_rsa: String,
    pub metadata_size: String,
    pub deadline: String,
}

impl From<CoreosActionRow> for CoreosAction {
    fn from(row: CoreosActionRow) -> Self {
        Self {
            event: row.event,
            chromeos_version: row.chromeos_version,
            sha256: row.sha256,
            needs_admin: row.needs_admin,
            is_delta: row.is_delta,
            disable_payload_backoff: row.disable_payload_backoff,
            metadata_signature_rsa: row.metadata_signature_rsa,
            metadata_size: row.metadata_size,
            deadline: row.deadline,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_ts: i64,
    pub application_id: String,
    pub channel_id: Option<String>,
    pub policy_updates_enabled: bool,
    pub policy_safe_mode: bool,
    pub policy_office_hours: bool,
    pub policy_timezone: Option<String>,
    pub policy_period_interval_ms: i64,
    pub policy_max_updates_per_period: i64,
    pub policy_update_timeout_ms: i64,
    pub rollout_in_progress: bool,
}

impl GroupRow {
    #[must_use]
    pub fn policy(&self) -> GroupPolicy {
        GroupPolicy {
            updates_enabled: self.policy_updates_enabled,
            safe_mode: self.policy_safe_mode,
            office_hours: self.policy_office_hours,
            timezone: self.policy_timezone.clone(),
            period_interval: Duration::from_millis(
                u64::try_from(self.policy_period_interval_ms).unwrap_or(0),
            ),
            max_updates_per_period: u32::try_from(self.policy_max_updates_per_period)
                .unwrap_or(u32::MAX),
            update_timeout: Duration::from_millis(
                u64::try_from(self.policy_update_timeout_ms).unwrap_or(0),
            ),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InstanceRow {
    pub id: String,
    pub ip: String,
    pub created_ts: i64,
}

impl InstanceRow {
    #[must_use]
    pub fn into_instance(self, application: Option<InstanceApplication>) -> Instance {
        Instance {
            id: self.id,
            ip: self.ip,
            created_ts: to_datetime(self.created_ts),
            application,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InstanceApplicationRow {
    pub instance_id: String,
    pub application_id: String,
    pub group_id: String,
    pub version: String,
    pub created_ts: i64,
    pub status: Option<i64>,
    pub last_check_for_updates: i64,
    pub last_update_granted_ts: Option<i64>,
    pub last_update_version: Option<String>,
    pub update_in_progress: bool,
}

impl From<InstanceApplicationRow> for InstanceApplication {
    fn from(row: InstanceApplicationRow) -> Self {
        Self {
            instance_id: row.instance_id,
            application_id: row.application_id,
            group_id: row.group_id,
            version: row.version,
            created_ts: to_datetime(row.created_ts),
            status: row.status.and_then(InstanceStatus::from_code),
            last_check_for_updates: to_datetime(row.last_check_for_updates),
            last_update_granted_ts: row.last_update_granted_ts.map(to_datetime),
            last_update_version: row.last_update_version,
            update_in_progress: row.update_in_progress,
        }
    }
}

/// Instance joined with its application row, as returned by listings.
#[derive(Debug, Clone, FromRow)]
pub struct InstanceListingRow {
    pub ip: String,
    pub instance_created_ts: i64,
    #[sqlx(flatten)]
    pub application: InstanceApplicationRow,
}

impl From<InstanceListingRow> for Instance {
    fn from(row: InstanceListingRow) -> Self {
        Instance {
            id: row.application.instance_id.clone(),
            ip: row.ip,
            created_ts: to_datetime(row.instance_created_ts),
            application: Some(row.application.into()),
        }
    }
}

/// Values returned by a status update that changed the row.
#[derive(Debug, Clone, FromRow)]
pub struct StatusUpdateRow {
    pub version: String,
    pub last_update_version: Option<String>,
    pub group_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusHistoryRow {
    pub status: i64,
    pub version: String,
    pub created_ts: i64,
}

impl StatusHistoryRow {
    /// `None` for rows carrying an unknown status code.
    #[must_use]
    pub fn into_entry(self) -> Option<StatusHistoryEntry> {
        Some(StatusHistoryEntry {
            status: InstanceStatus::from_code(self.status)?,
            version: self.version,
            created_ts: to_datetime(self.created_ts),
        })
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct UpdatesStatsRow {
    pub total_instances: i64,
    pub granted_current_version: i64,
    pub attempted_current_version: i64,
    pub succeeded_current_version: i64,
    pub failed_current_version: i64,
    pub granted_in_period: i64,
    pub in_progress: i64,
    pub timed_out: i64,
}

impl From<UpdatesStatsRow> for UpdatesStats {
    fn from(row: UpdatesStatsRow) -> Self {
        Self {
            total_instances: count(row.total_instances),
            granted_current_version: count(row.granted_current_version),
            attempted_current_version: count(row.attempted_current_version),
            succeeded_current_version: count(row.succeeded_current_version),
            failed_current_version: count(row.failed_current_version),
            granted_in_period: count(row.granted_in_period),
            in_progress: count(row.in_progress),
            timed_out: count(row.timed_out),
        }
    }
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct StatusCountsRow {
    pub total: i64,
    pub undefined: i64,
    pub update_granted: i64,
    pub error: i64,
    pub complete: i64,
    pub installed: i64,
    pub downloaded: i64,
    pub downloading: i64,
    pub on_hold: i64,
}

impl From<StatusCountsRow> for roller_types::InstancesStatusStats {
    fn from(row: StatusCountsRow) -> Self {
        Self {
            total: count(row.total),
            undefined: count(row.undefined),
            update_granted: count(row.update_granted),
            error: count(row.error),
            complete: count(row.complete),
            installed: count(row.installed),
            downloaded: count(row.downloaded),
            downloading: count(row.downloading),
            on_hold: count(row.on_hold),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VersionCountRow {
    pub version: String,
    pub instances: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub created_ts: i64,
    pub class: i64,
    pub severity: i64,
    pub version: String,
    pub application_id: String,
    pub application_name: Option<String>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub instance_id: Option<String>,
}

impl ActivityRow {
    /// `None` for rows carrying an unknown class or severity code.
    #[must_use]
    pub fn into_activity(self) -> Option<Activity> {
        Some(Activity {
            id: self.id,
            created_ts: to_datetime(self.created_ts),
            class: ActivityClass::from_code(self.class)?,
            severity: ActivitySeverity::from_code(self.severity)?,
            version: self.version,
            application_id: self.application_id,
            application_name: self.application_name,
            group_id: self.group_id,
            group_name: self.group_name,
            channel_id: self.channel_id,
            channel_name: self.channel_name,
            instance_id: self.instance_id,
        })
    }
}
