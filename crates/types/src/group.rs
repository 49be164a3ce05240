//! Groups, rollout policy and rollout statistics

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::package::Channel;

/// Rollout policy of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPolicy {
    pub updates_enabled: bool,
    /// Only one instance may be updated until the first attempt at a version
    /// has finished.
    pub safe_mode: bool,
    /// Restrict grants to Monday to Friday, 09:00 to 17:00 in `timezone`.
    pub office_hours: bool,
    pub timezone: Option<String>,
    #[serde(with = "crate::duration_millis")]
    pub period_interval: Duration,
    pub max_updates_per_period: u32,
    #[serde(with = "crate::duration_millis")]
    pub update_timeout: Duration,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            updates_enabled: true,
            safe_mode: true,
            office_hours: false,
            timezone: None,
            period_interval: Duration::from_secs(15 * 60),
            max_updates_per_period: 2,
            update_timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// A set of instances of one application that share a channel and a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_ts: DateTime<Utc>,
    pub application_id: String,
    pub channel_id: Option<String>,
    pub policy: GroupPolicy,
    pub rollout_in_progress: bool,
    pub channel: Option<Channel>,
    pub instances_stats: InstancesStatusStats,
    pub version_breakdown: Vec<VersionBreakdownEntry>,
}

/// Input for creating or updating a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub application_id: String,
    pub channel_id: Option<String>,
    pub policy: GroupPolicy,
}

/// Live counters for a group's rollout of one target version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatesStats {
    pub total_instances: u32,
    pub granted_current_version: u32,
    pub attempted_current_version: u32,
    pub succeeded_current_version: u32,
    pub failed_current_version: u32,
    pub granted_in_period: u32,
    pub in_progress: u32,
    pub timed_out: u32,
}

/// Number of active instances per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancesStatusStats {
    pub total: u32,
    pub undefined: u32,
    pub update_granted: u32,
    pub error: u32,
    pub complete: u32,
    pub installed: u32,
    pub downloaded: u32,
    pub downloading: u32,
    pub on_hold: u32,
}

/// Share of a group's active instances running `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionBreakdownEntry {
    pub version: String,
    pub instances: u32,
    pub percentage: f64,
}
