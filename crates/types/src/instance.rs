//! Instance and per-application instance state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Update status of an instance for one application.
///
/// The integer codes are persisted and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Undefined,
    UpdateGranted,
    Error,
    Complete,
    Installed,
    Downloaded,
    Downloading,
    OnHold,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 8] = [
        Self::Undefined,
        Self::UpdateGranted,
        Self::Error,
        Self::Complete,
        Self::Installed,
        Self::Downloaded,
        Self::Downloading,
        Self::OnHold,
    ];

    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Undefined => 1,
            Self::UpdateGranted => 2,
            Self::Error => 3,
            Self::Complete => 4,
            Self::Installed => 5,
            Self::Downloaded => 6,
            Self::Downloading => 7,
            Self::OnHold => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// An update has been handed out and has not reached a terminal status.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::UpdateGranted | Self::Downloading | Self::Downloaded | Self::Installed
        )
    }

    /// Complete and Error end an update attempt.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::UpdateGranted => "update_granted",
            Self::Error => "error",
            Self::Complete => "complete",
            Self::Installed => "installed",
            Self::Downloaded => "downloaded",
            Self::Downloading => "downloading",
            Self::OnHold => "on_hold",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string() == s)
            .ok_or_else(|| format!("unknown instance status: {s}"))
    }
}

/// A client instance, identified by an opaque id it supplies itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub ip: String,
    pub created_ts: DateTime<Utc>,
    /// State for the application the instance was looked up with.
    pub application: Option<InstanceApplication>,
}

/// State of one instance for one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceApplication {
    pub instance_id: String,
    pub application_id: String,
    pub group_id: String,
    pub version: String,
    pub created_ts: DateTime<Utc>,
    pub status: Option<InstanceStatus>,
    pub last_check_for_updates: DateTime<Utc>,
    pub last_update_granted_ts: Option<DateTime<Utc>>,
    pub last_update_version: Option<String>,
    pub update_in_progress: bool,
}

impl InstanceApplication {
    #[must_use]
    pub fn has_update_in_flight(&self) -> bool {
        self.status.is_some_and(InstanceStatus::is_in_flight)
    }
}

/// One row of an instance's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: InstanceStatus,
    pub version: String,
    pub created_ts: DateTime<Utc>,
}

/// Filters for listing the instances of a group.
#[derive(Debug, Clone, Default)]
pub struct InstancesQuery {
    pub application_id: String,
    pub group_id: String,
    pub status: Option<InstanceStatus>,
    pub version: Option<String>,
    pub page: crate::Page,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in InstanceStatus::ALL {
            assert_eq!(InstanceStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(InstanceStatus::from_code(0), None);
        assert_eq!(InstanceStatus::from_code(9), None);
    }

    #[test]
    fn test_in_flight_statuses() {
        let in_flight: Vec<_> = InstanceStatus::ALL
            .into_iter()
            .filter(|s| s.is_in_flight())
            .collect();
        assert_eq!(
            in_flight,
            vec![
                InstanceStatus::UpdateGranted,
                InstanceStatus::Installed,
                InstanceStatus::Downloaded,
                InstanceStatus::Downloading,
            ]
        );
        assert!(!InstanceStatus::OnHold.is_in_flight());
        assert!(InstanceStatus::Complete.is_terminal());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "on_hold".parse::<InstanceStatus>(),
            Ok(InstanceStatus::OnHold)
        );
        assert!("paused".parse::<InstanceStatus>().is_err());
    }
}
