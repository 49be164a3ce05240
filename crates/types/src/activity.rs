//! Activity log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClass {
    PackageNotFound,
    RolloutStarted,
    RolloutFinished,
    RolloutFailed,
    InstanceUpdateFailed,
    ChannelPackageUpdated,
}

impl ActivityClass {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::PackageNotFound => 1,
            Self::RolloutStarted => 2,
            Self::RolloutFinished => 3,
            Self::RolloutFailed => 4,
            Self::InstanceUpdateFailed => 5,
            Self::ChannelPackageUpdated => 6,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::PackageNotFound),
            2 => Some(Self::RolloutStarted),
            3 => Some(Self::RolloutFinished),
            4 => Some(Self::RolloutFailed),
            5 => Some(Self::InstanceUpdateFailed),
            6 => Some(Self::ChannelPackageUpdated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySeverity {
    Success,
    Info,
    Warning,
    Error,
}

impl ActivitySeverity {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Success => 1,
            Self::Info => 2,
            Self::Warning => 3,
            Self::Error => 4,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Success),
            2 => Some(Self::Info),
            3 => Some(Self::Warning),
            4 => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::str::FromStr for ActivitySeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// A new activity entry. Context ids are optional because not every class
/// relates to a group or an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub class: ActivityClass,
    pub severity: ActivitySeverity,
    pub version: String,
    pub application_id: String,
    pub group_id: Option<String>,
    pub channel_id: Option<String>,
    pub instance_id: Option<String>,
}

impl NewActivity {
    #[must_use]
    pub fn new(
        class: ActivityClass,
        severity: ActivitySeverity,
        version: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Self {
        Self {
            class,
            severity,
            version: version.into(),
            application_id: application_id.into(),
            group_id: None,
            channel_id: None,
            instance_id: None,
        }
    }

    #[must_use]
    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn channel(mut self, channel_id: Option<String>) -> Self {
        self.channel_id = channel_id;
        self
    }

    #[must_use]
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }
}

/// A stored activity entry with the names of its context joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub created_ts: DateTime<Utc>,
    pub class: ActivityClass,
    pub severity: ActivitySeverity,
    pub version: String,
    pub application_id: String,
    pub application_name: Option<String>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub instance_id: Option<String>,
}

/// Filters for reading the activity log. An unset time range covers the
/// configured lookback window ending now.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
    pub application_id: Option<String>,
    pub group_id: Option<String>,
    pub channel_id: Option<String>,
    pub instance_id: Option<String>,
    pub version: Option<String>,
    pub severity: Option<ActivitySeverity>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: Page,
}
