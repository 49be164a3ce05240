#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the roller update server
//!
//! This crate provides the domain model shared by the store and the rollout
//! engine: instances and their update status, applications, channels,
//! packages, groups with their rollout policy, activity entries and the
//! lifecycle events instances report.

pub mod activity;
pub mod event;
pub mod group;
pub mod instance;
pub mod package;
pub mod version;

// Re-export commonly used types
pub use activity::{Activity, ActivityClass, ActivityQuery, ActivitySeverity, NewActivity};
pub use event::{EventKind, EventResult, EventType};
pub use group::{
    Group, GroupPolicy, InstancesStatusStats, NewGroup, UpdatesStats, VersionBreakdownEntry,
};
pub use instance::{
    Instance, InstanceApplication, InstanceStatus, InstancesQuery, StatusHistoryEntry,
};
pub use package::{Application, Channel, CoreosAction, NewChannel, NewPackage, Package, PackageKind};
pub use semver::Version;
pub use uuid::Uuid;
pub use version::{compare_versions, is_upgrade, is_valid_version, parse_version};

use roller_errors::ValidationError;
use serde::{Deserialize, Serialize};

/// One-based pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub const DEFAULT_PER_PAGE: u32 = 100;

    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: if per_page == 0 {
                Self::DEFAULT_PER_PAGE
            } else {
                per_page
            },
        }
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page)
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}

/// Normalize an entity id to the lowercase hyphenated UUID form.
///
/// Accepts braced, URN, simple and mixed-case forms.
///
/// # Errors
///
/// Returns `ValidationError::InvalidId` if `input` is not a UUID.
pub fn normalize_id(input: &str) -> Result<String, ValidationError> {
    Uuid::parse_str(input.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| ValidationError::InvalidId {
            input: input.to_string(),
        })
}

/// Generate a fresh entity id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id_forms() {
        let expected = "b110813a-5cd1-4a2f-a07e-6b1a5c5ab1f7";
        assert_eq!(normalize_id(expected).unwrap(), expected);
        assert_eq!(
            normalize_id("{B110813A-5CD1-4A2F-A07E-6B1A5C5AB1F7}").unwrap(),
            expected
        );
        assert_eq!(
            normalize_id("b110813a5cd14a2fa07e6b1a5c5ab1f7").unwrap(),
            expected
        );
        assert!(normalize_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 100);
        let page = Page::new(0, 0);
        assert_eq!(page, Page::default());
        assert_eq!(Page::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_policy_serializes_durations_as_millis() {
        let policy = GroupPolicy {
            period_interval: std::time::Duration::from_millis(100),
            ..GroupPolicy::default()
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["period_interval"], 100);
        let back: GroupPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
    }
}
