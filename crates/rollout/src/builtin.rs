//! The builtin distribution
//!
//! One application can be declared builtin in the configuration. Its
//! updater reports Complete/SuccessReboot once after installing and again
//! after rebooting into the new version; only the second report counts. Its
//! groups may also be addressed by track name instead of id.

use std::collections::BTreeMap;

use roller_config::BuiltinConfig;
use roller_errors::Error;
use roller_types::{normalize_id, EventKind, EventResult, EventType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDistribution {
    app_id: String,
    groups: BTreeMap<String, String>,
}

impl BuiltinDistribution {
    /// # Errors
    ///
    /// Returns an error if a configured id is not a UUID.
    pub fn new(app_id: &str, groups: &BTreeMap<String, String>) -> Result<Self, Error> {
        let groups = groups
            .iter()
            .map(|(name, id)| Ok((name.clone(), normalize_id(id)?)))
            .collect::<Result<_, Error>>()?;
        Ok(Self {
            app_id: normalize_id(app_id)?,
            groups,
        })
    }

    /// `None` when no builtin application is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured id is not a UUID.
    pub fn from_config(config: &BuiltinConfig) -> Result<Option<Self>, Error> {
        config
            .app_id
            .as_deref()
            .map(|app_id| Self::new(app_id, &config.groups))
            .transpose()
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn is_builtin_app(&self, app_id: &str) -> bool {
        self.app_id == app_id
    }

    /// Map a track name to its group id for the builtin application.
    /// Anything else is returned unchanged.
    #[must_use]
    pub fn resolve_group<'a>(&'a self, app_id: &str, group: &'a str) -> &'a str {
        if self.is_builtin_app(app_id) {
            if let Some(id) = self.groups.get(group) {
                return id;
            }
        }
        group
    }

    /// Why an event from the builtin application must be dropped, if it must.
    #[must_use]
    pub fn ignored_event(
        &self,
        app_id: &str,
        kind: EventKind,
        previous_version: &str,
        current_version: &str,
    ) -> Option<String> {
        let reboot_complete = kind.event_type == EventType::UpdateComplete
            && kind.result == EventResult::SuccessReboot;
        if !self.is_builtin_app(app_id) || !reboot_complete {
            return None;
        }
        if previous_version.is_empty() || previous_version == "0.0.0.0" {
            return Some("completion reported before reboot".to_string());
        }
        if previous_version != current_version {
            return Some(format!(
                "previous version {previous_version} does not match reported version {current_version}"
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = "e96281a6-d1af-4bde-9a0a-97b76e56dc57";
    const STABLE: &str = "5b810680-e36a-4879-b98a-4f989e80b899";

    fn distribution() -> BuiltinDistribution {
        let groups = BTreeMap::from([("stable".to_string(), STABLE.to_uppercase())]);
        BuiltinDistribution::new(&format!("{{{APP}}}"), &groups).unwrap()
    }

    fn reboot() -> EventKind {
        EventKind::from_codes(3, 2).unwrap()
    }

    #[test]
    fn test_ids_are_normalized() {
        let builtin = distribution();
        assert_eq!(builtin.app_id(), APP);
        assert_eq!(builtin.resolve_group(APP, "stable"), STABLE);
        assert_eq!(builtin.resolve_group(APP, "beta"), "beta");
        assert_eq!(builtin.resolve_group("other", "stable"), "stable");
    }

    #[test]
    fn test_ignored_events() {
        let builtin = distribution();
        assert!(builtin.ignored_event(APP, reboot(), "", "1.0.0").is_some());
        assert!(builtin.ignored_event(APP, reboot(), "0.0.0.0", "1.0.0").is_some());
        assert!(builtin.ignored_event(APP, reboot(), "0.9.0", "1.0.0").is_some());
        assert!(builtin.ignored_event(APP, reboot(), "1.0.0", "1.0.0").is_none());

        let download = EventKind::from_codes(13, 1).unwrap();
        assert!(builtin.ignored_event(APP, download, "", "1.0.0").is_none());
        assert!(builtin.ignored_event("other", reboot(), "", "1.0.0").is_none());
    }

    #[test]
    fn test_unconfigured() {
        assert!(BuiltinDistribution::from_config(&BuiltinConfig::default())
            .unwrap()
            .is_none());
    }
}
