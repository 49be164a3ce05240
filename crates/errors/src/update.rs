//! Update denial types
//!
//! A denial is not a failure of the server: it is the answer to an update
//! check. Eligibility denials mean there is nothing to hand out to this
//! instance; policy denials mean the group's rollout limits are holding it
//! back for now.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Broad category of an [`UpdateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialKind {
    Eligibility,
    Policy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum UpdateError {
    #[error("no package found for group")]
    NoPackageFound,

    #[error("no update package available")]
    NoUpdatePackageAvailable,

    #[error("an update is already in progress on this instance")]
    UpdateInProgressOnInstance,

    #[error("updates are disabled for this group")]
    UpdatesDisabled,

    #[error("maximum updates per period limit reached")]
    MaxUpdatesPerPeriodLimitReached,

    #[error("maximum concurrent updates limit reached")]
    MaxConcurrentUpdatesLimitReached,

    #[error("maximum timed-out updates limit reached")]
    MaxTimedOutUpdatesLimitReached,
}

impl UpdateError {
    #[must_use]
    pub fn kind(&self) -> DenialKind {
        match self {
            Self::NoPackageFound
            | Self::NoUpdatePackageAvailable
            | Self::UpdateInProgressOnInstance => DenialKind::Eligibility,
            Self::UpdatesDisabled
            | Self::MaxUpdatesPerPeriodLimitReached
            | Self::MaxConcurrentUpdatesLimitReached
            | Self::MaxTimedOutUpdatesLimitReached => DenialKind::Policy,
        }
    }

    /// Whether this denial parks the instance in the OnHold status.
    #[must_use]
    pub fn holds_instance(&self) -> bool {
        matches!(
            self,
            Self::MaxUpdatesPerPeriodLimitReached
                | Self::MaxConcurrentUpdatesLimitReached
                | Self::MaxTimedOutUpdatesLimitReached
        )
    }
}

impl UserFacingError for UpdateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoPackageFound => {
                Some("Assign a channel with a package to the group.")
            }
            Self::UpdatesDisabled | Self::MaxTimedOutUpdatesLimitReached => {
                Some("Review the group's rollout and re-enable updates once it is healthy.")
            }
            Self::MaxUpdatesPerPeriodLimitReached | Self::MaxConcurrentUpdatesLimitReached => {
                Some("Wait for in-flight updates to finish or raise the group's limits.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MaxUpdatesPerPeriodLimitReached | Self::MaxConcurrentUpdatesLimitReached
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoPackageFound => "update.no_package_found",
            Self::NoUpdatePackageAvailable => "update.no_update_package_available",
            Self::UpdateInProgressOnInstance => "update.update_in_progress_on_instance",
            Self::UpdatesDisabled => "update.updates_disabled",
            Self::MaxUpdatesPerPeriodLimitReached => "update.max_updates_per_period_limit_reached",
            Self::MaxConcurrentUpdatesLimitReached => {
                "update.max_concurrent_updates_limit_reached"
            }
            Self::MaxTimedOutUpdatesLimitReached => "update.max_timed_out_updates_limit_reached",
        };
        Some(code)
    }
}
