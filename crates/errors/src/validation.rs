//! Input validation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ValidationError {
    #[error("invalid semver: {version}")]
    InvalidSemver { version: String },

    #[error("invalid application or group")]
    InvalidApplicationOrGroup,

    #[error("invalid instance: {instance_id}")]
    InvalidInstance { instance_id: String },

    #[error("invalid event type or result: {event_type}/{event_result}")]
    InvalidEventTypeOrResult { event_type: u32, event_result: u32 },

    #[error("no update in progress on instance {instance_id}")]
    NoUpdateInProgress { instance_id: String },

    #[error("invalid channel: {channel_id}")]
    InvalidChannel { channel_id: String },

    #[error("invalid package: {package_id}")]
    InvalidPackage { package_id: String },

    #[error("package {package_id} is blacklisted for channel {channel_id}")]
    BlacklistedChannel {
        package_id: String,
        channel_id: String,
    },

    #[error("channel {channel_id} points at package {package_id} and cannot be blacklisted")]
    BlacklistingChannel {
        package_id: String,
        channel_id: String,
    },

    #[error("expecting a valid timezone, got {timezone:?}")]
    ExpectingValidTimezone { timezone: Option<String> },

    #[error("invalid policy: {message}")]
    InvalidPolicy { message: String },

    #[error("event ignored: {reason}")]
    EventIgnored { reason: String },

    #[error("invalid id: {input}")]
    InvalidId { input: String },
}

impl UserFacingError for ValidationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidSemver { .. } => Some("Use semantic-version strings like 1.2.3."),
            Self::ExpectingValidTimezone { .. } => {
                Some("Use an IANA timezone name such as Europe/Berlin when office hours are on.")
            }
            Self::BlacklistedChannel { .. } => {
                Some("Remove the channel from the package blacklist or choose another package.")
            }
            Self::BlacklistingChannel { .. } => {
                Some("Point the channel at another package before blacklisting it.")
            }
            Self::NoUpdateInProgress { .. } => {
                Some("Events are only accepted between an update grant and its completion.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidSemver { .. } => "validation.invalid_semver",
            Self::InvalidApplicationOrGroup => "validation.invalid_application_or_group",
            Self::InvalidInstance { .. } => "validation.invalid_instance",
            Self::InvalidEventTypeOrResult { .. } => "validation.invalid_event_type_or_result",
            Self::NoUpdateInProgress { .. } => "validation.no_update_in_progress",
            Self::InvalidChannel { .. } => "validation.invalid_channel",
            Self::InvalidPackage { .. } => "validation.invalid_package",
            Self::BlacklistedChannel { .. } => "validation.blacklisted_channel",
            Self::BlacklistingChannel { .. } => "validation.blacklisting_channel",
            Self::ExpectingValidTimezone { .. } => "validation.expecting_valid_timezone",
            Self::InvalidPolicy { .. } => "validation.invalid_policy",
            Self::EventIgnored { .. } => "validation.event_ignored",
            Self::InvalidId { .. } => "validation.invalid_id",
        };
        Some(code)
    }
}
