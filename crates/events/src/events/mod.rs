use serde::{Deserialize, Serialize};

use crate::{EventMeta, EventSource};
use roller_errors::UserFacingError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod general;
pub mod instance;
pub mod rollout;

pub use general::*;
pub use instance::*;
pub use rollout::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    General(GeneralEvent),

    Rollout(RolloutEvent),

    Instance(InstanceEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Rollout(_) => EventSource::ROLLOUT,
            Self::Instance(_) => EventSource::INSTANCE,
        }
    }

    /// Metadata for rendering this event at emission time.
    #[must_use]
    pub fn meta(&self) -> EventMeta {
        let meta = EventMeta::new(self.log_level(), self.event_source());
        match self.correlation_id() {
            Some(id) => meta.with_correlation_id(id),
            None => meta,
        }
    }

    /// Group or instance the event is about.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::General(_) => None,
            Self::Rollout(
                RolloutEvent::UpdateGranted { group_id, .. }
                | RolloutEvent::UpdateDenied { group_id, .. }
                | RolloutEvent::Started { group_id, .. }
                | RolloutEvent::Finished { group_id, .. }
                | RolloutEvent::Failed { group_id, .. }
                | RolloutEvent::UpdatesDisabled { group_id, .. },
            ) => Some(group_id),
            Self::Instance(
                InstanceEvent::Registered { instance_id, .. }
                | InstanceEvent::StatusChanged { instance_id, .. }
                | InstanceEvent::EventReported { instance_id, .. }
                | InstanceEvent::EventIgnored { instance_id, .. },
            ) => Some(instance_id),
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::Rollout(RolloutEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Rollout(RolloutEvent::UpdatesDisabled { .. }) => Level::WARN,

            Self::Rollout(RolloutEvent::UpdateDenied { .. })
            | Self::Instance(
                InstanceEvent::Registered { .. }
                | InstanceEvent::EventReported { .. }
                | InstanceEvent::EventIgnored { .. },
            ) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "roller::events::general",
            Self::Rollout(_) => "roller::events::rollout",
            Self::Instance(_) => "roller::events::instance",
        }
    }

    /// Structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
