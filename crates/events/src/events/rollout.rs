use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Decisions and rollout lifecycle changes for a group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RolloutEvent {
    UpdateGranted {
        instance_id: String,
        group_id: String,
        from_version: String,
        to_version: String,
    },

    UpdateDenied {
        instance_id: String,
        group_id: String,
        failure: FailureContext,
    },

    Started {
        group_id: String,
        version: String,
    },

    Finished {
        group_id: String,
        version: String,
    },

    Failed {
        group_id: String,
        version: String,
    },

    /// Updates were switched off for the group by the engine.
    UpdatesDisabled {
        group_id: String,
        reason: String,
    },
}
