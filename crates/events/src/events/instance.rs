use roller_types::{EventKind, InstanceStatus};
use serde::{Deserialize, Serialize};

/// Instance registration and status changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstanceEvent {
    Registered {
        instance_id: String,
        application_id: String,
        group_id: String,
        version: String,
    },

    StatusChanged {
        instance_id: String,
        application_id: String,
        status: InstanceStatus,
    },

    EventReported {
        instance_id: String,
        application_id: String,
        kind: EventKind,
    },

    EventIgnored {
        instance_id: String,
        reason: String,
    },
}
