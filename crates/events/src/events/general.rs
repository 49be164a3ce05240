use serde::{Deserialize, Serialize};

/// Events that do not belong to a rollout or an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// A side effect failed without failing the operation that caused it.
    Warning { message: String, context: String },
}

impl GeneralEvent {
    pub fn warning_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: context.into(),
        }
    }
}
