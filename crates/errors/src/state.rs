//! State management error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StateError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("no rows affected: {message}")]
    NoRowsAffected { message: String },

    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },
}

impl StateError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MigrationFailed { .. } => {
                Some("Check that the database file is writable and not used by an older release.")
            }
            Self::DatabaseError { .. } => Some("Retry the operation; the database may be busy."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseError { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "state.not_found",
            Self::NoRowsAffected { .. } => "state.no_rows_affected",
            Self::DatabaseError { .. } => "state.database_error",
            Self::MigrationFailed { .. } => "state.migration_failed",
        };
        Some(code)
    }
}
