//! Update lifecycle events reported by instances

use roller_errors::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UpdateComplete,
    DownloadStarted,
    DownloadFinished,
    Installed,
}

impl EventType {
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::UpdateComplete => 3,
            Self::DownloadStarted => 13,
            Self::DownloadFinished => 14,
            Self::Installed => 800,
        }
    }

    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            3 => Some(Self::UpdateComplete),
            13 => Some(Self::DownloadStarted),
            14 => Some(Self::DownloadFinished),
            800 => Some(Self::Installed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    Failed,
    Success,
    SuccessReboot,
}

impl EventResult {
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Failed => 0,
            Self::Success => 1,
            Self::SuccessReboot => 2,
        }
    }

    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Failed),
            1 => Some(Self::Success),
            2 => Some(Self::SuccessReboot),
            _ => None,
        }
    }
}

/// A known (type, result) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKind {
    pub event_type: EventType,
    pub result: EventResult,
}

impl EventKind {
    /// Validate a raw (type, result) pair as reported by an instance.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidEventTypeOrResult` for unknown codes
    /// and for `SuccessReboot` on anything but an update-complete event.
    pub fn from_codes(event_type: u32, event_result: u32) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidEventTypeOrResult {
            event_type,
            event_result,
        };
        let kind = Self {
            event_type: EventType::from_code(event_type).ok_or_else(invalid)?,
            result: EventResult::from_code(event_result).ok_or_else(invalid)?,
        };
        if kind.result == EventResult::SuccessReboot && kind.event_type != EventType::UpdateComplete
        {
            return Err(invalid());
        }
        Ok(kind)
    }

    #[must_use]
    pub fn is_failure(self) -> bool {
        self.result == EventResult::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        let kind = EventKind::from_codes(3, 2).unwrap();
        assert_eq!(kind.event_type, EventType::UpdateComplete);
        assert_eq!(kind.result, EventResult::SuccessReboot);
        assert!(EventKind::from_codes(800, 0).unwrap().is_failure());
        assert!(EventKind::from_codes(13, 1).is_ok());
    }

    #[test]
    fn test_unknown_pairs_rejected() {
        for (t, r) in [(1, 1), (3, 5), (13, 2), (800, 2), (14, 3)] {
            let err = EventKind::from_codes(t, r).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::InvalidEventTypeOrResult { event_type, event_result }
                    if event_type == t && event_result == r
            ));
        }
    }
}
