//! Applications, channels and packages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_ts: DateTime<Utc>,
}

/// A named pointer to the package an application's groups roll out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub color: String,
    pub application_id: String,
    pub package_id: Option<String>,
    pub created_ts: DateTime<Utc>,
    pub package: Option<Package>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChannel {
    pub name: String,
    pub color: String,
    pub application_id: String,
    pub package_id: Option<String>,
}

/// Omaha action attached to CoreOS packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreosAction {
    pub event: String,
    pub chromeos_version: String,
    pub sha256: String,
    pub needs_admin: bool,
    pub is_delta: bool,
    pub disable_payload_backoff: bool,
    pub metadata_signature_rsa: String,
    pub metadata_size: String,
    pub deadline: String,
}

/// Package flavour. Only CoreOS packages carry an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "action", rename_all = "snake_case")]
pub enum PackageKind {
    Coreos(CoreosAction),
    Docker,
    Rocket,
    Other,
}

impl PackageKind {
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Coreos(_) => 1,
            Self::Docker => 2,
            Self::Rocket => 3,
            Self::Other => 4,
        }
    }

    /// Rebuild a kind from its persisted code. CoreOS packages get their
    /// action from the caller.
    #[must_use]
    pub fn from_code(code: i64, action: Option<CoreosAction>) -> Option<Self> {
        match code {
            1 => Some(Self::Coreos(action.unwrap_or_default())),
            2 => Some(Self::Docker),
            3 => Some(Self::Rocket),
            4 => Some(Self::Other),
            _ => None,
        }
    }

    #[must_use]
    pub fn coreos_action(&self) -> Option<&CoreosAction> {
        match self {
            Self::Coreos(action) => Some(action),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub application_id: String,
    pub version: String,
    pub url: String,
    pub filename: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub hash: Option<String>,
    pub created_ts: DateTime<Utc>,
    pub kind: PackageKind,
    /// Channels that must never receive this package.
    pub channels_blacklist: Vec<String>,
}

impl Package {
    #[must_use]
    pub fn is_blacklisted_for(&self, channel_id: &str) -> bool {
        self.channels_blacklist.iter().any(|id| id == channel_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPackage {
    pub application_id: String,
    pub version: String,
    pub url: String,
    pub filename: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub hash: Option<String>,
    pub kind: PackageKind,
    pub channels_blacklist: Vec<String>,
}
