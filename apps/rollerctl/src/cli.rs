//! Command line interface definition

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use roller_types::{ActivitySeverity, CoreosAction, GroupPolicy, InstanceStatus, PackageKind};

/// rollerctl - operate a roller update server database
#[derive(Parser)]
#[command(name = "rollerctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operate a roller update server database")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use alternate database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Manage applications
    #[command(subcommand)]
    App(AppCommands),

    /// Manage packages
    #[command(subcommand)]
    Package(PackageCommands),

    /// Manage channels
    #[command(subcommand)]
    Channel(ChannelCommands),

    /// Manage groups and their rollout policy
    #[command(subcommand)]
    Group(GroupCommands),

    /// Check in an instance and ask for an update
    Check {
        #[arg(long)]
        instance: String,
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
        /// Version the instance currently runs
        #[arg(long)]
        version: String,
        #[arg(long)]
        app: String,
        /// Group id, or a track name for the builtin application
        #[arg(long)]
        group: String,
    },

    /// Report an update event for an instance
    Event {
        #[arg(long)]
        instance: String,
        #[arg(long)]
        app: String,
        #[arg(long)]
        group: String,
        /// Event type code (3, 13, 14 or 800)
        #[arg(long = "type")]
        event_type: u32,
        /// Event result code (0, 1 or 2)
        #[arg(long)]
        result: u32,
        #[arg(long, default_value = "")]
        previous_version: String,
        #[arg(long, default_value = "")]
        error_code: String,
    },

    /// Show an instance and its state for an application
    Instance {
        id: String,
        #[arg(long)]
        app: String,
    },

    /// List the active instances of a group
    Instances {
        #[arg(long)]
        app: String,
        #[arg(long)]
        group: String,
        #[arg(long)]
        status: Option<InstanceStatus>,
        #[arg(long)]
        version: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show the status history of an instance in a group
    History {
        instance: String,
        #[arg(long)]
        app: String,
        #[arg(long)]
        group: String,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show the activity log
    Activity {
        #[arg(long)]
        app: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        instance: Option<String>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        severity: Option<ActivitySeverity>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
pub enum AppCommands {
    /// Add an application
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show an application
    Show { id: String },
}

#[derive(Subcommand)]
pub enum PackageCommands {
    /// Add a package to an application
    Add(PackageArgs),
    /// Show a package
    Show { id: String },
}

#[derive(Subcommand)]
pub enum ChannelCommands {
    /// Add a channel
    Add {
        name: String,
        #[arg(long)]
        app: String,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long)]
        package: Option<String>,
    },
    /// Point a channel at a package
    SetPackage {
        id: String,
        #[arg(long)]
        package: String,
    },
    /// Show a channel
    Show { id: String },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Add a group
    Add {
        name: String,
        #[arg(long)]
        app: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        channel: Option<String>,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Change a group's channel or policy
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Show a group with its instance breakdown
    Show { id: String },
    /// List the groups of an application
    List {
        #[arg(long)]
        app: String,
    },
    /// Show rollout counters of a group for a version
    Stats {
        id: String,
        #[arg(long)]
        version: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PackageType {
    Coreos,
    Docker,
    Rocket,
    Other,
}

#[derive(Args)]
pub struct PackageArgs {
    #[arg(long)]
    pub app: String,
    #[arg(long)]
    pub version: String,
    #[arg(long)]
    pub url: String,
    #[arg(long)]
    pub filename: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub size: Option<String>,
    #[arg(long)]
    pub hash: Option<String>,
    #[arg(long = "type", value_enum, default_value = "other")]
    pub kind: PackageType,
    /// SHA-256 of the payload, for CoreOS packages
    #[arg(long)]
    pub sha256: Option<String>,
    /// Channel that must never receive this package (repeatable)
    #[arg(long = "blacklist")]
    pub channels_blacklist: Vec<String>,
}

impl PackageArgs {
    pub fn kind(&self) -> PackageKind {
        match self.kind {
            PackageType::Coreos => PackageKind::Coreos(CoreosAction {
                event: "postinstall".to_string(),
                sha256: self.sha256.clone().unwrap_or_default(),
                ..CoreosAction::default()
            }),
            PackageType::Docker => PackageKind::Docker,
            PackageType::Rocket => PackageKind::Rocket,
            PackageType::Other => PackageKind::Other,
        }
    }
}

/// Policy flags. Unset flags keep the current (or default) value.
#[derive(Args, Default)]
pub struct PolicyArgs {
    #[arg(long)]
    pub updates_enabled: Option<bool>,
    #[arg(long)]
    pub safe_mode: Option<bool>,
    #[arg(long)]
    pub office_hours: Option<bool>,
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long, value_name = "SECS")]
    pub period: Option<u64>,
    #[arg(long)]
    pub max_updates: Option<u32>,
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl PolicyArgs {
    pub fn apply(&self, mut policy: GroupPolicy) -> GroupPolicy {
        if let Some(enabled) = self.updates_enabled {
            policy.updates_enabled = enabled;
        }
        if let Some(safe_mode) = self.safe_mode {
            policy.safe_mode = safe_mode;
        }
        if let Some(office_hours) = self.office_hours {
            policy.office_hours = office_hours;
        }
        if let Some(timezone) = &self.timezone {
            policy.timezone = Some(timezone.clone());
        }
        if let Some(secs) = self.period {
            policy.period_interval = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_updates {
            policy.max_updates_per_period = max;
        }
        if let Some(secs) = self.timeout {
            policy.update_timeout = Duration::from_secs(secs);
        }
        policy
    }
}

#[derive(Args)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 100)]
    pub per_page: u32,
}
