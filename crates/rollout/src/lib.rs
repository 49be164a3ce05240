#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

//! Rollout engine for roller
//!
//! Decides whether an instance that checks in may update to the package of
//! its group's channel, enforces the group's rollout policy (safe mode,
//! office hours, per-period and concurrency limits, timed-out updates) and
//! tracks every instance through the update lifecycle from the events it
//! reports.
//!
//! ```text
//! check-in ─▶ register ─▶ eligibility ─▶ policy gates ─▶ grant
//!                                             │
//! client events ─▶ dispatcher ─▶ status + rollout state + activity log
//! ```

mod activity;
pub mod builtin;
mod catalog;
mod dispatcher;
pub mod locks;
pub mod policy;
mod registry;
mod resolver;
pub mod service;
pub mod settings;
mod stats;

pub use builtin::BuiltinDistribution;
pub use dispatcher::EventReport;
pub use locks::AdmissionLocks;
pub use service::Rollout;
pub use settings::RolloutSettings;
