//! Runtime SQL queries
//!
//! Every function takes a `&mut SqliteConnection`, so callers can run it on a
//! pooled connection or inside a transaction (`&mut *tx`).

pub mod activity;
pub mod catalog;
pub mod groups;
pub mod instances;
pub mod stats;
