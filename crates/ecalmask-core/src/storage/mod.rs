//! # Storage Module
//!
//! Disk-backed conditions epochs keyed by the first run they apply to.

mod redb_conditions;

pub use redb_conditions::ConditionsStore;
