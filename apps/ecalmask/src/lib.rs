//! # ecalmask
//!
//! CLI and HTTP surfaces over `ecalmask-core`. Exposed as a library so the
//! integration tests can drive the router and the config loader directly.

pub mod api;
pub mod cli;
pub mod config;
