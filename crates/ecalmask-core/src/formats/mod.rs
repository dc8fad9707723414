//! # Formats Module
//!
//! Serialization formats for conditions payloads and status sheets.

mod persistence;
mod sheet;

pub use persistence::*;
pub use sheet::*;
