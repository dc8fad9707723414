//! # API Request/Response Types
//!
//! This module defines the query parameters and JSON bodies of the HTTP API.

use ecalmask_core::{EcalSubdetector, MaskError, MaskSnapshot, ModuleScan, RecordKind, parse_bits};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Bound conditions status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Epoch of the published snapshot, if any conditions are loaded.
    pub epoch: Option<u64>,
    /// Entry count of the channel table; `None` when absent.
    pub channel_entries: Option<usize>,
    /// Entry count of the tower table; `None` when absent.
    pub tower_entries: Option<usize>,
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &MaskSnapshot) -> Self {
        Self {
            epoch: snapshot.epoch().map(|e| e.0),
            channel_entries: snapshot.table(RecordKind::ChannelStatus).map(|t| t.len()),
            tower_entries: snapshot.table(RecordKind::TowerStatus).map(|t| t.len()),
        }
    }
}

// =============================================================================
// MASK QUERY
// =============================================================================

/// Query string of `/mask/channel`, `/mask/tower` and `/scan`.
///
/// `ix` and `iy` are ignored by `/scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskQuery {
    pub module: i32,
    #[serde(default)]
    pub ix: i32,
    #[serde(default)]
    pub iy: i32,
    /// Decimal, `0x` hex or comma-separated flag names.
    pub bits: String,
    pub subdet: String,
}

impl MaskQuery {
    /// Parse the subdetector and bit mask.
    pub fn parse(&self) -> Result<(EcalSubdetector, u32), MaskError> {
        let subdet: EcalSubdetector = self.subdet.parse()?;
        let bits = parse_bits(&self.bits)?;
        Ok((subdet, bits))
    }
}

/// Mask query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskResponse {
    pub success: bool,
    pub masked: Option<bool>,
    pub error: Option<String>,
}

impl MaskResponse {
    pub fn masked(masked: bool) -> Self {
        Self {
            success: true,
            masked: Some(masked),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            masked: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// SCAN RESPONSE
// =============================================================================

/// Module scan response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,
    pub scan: Option<ModuleScan>,
    pub error: Option<String>,
}

impl ScanResponse {
    pub fn success(scan: ModuleScan) -> Self {
        Self {
            success: true,
            scan: Some(scan),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            scan: None,
            error: Some(msg.into()),
        }
    }
}
