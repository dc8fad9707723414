//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the masking engine:
//! - Detector identifiers (`RawId`) and subdetector tags (`EcalSubdetector`)
//! - Status codes and the bit-test used by every mask query (`StatusCode`)
//! - Conditions epoch identifiers (`EpochId`)
//! - Error types (`MaskError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Packed 32-bit detector identifier.
///
/// Layout: `detector (4 bits) | subdetector (3 bits) | payload (25 bits)`.
/// Status tables are keyed by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawId(pub u32);

impl RawId {
    /// Get the raw packed value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Identifier of a conditions epoch (interval of validity).
///
/// When epochs come from a [`ConditionsStore`](crate::ConditionsStore) this is
/// the first run of the interval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EpochId(pub u64);

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// SUBDETECTOR TAGS
// =============================================================================

/// ECAL subdetector tags, with the numeric values used in packed identifiers.
///
/// Only [`Barrel`](Self::Barrel) and [`Endcap`](Self::Endcap) address crystals;
/// mask queries reject every other tag with [`MaskError::InvalidSubdetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EcalSubdetector {
    /// Barrel crystals.
    Barrel = 1,
    /// Endcap crystals.
    Endcap = 2,
    /// Preshower strips.
    Preshower = 3,
    /// Trigger towers.
    TriggerTower = 4,
    /// Laser monitoring PN diodes.
    LaserPnDiode = 5,
}

impl EcalSubdetector {
    /// Numeric tag as stored in the subdetector field of a [`RawId`].
    #[must_use]
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Short name used on the command line and in status sheets.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EcalSubdetector::Barrel => "barrel",
            EcalSubdetector::Endcap => "endcap",
            EcalSubdetector::Preshower => "preshower",
            EcalSubdetector::TriggerTower => "trigger-tower",
            EcalSubdetector::LaserPnDiode => "laser-pn-diode",
        }
    }
}

impl fmt::Display for EcalSubdetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.tag())
    }
}

impl TryFrom<i32> for EcalSubdetector {
    type Error = MaskError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Barrel),
            2 => Ok(Self::Endcap),
            3 => Ok(Self::Preshower),
            4 => Ok(Self::TriggerTower),
            5 => Ok(Self::LaserPnDiode),
            other => Err(MaskError::UnknownSubdetectorTag(other)),
        }
    }
}

impl FromStr for EcalSubdetector {
    type Err = MaskError;

    /// Accepts names (`barrel`, `eb`, `endcap`, `ee`, ...) or numeric tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "barrel" | "eb" => Ok(Self::Barrel),
            "endcap" | "ee" => Ok(Self::Endcap),
            "preshower" | "es" => Ok(Self::Preshower),
            "trigger-tower" | "tt" => Ok(Self::TriggerTower),
            "laser-pn-diode" | "pn" => Ok(Self::LaserPnDiode),
            other => match other.parse::<i32>() {
                Ok(tag) => Self::try_from(tag),
                Err(_) => Err(MaskError::ConfigError(format!(
                    "Unknown subdetector '{}'. Use: barrel, endcap, preshower, trigger-tower, laser-pn-diode",
                    s
                ))),
            },
        }
    }
}

// =============================================================================
// STATUS CODES
// =============================================================================

/// A status bitmask recorded for a channel or a tower.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Create a status code from raw bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Match test used by mask queries: any shared bit, not equality.
    #[must_use]
    pub const fn intersects(self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    /// Combine two status codes.
    #[must_use]
    pub const fn union(self, other: StatusCode) -> Self {
        Self(self.0 | other.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the masking engine.
///
/// A missing status table is NOT an error: lookups against it report
/// "not masked".
#[derive(Debug, Error)]
pub enum MaskError {
    /// A mask query was given a subdetector other than barrel or endcap.
    #[error("Invalid subdetector: subdet = {0}")]
    InvalidSubdetector(EcalSubdetector),

    /// A numeric subdetector tag does not name any ECAL subdetector.
    #[error("Unknown subdetector tag: {0}")]
    UnknownSubdetectorTag(i32),

    /// Coordinates do not describe a detector element.
    #[error("Invalid detector id: {0}")]
    InvalidDetId(String),

    /// A status sheet entry could not be translated.
    #[error("Invalid status sheet: {0}")]
    InvalidSheet(String),

    /// No conditions epoch covers the requested run.
    #[error("No conditions epoch covers run {0}")]
    EpochNotFound(u64),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_intersection_is_not_equality() {
        let status = StatusCode::new(0x6);
        assert!(!status.intersects(0x1));
        assert!(status.intersects(0x2));
        assert!(status.intersects(0x4));
        assert!(!status.intersects(0));
    }

    #[test]
    fn subdetector_numeric_tags() {
        assert_eq!(EcalSubdetector::Barrel.tag(), 1);
        assert_eq!(EcalSubdetector::Endcap.tag(), 2);
        assert_eq!(
            EcalSubdetector::try_from(4).expect("tag"),
            EcalSubdetector::TriggerTower
        );
        assert!(matches!(
            EcalSubdetector::try_from(9),
            Err(MaskError::UnknownSubdetectorTag(9))
        ));
    }

    #[test]
    fn subdetector_parsing() {
        assert_eq!("EB".parse::<EcalSubdetector>().expect("parse"), EcalSubdetector::Barrel);
        assert_eq!("endcap".parse::<EcalSubdetector>().expect("parse"), EcalSubdetector::Endcap);
        assert_eq!("3".parse::<EcalSubdetector>().expect("parse"), EcalSubdetector::Preshower);
        assert!("hcal".parse::<EcalSubdetector>().is_err());
    }

    #[test]
    fn invalid_subdetector_message_carries_tag() {
        let err = MaskError::InvalidSubdetector(EcalSubdetector::Preshower);
        assert_eq!(err.to_string(), "Invalid subdetector: subdet = preshower (3)");
    }

    #[test]
    fn raw_id_display_is_hex() {
        assert_eq!(RawId(0x3201_0000).to_string(), "0x32010000");
    }
}
