//! # ecalmask-core
//!
//! The channel and tower masking engine for the ECAL calorimeter.
//!
//! Given the status records of one conditions epoch, this crate answers
//! whether a crystal, addressed by module-local coordinates, is masked by a
//! status bitmask either on its own or through the tower (barrel) or
//! super-crystal (endcap) containing it.
//!
//! ## Layout
//!
//! - `types`: identifiers, status codes, errors
//! - `geometry`: packed detector ids and the endcap sector layout
//! - `status` / `conditions`: status tables and the conditions provider seam
//! - `masks` / `scan`: the resolver and the queries built on it
//! - `formats` / `storage`: payload files, status sheets, the redb store
//!
//! ## Constraints
//!
//! - Integer arithmetic only
//! - No async, no network dependencies
//! - Queries never perform I/O

// =============================================================================
// MODULES
// =============================================================================

pub mod conditions;
pub mod formats;
pub mod geometry;
pub mod masks;
pub mod primitives;
pub mod scan;
pub mod status;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EcalSubdetector, EpochId, MaskError, RawId, StatusCode};

// =============================================================================
// RE-EXPORTS: Masking Engine
// =============================================================================

pub use conditions::{ConditionsEpoch, ConditionsPayload, ConditionsSource};
pub use geometry::{
    Crystal, EbDetId, EcalGeometry, EeDetId, Geometry, ScDetId, TrigTowerDetId, locate_crystal,
};
pub use masks::{MaskHit, MaskResolver, MaskSnapshot, SharedMasks};
pub use scan::{MaskedPosition, ModuleScan, module_extent};
pub use status::{RecordKind, StatusTable, flag_bits, flag_names, parse_bits};
pub use storage::ConditionsStore;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    MAX_PAYLOAD_SIZE, PayloadHeader, SheetEntry, SheetLevel, StatusSheet, payload_checksum,
    payload_from_bytes, payload_to_bytes,
};

#[cfg(feature = "crypto-hash")]
pub use formats::payload_blake3;
