//! # Geometry and Format Primitives
//!
//! Fixed constants of the ECAL layout and of the payload format.
//! These are compiled into the binary and are immutable at runtime.

// =============================================================================
// DETECTOR ID PACKING
// =============================================================================

/// Detector field value for ECAL in a packed identifier.
pub const DETECTOR_ECAL: u32 = 3;

/// Bit offset of the detector field.
pub const DETECTOR_SHIFT: u32 = 28;

/// Bit offset of the subdetector field.
pub const SUBDETECTOR_SHIFT: u32 = 25;

// =============================================================================
// BARREL
// =============================================================================

/// Number of barrel supermodules (18 per side).
pub const EB_SUPERMODULES: i32 = 36;

/// Supermodules `1..=EB_SUPERMODULES_PER_SIDE` sit on the positive side.
pub const EB_SUPERMODULES_PER_SIDE: i32 = 18;

/// Crystals along phi inside one supermodule.
///
/// This is the row stride of the linear crystal index `(ix-1) + 20*(iy-1) + 1`.
pub const EB_CRYSTALS_IN_PHI: i32 = 20;

/// Crystals along eta inside one supermodule.
pub const EB_CRYSTALS_IN_ETA: i32 = 85;

/// Crystals in one supermodule.
pub const EB_CRYSTALS_PER_SM: i32 = EB_CRYSTALS_IN_PHI * EB_CRYSTALS_IN_ETA;

/// Largest |ieta| of a barrel crystal.
pub const EB_MAX_IETA: i32 = 85;

/// Largest iphi of a barrel crystal.
pub const EB_MAX_IPHI: i32 = 360;

// =============================================================================
// TRIGGER TOWERS / SUPER-CRYSTALS
// =============================================================================

/// Crystals along each axis of a barrel trigger tower or endcap super-crystal.
pub const TOWER_SIZE: i32 = 5;

/// Largest trigger tower iphi.
pub const TT_MAX_IPHI: i32 = 72;

// =============================================================================
// ENDCAP
// =============================================================================

/// Number of endcap sectors (9 per side).
pub const EE_SECTORS: i32 = 18;

/// Sectors `1..=EE_NEGATIVE_SECTORS` sit on the negative side.
pub const EE_NEGATIVE_SECTORS: i32 = 9;

/// Global endcap crystal coordinates run `1..=EE_GRID`.
pub const EE_GRID: i32 = 100;

/// Local sector coordinates run `1..=EE_SECTOR_WINDOW`.
pub const EE_SECTOR_WINDOW: i32 = 50;

/// Inner radius of a dee, in crystal half-widths (squared below).
pub const EE_DEE_INNER_DIAMETER: i32 = 22;

/// Outer radius of a dee, in crystal half-widths (squared below).
pub const EE_DEE_OUTER_DIAMETER: i32 = 100;

// =============================================================================
// PAYLOAD FORMAT
// =============================================================================

/// Magic bytes for the conditions payload header.
pub const MAGIC_BYTES: &[u8; 4] = b"EMSK";

/// Current payload format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of entries in a status sheet.
///
/// ECAL has 75848 crystals; anything beyond that plus the towers is malformed.
pub const MAX_SHEET_ENTRIES: usize = 100_000;

/// Maximum number of entries in a single status table.
pub const MAX_TABLE_ENTRIES: usize = 100_000;
