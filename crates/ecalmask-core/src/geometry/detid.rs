//! # Detector Identifiers
//!
//! Packed identifiers for barrel crystals, endcap crystals, barrel trigger
//! towers and endcap super-crystals. Every identifier packs into a [`RawId`]:
//!
//! ```text
//! 31   28 27  25 24                                   0
//! ┌──────┬──────┬──────────────────────────────────────┐
//! │ det  │ sub  │ payload (per identifier kind)        │
//! └──────┴──────┴──────────────────────────────────────┘
//! ```

use crate::primitives::{
    DETECTOR_ECAL, DETECTOR_SHIFT, EB_CRYSTALS_IN_PHI, EB_CRYSTALS_PER_SM, EB_MAX_IETA,
    EB_MAX_IPHI, EB_SUPERMODULES, EB_SUPERMODULES_PER_SIDE, EE_DEE_INNER_DIAMETER,
    EE_DEE_OUTER_DIAMETER, EE_GRID, SUBDETECTOR_SHIFT, TOWER_SIZE, TT_MAX_IPHI,
};
use crate::{EcalSubdetector, MaskError, RawId};

/// Pack the detector and subdetector fields around a payload.
#[inline]
fn pack(subdet: EcalSubdetector, payload: u32) -> RawId {
    RawId(
        ((DETECTOR_ECAL & 0xF) << DETECTOR_SHIFT)
            | (((subdet.tag() as u32) & 0x7) << SUBDETECTOR_SHIFT)
            | payload,
    )
}

/// Subdetector encoded in a packed ECAL identifier, if any.
#[must_use]
pub fn subdetector_of(raw: RawId) -> Option<EcalSubdetector> {
    if raw.0 >> DETECTOR_SHIFT != DETECTOR_ECAL {
        return None;
    }
    EcalSubdetector::try_from(((raw.0 >> SUBDETECTOR_SHIFT) & 0x7) as i32).ok()
}

// =============================================================================
// BARREL CRYSTAL
// =============================================================================

/// A barrel crystal in (ieta, iphi) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EbDetId {
    ieta: i32,
    iphi: i32,
}

impl EbDetId {
    /// Create from global coordinates; `ieta` is signed, never zero.
    pub fn new(ieta: i32, iphi: i32) -> Result<Self, MaskError> {
        if ieta == 0 || ieta.abs() > EB_MAX_IETA || !(1..=EB_MAX_IPHI).contains(&iphi) {
            return Err(MaskError::InvalidDetId(format!(
                "barrel crystal ieta={} iphi={}",
                ieta, iphi
            )));
        }
        Ok(Self { ieta, iphi })
    }

    /// Create from a supermodule number and a crystal number inside it.
    ///
    /// Crystals are numbered `1..=1700` with 20 crystals per row.
    /// Supermodules `1..=18` lie on the positive side, where the local phi
    /// direction is reversed.
    pub fn from_sm_crystal(sm: i32, ic: i32) -> Result<Self, MaskError> {
        if !(1..=EB_SUPERMODULES).contains(&sm) || !(1..=EB_CRYSTALS_PER_SM).contains(&ic) {
            return Err(MaskError::InvalidDetId(format!(
                "barrel supermodule={} crystal={}",
                sm, ic
            )));
        }

        let row = (ic - 1) / EB_CRYSTALS_IN_PHI;
        let col = (ic - 1) - EB_CRYSTALS_IN_PHI * row;

        let (ieta, iphi) = if sm <= EB_SUPERMODULES_PER_SIDE {
            (
                row + 1,
                (sm - 1) * EB_CRYSTALS_IN_PHI + (EB_CRYSTALS_IN_PHI - col),
            )
        } else {
            (
                -(row + 1),
                (sm - EB_SUPERMODULES_PER_SIDE - 1) * EB_CRYSTALS_IN_PHI + col + 1,
            )
        };

        Self::new(ieta, iphi)
    }

    /// Signed eta index.
    #[must_use]
    pub const fn ieta(&self) -> i32 {
        self.ieta
    }

    /// Phi index, `1..=360`.
    #[must_use]
    pub const fn iphi(&self) -> i32 {
        self.iphi
    }

    /// `+1` or `-1`.
    #[must_use]
    pub const fn zside(&self) -> i32 {
        if self.ieta > 0 { 1 } else { -1 }
    }

    /// Supermodule this crystal belongs to.
    #[must_use]
    pub fn ism(&self) -> i32 {
        let sector = (self.iphi - 1) / EB_CRYSTALS_IN_PHI;
        if self.ieta > 0 {
            sector + 1
        } else {
            sector + EB_SUPERMODULES_PER_SIDE + 1
        }
    }

    /// Crystal number inside the supermodule; inverse of [`from_sm_crystal`](Self::from_sm_crystal).
    #[must_use]
    pub fn ic(&self) -> i32 {
        let row = self.ieta.abs() - 1;
        let offset = (self.ism() - 1) % EB_SUPERMODULES_PER_SIDE * EB_CRYSTALS_IN_PHI;
        let col = if self.ieta > 0 {
            EB_CRYSTALS_IN_PHI - (self.iphi - offset)
        } else {
            self.iphi - offset - 1
        };
        row * EB_CRYSTALS_IN_PHI + col + 1
    }

    /// Packed identifier.
    #[must_use]
    pub fn raw_id(&self) -> RawId {
        let side = if self.ieta > 0 { 0x10000 } else { 0 };
        let payload = side | ((self.ieta.unsigned_abs() & 0x7F) << 9) | (self.iphi as u32 & 0x1FF);
        pack(EcalSubdetector::Barrel, payload)
    }

    /// Trigger tower containing this crystal.
    #[must_use]
    pub fn tower(&self) -> TrigTowerDetId {
        let tower_ieta = 1 + (self.ieta.abs() - 1) / TOWER_SIZE;
        let mut tower_iphi = (self.iphi - 1) / TOWER_SIZE + 1 - 2;
        if tower_iphi <= 0 {
            tower_iphi += TT_MAX_IPHI;
        }
        TrigTowerDetId {
            zside: self.zside(),
            ieta_abs: tower_ieta,
            iphi: tower_iphi,
        }
    }
}

// =============================================================================
// BARREL TRIGGER TOWER
// =============================================================================

/// A barrel trigger tower (5×5 crystals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrigTowerDetId {
    zside: i32,
    ieta_abs: i32,
    iphi: i32,
}

impl TrigTowerDetId {
    /// `+1` or `-1`.
    #[must_use]
    pub const fn zside(&self) -> i32 {
        self.zside
    }

    /// |eta| index, `1..=17`.
    #[must_use]
    pub const fn ieta_abs(&self) -> i32 {
        self.ieta_abs
    }

    /// Phi index, `1..=72`.
    #[must_use]
    pub const fn iphi(&self) -> i32 {
        self.iphi
    }

    /// Packed identifier, stored under the trigger-tower subdetector.
    #[must_use]
    pub fn raw_id(&self) -> RawId {
        let side = if self.zside > 0 { 0x8000 } else { 0 };
        let payload =
            side | 0x4000 | ((self.ieta_abs as u32 & 0x3F) << 7) | (self.iphi as u32 & 0x7F);
        pack(EcalSubdetector::TriggerTower, payload)
    }
}

// =============================================================================
// ENDCAP CRYSTAL
// =============================================================================

/// An endcap crystal in global (ix, iy, iz) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EeDetId {
    ix: i32,
    iy: i32,
    iz: i32,
}

impl EeDetId {
    /// Whether a crystal exists at these coordinates.
    ///
    /// Crystals fill the annulus of each dee: the centre of crystal
    /// `(ix, iy)` must lie between the inner and outer dee radii.
    #[must_use]
    pub fn valid(ix: i32, iy: i32, iz: i32) -> bool {
        if !(1..=EE_GRID).contains(&ix)
            || !(1..=EE_GRID).contains(&iy)
            || !matches!(iz, -1 | 1)
        {
            return false;
        }
        let dx = 2 * ix - (EE_GRID + 1);
        let dy = 2 * iy - (EE_GRID + 1);
        let r2 = dx * dx + dy * dy;
        r2 >= EE_DEE_INNER_DIAMETER * EE_DEE_INNER_DIAMETER
            && r2 <= EE_DEE_OUTER_DIAMETER * EE_DEE_OUTER_DIAMETER
    }

    /// Create from global coordinates.
    pub fn new(ix: i32, iy: i32, iz: i32) -> Result<Self, MaskError> {
        if !Self::valid(ix, iy, iz) {
            return Err(MaskError::InvalidDetId(format!(
                "endcap crystal ix={} iy={} iz={}",
                ix, iy, iz
            )));
        }
        Ok(Self { ix, iy, iz })
    }

    /// Global x index, `1..=100`.
    #[must_use]
    pub const fn ix(&self) -> i32 {
        self.ix
    }

    /// Global y index, `1..=100`.
    #[must_use]
    pub const fn iy(&self) -> i32 {
        self.iy
    }

    /// `+1` or `-1`.
    #[must_use]
    pub const fn zside(&self) -> i32 {
        self.iz
    }

    /// Packed identifier.
    #[must_use]
    pub fn raw_id(&self) -> RawId {
        let side = if self.iz > 0 { 0x4000 } else { 0 };
        let payload = side | ((self.ix as u32 & 0x7F) << 7) | (self.iy as u32 & 0x7F);
        pack(EcalSubdetector::Endcap, payload)
    }

    /// Super-crystal containing this crystal.
    #[must_use]
    pub fn sc(&self) -> ScDetId {
        ScDetId {
            ix: 1 + (self.ix - 1) / TOWER_SIZE,
            iy: 1 + (self.iy - 1) / TOWER_SIZE,
            iz: self.iz,
        }
    }
}

// =============================================================================
// ENDCAP SUPER-CRYSTAL
// =============================================================================

/// An endcap super-crystal (5×5 crystals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScDetId {
    ix: i32,
    iy: i32,
    iz: i32,
}

impl ScDetId {
    /// Super-crystal x index, `1..=20`.
    #[must_use]
    pub const fn ix(&self) -> i32 {
        self.ix
    }

    /// Super-crystal y index, `1..=20`.
    #[must_use]
    pub const fn iy(&self) -> i32 {
        self.iy
    }

    /// `+1` or `-1`.
    #[must_use]
    pub const fn zside(&self) -> i32 {
        self.iz
    }

    /// Packed identifier; bit 15 separates super-crystals from crystals.
    #[must_use]
    pub fn raw_id(&self) -> RawId {
        let side = if self.iz > 0 { 0x4000 } else { 0 };
        let payload = 0x8000 | side | ((self.ix as u32 & 0x7F) << 7) | (self.iy as u32 & 0x7F);
        pack(EcalSubdetector::Endcap, payload)
    }
}

// =============================================================================
// TESTS
// =============================================================================
