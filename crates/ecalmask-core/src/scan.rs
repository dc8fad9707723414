//! # Module Scan
//!
//! Walk every local position of one module and report which ones are masked.
//! This is what a quality-plot renderer does before drawing a module.

use crate::masks::{MaskHit, MaskSnapshot};
use crate::primitives::{EB_CRYSTALS_IN_ETA, EB_CRYSTALS_IN_PHI, EE_SECTOR_WINDOW};
use crate::{EcalSubdetector, MaskError};
use serde::{Deserialize, Serialize};

/// One masked position of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedPosition {
    /// Local x coordinate.
    pub ix: i32,
    /// Local y coordinate.
    pub iy: i32,
    /// Masked by the crystal's own status.
    pub channel: bool,
    /// Masked by the tower or super-crystal status.
    pub tower: bool,
}

/// Result of scanning one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleScan {
    /// Module scanned.
    pub module: i32,
    /// Subdetector scanned.
    pub subdet: EcalSubdetector,
    /// Bits tested.
    pub bits: u32,
    /// Number of positions that are crystals of the module.
    pub crystals: usize,
    /// Masked positions in (iy, ix) order.
    pub masked: Vec<MaskedPosition>,
}

impl ModuleScan {
    /// Positions masked by the channel record.
    #[must_use]
    pub fn channel_masked(&self) -> usize {
        self.masked.iter().filter(|p| p.channel).count()
    }

    /// Positions masked by the tower record.
    #[must_use]
    pub fn tower_masked(&self) -> usize {
        self.masked.iter().filter(|p| p.tower).count()
    }
}

/// Local coordinate extents `(ix max, iy max)` of a module.
pub fn module_extent(subdet: EcalSubdetector) -> Result<(i32, i32), MaskError> {
    match subdet {
        EcalSubdetector::Barrel => Ok((EB_CRYSTALS_IN_PHI, EB_CRYSTALS_IN_ETA)),
        EcalSubdetector::Endcap => Ok((EE_SECTOR_WINDOW, EE_SECTOR_WINDOW)),
        other => Err(MaskError::InvalidSubdetector(other)),
    }
}

impl MaskSnapshot {
    /// Scan all positions of module `ism`.
    pub fn scan_module(
        &self,
        ism: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<ModuleScan, MaskError> {
        let (nx, ny) = module_extent(subdet)?;
        let mut crystals = 0;
        let mut masked = Vec::new();

        for iy in 1..=ny {
            for ix in 1..=nx {
                let Some(hit) = self.classify(ism, ix, iy, bits, subdet)? else {
                    continue;
                };
                crystals += 1;
                let MaskHit { channel, tower } = hit;
                if hit.any() {
                    masked.push(MaskedPosition {
                        ix,
                        iy,
                        channel,
                        tower,
                    });
                }
            }
        }

        Ok(ModuleScan {
            module: ism,
            subdet,
            bits,
            crystals,
            masked,
        })
    }
}
