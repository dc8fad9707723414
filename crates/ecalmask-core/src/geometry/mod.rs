//! # Geometry Module
//!
//! Coordinate and identifier translation used by the mask queries:
//! - Packed identifiers (`detid`)
//! - Endcap sector offsets and validity (`numbers`)
//!
//! The [`Geometry`] trait is the seam through which the resolver reaches the
//! endcap sector layout. [`EcalGeometry`] is the built-in layout.

mod detid;
mod numbers;

pub use detid::*;
pub use numbers::*;

use crate::{EcalSubdetector, MaskError, RawId};
use std::fmt;

/// Endcap sector layout consulted by mask queries.
///
/// Implementations must be pure functions of their arguments.
pub trait Geometry: Send + Sync + fmt::Debug {
    /// Global x offset of sector `ism`.
    fn ix0(&self, ism: i32) -> i32;

    /// Global y offset of sector `ism`.
    fn iy0(&self, ism: i32) -> i32;

    /// Whether global `(jx, jy)` is a crystal of sector `ism`.
    fn valid_ee(&self, ism: i32, jx: i32, jy: i32) -> bool;
}

/// The standard ECAL endcap layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcalGeometry;

impl Geometry for EcalGeometry {
    fn ix0(&self, ism: i32) -> i32 {
        ix0_ee(ism)
    }

    fn iy0(&self, ism: i32) -> i32 {
        iy0_ee(ism)
    }

    fn valid_ee(&self, ism: i32, jx: i32, jy: i32) -> bool {
        valid_ee(ism, jx, jy)
    }
}

// =============================================================================
// MODULE-LOCAL COORDINATES
// =============================================================================

/// A crystal located from module-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crystal {
    Barrel(EbDetId),
    Endcap(EeDetId),
}

impl Crystal {
    /// Packed id of the crystal itself.
    #[must_use]
    pub fn raw_id(&self) -> RawId {
        match self {
            Crystal::Barrel(id) => id.raw_id(),
            Crystal::Endcap(id) => id.raw_id(),
        }
    }

    /// Packed id of the trigger tower (barrel) or super-crystal (endcap).
    #[must_use]
    pub fn tower_raw_id(&self) -> RawId {
        match self {
            Crystal::Barrel(id) => id.tower().raw_id(),
            Crystal::Endcap(id) => id.sc().raw_id(),
        }
    }
}

/// Translate module-local `(ix, iy)` of module `ism` into a crystal.
///
/// - Barrel: crystal number `(ix-1) + 20*(iy-1) + 1` inside supermodule `ism`;
///   [`MaskError::InvalidDetId`] when it overflows or lies outside the module.
/// - Endcap: global `(ix + ix0, iy + iy0)` on the side of sector `ism`;
///   `None` when the sum overflows or the geometry rejects it.
/// - Anything else: [`MaskError::InvalidSubdetector`].
pub fn locate_crystal(
    geometry: &dyn Geometry,
    ism: i32,
    ix: i32,
    iy: i32,
    subdet: EcalSubdetector,
) -> Result<Option<Crystal>, MaskError> {
    match subdet {
        EcalSubdetector::Barrel => {
            let ic = checked_ic_eb(ix, iy).ok_or_else(|| {
                MaskError::InvalidDetId(format!(
                    "barrel supermodule={} ix={} iy={}",
                    ism, ix, iy
                ))
            })?;
            let id = EbDetId::from_sm_crystal(ism, ic)?;
            Ok(Some(Crystal::Barrel(id)))
        }
        EcalSubdetector::Endcap => {
            let (Some(jx), Some(jy)) = (
                ix.checked_add(geometry.ix0(ism)),
                iy.checked_add(geometry.iy0(ism)),
            ) else {
                return Ok(None);
            };
            if !geometry.valid_ee(ism, jx, jy) {
                return Ok(None);
            }
            let id = EeDetId::new(jx, jy, endcap_side(ism))?;
            Ok(Some(Crystal::Endcap(id)))
        }
        other => Err(MaskError::InvalidSubdetector(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endcap_side_follows_sector() {
        let minus = locate_crystal(&EcalGeometry, 4, 20, 25, EcalSubdetector::Endcap)
            .expect("locate")
            .expect("crystal");
        let plus = locate_crystal(&EcalGeometry, 13, 20, 25, EcalSubdetector::Endcap)
            .expect("locate")
            .expect("crystal");
        assert!(matches!(minus, Crystal::Endcap(id) if id.zside() == -1));
        assert!(matches!(plus, Crystal::Endcap(id) if id.zside() == 1));
    }

    #[test]
    fn outside_sector_is_none() {
        let located = locate_crystal(&EcalGeometry, 4, 50, 50, EcalSubdetector::Endcap)
            .expect("locate");
        assert!(located.is_none());
    }

    #[test]
    fn other_subdetectors_rejected() {
        for subdet in [
            EcalSubdetector::Preshower,
            EcalSubdetector::TriggerTower,
            EcalSubdetector::LaserPnDiode,
        ] {
            assert!(matches!(
                locate_crystal(&EcalGeometry, 1, 1, 1, subdet),
                Err(MaskError::InvalidSubdetector(s)) if s == subdet
            ));
        }
    }
}
