//! Local-to-global coordinate helpers: barrel crystal numbering, endcap sector offsets and validity.
//!
//! Each endcap sector is displayed as a 50×50 window of local coordinates.
//! The offsets below place that window on the 100×100 global grid.

use crate::geometry::EeDetId;
use crate::primitives::{EB_CRYSTALS_IN_PHI, EE_NEGATIVE_SECTORS, EE_SECTORS, EE_SECTOR_WINDOW};

/// Linear crystal number inside a barrel supermodule for local `(ix, iy)`.
#[must_use]
pub const fn ic_eb(ix: i32, iy: i32) -> i32 {
    (ix - 1) + EB_CRYSTALS_IN_PHI * (iy - 1) + 1
}

/// [`ic_eb`] for untrusted input: `None` when the crystal number does not fit in an `i32`.
#[must_use]
pub const fn checked_ic_eb(ix: i32, iy: i32) -> Option<i32> {
    let Some(row) = iy.checked_sub(1) else {
        return None;
    };
    let Some(row_start) = row.checked_mul(EB_CRYSTALS_IN_PHI) else {
        return None;
    };
    match row_start.checked_add(ix) {
        Some(ic) => Some(ic),
        None => None,
    }
}

/// Global x offset of an endcap sector window.
///
/// Unknown sectors have a zero offset; [`valid_ee`] rejects them anyway.
#[must_use]
pub fn ix0_ee(ism: i32) -> i32 {
    match ism {
        1 | 15 => -5,
        2 | 14 => 0,
        3 | 13 => 10,
        4 | 12 => 40,
        5 | 11 => 50,
        6 | 10 => 55,
        7 | 18 => 50,
        8 | 17 => 25,
        9 | 16 => 0,
        _ => 0,
    }
}

/// Global y offset of an endcap sector window.
#[must_use]
pub fn iy0_ee(ism: i32) -> i32 {
    match ism {
        1 | 10 => 20,
        2 | 11 => 45,
        3 | 12 => 55,
        4 | 13 => 55,
        5 | 14 => 45,
        6 | 15 => 20,
        7 | 16 => 0,
        8 | 17 => -5,
        9 | 18 => 0,
        _ => 0,
    }
}

/// Side of an endcap sector: `-1` for sectors 1–9, `+1` otherwise.
#[must_use]
pub fn endcap_side(ism: i32) -> i32 {
    if (1..=EE_NEGATIVE_SECTORS).contains(&ism) {
        -1
    } else {
        1
    }
}

/// Whether global `(jx, jy)` is a crystal inside sector `ism`'s window.
#[must_use]
pub fn valid_ee(ism: i32, jx: i32, jy: i32) -> bool {
    if !(1..=EE_SECTORS).contains(&ism) {
        return false;
    }
    let (Some(lx), Some(ly)) = (jx.checked_sub(ix0_ee(ism)), jy.checked_sub(iy0_ee(ism))) else {
        return false;
    };
    if !(1..=EE_SECTOR_WINDOW).contains(&lx) || !(1..=EE_SECTOR_WINDOW).contains(&ly) {
        return false;
    }
    EeDetId::valid(jx, jy, endcap_side(ism))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barrel_linear_index() {
        assert_eq!(ic_eb(1, 1), 1);
        assert_eq!(ic_eb(3, 2), 23);
        assert_eq!(ic_eb(20, 85), 1700);
        assert_eq!(checked_ic_eb(3, 2), Some(23));
        assert_eq!(checked_ic_eb(1, i32::MAX), None);
        assert_eq!(checked_ic_eb(i32::MAX, 1), Some(i32::MAX));
        assert_eq!(checked_ic_eb(3, i32::MIN), None);
    }

    #[test]
    fn side_split() {
        for ism in 1..=9 {
            assert_eq!(endcap_side(ism), -1);
        }
        for ism in 10..=18 {
            assert_eq!(endcap_side(ism), 1);
        }
    }

    #[test]
    fn mirrored_sectors_share_offsets() {
        assert_eq!(ix0_ee(4), ix0_ee(12));
        assert_eq!(iy0_ee(4), iy0_ee(13));
    }

    #[test]
    fn window_and_dee_both_required() {
        // Sector 4 window spans x 41..=90, y 56..=105.
        assert!(valid_ee(4, 60, 80));
        assert!(!valid_ee(4, 30, 80)); // outside the window
        assert!(!valid_ee(4, 90, 100)); // outside the dee
        assert!(!valid_ee(0, 60, 80));
        assert!(!valid_ee(19, 60, 80));
    }
}
