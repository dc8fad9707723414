//! # Status Sheets
//!
//! Human-authored status input. A sheet lists entries in module-local
//! coordinates; converting it into a [`ConditionsPayload`] uses the same
//! translation as the mask queries, so an entry written for `(module, ix, iy)`
//! masks exactly that position.
//!
//! Parsing of the text formats (TOML, JSON) happens in the app layer.

use crate::conditions::ConditionsPayload;
use crate::geometry::{Geometry, locate_crystal};
use crate::primitives::MAX_SHEET_ENTRIES;
use crate::status::{RecordKind, StatusTable, flag_bits};
use crate::{EcalSubdetector, EpochId, MaskError, StatusCode};
use serde::{Deserialize, Serialize};

/// Record an entry is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SheetLevel {
    /// The crystal at the given position.
    #[default]
    Channel,
    /// The tower or super-crystal containing the given position.
    Tower,
}

impl SheetLevel {
    fn record(self) -> RecordKind {
        match self {
            SheetLevel::Channel => RecordKind::ChannelStatus,
            SheetLevel::Tower => RecordKind::TowerStatus,
        }
    }
}

/// One sheet line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub subdet: EcalSubdetector,
    pub module: i32,
    pub ix: i32,
    pub iy: i32,
    #[serde(default)]
    pub level: SheetLevel,
    /// Raw status bits.
    #[serde(default)]
    pub status: u32,
    /// Named status flags, OR-ed into `status`.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl SheetEntry {
    /// Combined status bits of this entry.
    pub fn status_bits(&self) -> Result<u32, MaskError> {
        let mut bits = self.status;
        for flag in &self.flags {
            bits |= flag_bits(flag)
                .ok_or_else(|| MaskError::InvalidSheet(format!("unknown status flag '{}'", flag)))?;
        }
        Ok(bits)
    }
}

/// A complete status sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSheet {
    /// Epoch the sheet describes, if the file names one.
    #[serde(default)]
    pub epoch: Option<u64>,
    #[serde(default)]
    pub entries: Vec<SheetEntry>,
}

impl StatusSheet {
    /// Translate the sheet into a conditions payload.
    ///
    /// `epoch` overrides the sheet's own epoch. A table is present in the
    /// payload only if at least one entry targets it. Entries hitting the
    /// same id OR their bits together.
    pub fn into_payload(
        self,
        epoch: Option<EpochId>,
        geometry: &dyn Geometry,
    ) -> Result<ConditionsPayload, MaskError> {
        if self.entries.len() > MAX_SHEET_ENTRIES {
            return Err(MaskError::InvalidSheet(format!(
                "{} entries exceeds maximum {}",
                self.entries.len(),
                MAX_SHEET_ENTRIES
            )));
        }

        let epoch = epoch.or(self.epoch.map(EpochId)).unwrap_or_default();
        let mut channel_status: Option<StatusTable> = None;
        let mut tower_status: Option<StatusTable> = None;

        for (line, entry) in self.entries.iter().enumerate() {
            let bits = entry.status_bits()?;
            if bits == 0 {
                return Err(MaskError::InvalidSheet(format!(
                    "entry {} has no status bits",
                    line + 1
                )));
            }

            let crystal = locate_crystal(geometry, entry.module, entry.ix, entry.iy, entry.subdet)
                .map_err(|e| MaskError::InvalidSheet(format!("entry {}: {}", line + 1, e)))?
                .ok_or_else(|| {
                    MaskError::InvalidSheet(format!(
                        "entry {}: ({}, {}) is not a crystal of {} module {}",
                        line + 1,
                        entry.ix,
                        entry.iy,
                        entry.subdet.name(),
                        entry.module
                    ))
                })?;

            let (table, id) = match entry.level.record() {
                RecordKind::ChannelStatus => (&mut channel_status, crystal.raw_id()),
                RecordKind::TowerStatus => (&mut tower_status, crystal.tower_raw_id()),
            };
            table
                .get_or_insert_with(StatusTable::new)
                .merge(id, StatusCode::new(bits));
        }

        Ok(ConditionsPayload {
            epoch,
            channel_status,
            tower_status,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{EcalGeometry, EbDetId, ic_eb};

    fn entry(subdet: EcalSubdetector, module: i32, ix: i32, iy: i32, status: u32) -> SheetEntry {
        SheetEntry {
            subdet,
            module,
            ix,
            iy,
            level: SheetLevel::Channel,
            status,
            flags: Vec::new(),
        }
    }

    #[test]
    fn channel_entries_land_in_channel_table() {
        let sheet = StatusSheet {
            epoch: Some(7),
            entries: vec![entry(EcalSubdetector::Barrel, 5, 3, 2, 0x1)],
        };
        let payload = sheet.into_payload(None, &EcalGeometry).expect("convert");

        let id = EbDetId::from_sm_crystal(5, ic_eb(3, 2)).expect("valid").raw_id();
        assert_eq!(payload.epoch, EpochId(7));
        assert_eq!(
            payload.channel_status.as_ref().and_then(|t| t.get(id)),
            Some(StatusCode::new(0x1))
        );
        assert!(payload.tower_status.is_none());
    }

    #[test]
    fn tower_entries_and_flags() {
        let mut tower = entry(EcalSubdetector::Barrel, 1, 1, 1, 0);
        tower.level = SheetLevel::Tower;
        tower.flags = vec!["tt-id-error".to_string()];
        let sheet = StatusSheet {
            epoch: None,
            entries: vec![tower],
        };
        let payload = sheet
            .into_payload(Some(EpochId(3)), &EcalGeometry)
            .expect("convert");
        assert_eq!(payload.epoch, EpochId(3));
        let towers = payload.tower_status.expect("tower table");
        assert_eq!(towers.len(), 1);
        assert_eq!(towers.count_matching(1 << 3), 1);
    }

    #[test]
    fn repeated_entries_merge() {
        let sheet = StatusSheet {
            epoch: None,
            entries: vec![
                entry(EcalSubdetector::Barrel, 2, 1, 1, 0x2),
                entry(EcalSubdetector::Barrel, 2, 1, 1, 0x4),
            ],
        };
        let payload = sheet.into_payload(None, &EcalGeometry).expect("convert");
        let table = payload.channel_status.expect("channel table");
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().map(|(_, s)| s), Some(StatusCode::new(0x6)));
    }

    #[test]
    fn invalid_positions_rejected() {
        let outside = StatusSheet {
            epoch: None,
            entries: vec![entry(EcalSubdetector::Endcap, 4, 50, 50, 1)],
        };
        assert!(matches!(
            outside.into_payload(None, &EcalGeometry),
            Err(MaskError::InvalidSheet(_))
        ));

        let wrong_subdet = StatusSheet {
            epoch: None,
            entries: vec![entry(EcalSubdetector::Preshower, 1, 1, 1, 1)],
        };
        assert!(wrong_subdet.into_payload(None, &EcalGeometry).is_err());

        let no_bits = StatusSheet {
            epoch: None,
            entries: vec![entry(EcalSubdetector::Barrel, 1, 1, 1, 0)],
        };
        assert!(no_bits.into_payload(None, &EcalGeometry).is_err());
    }
}
