//! # Conditions Module
//!
//! The conditions provider seam and its in-memory implementation.
//!
//! A provider answers two questions for the current epoch: does a record of
//! kind K exist, and what is it. The resolver never mutates a provider.

use crate::status::{RecordKind, StatusTable};
use crate::EpochId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Source of status records for one conditions epoch.
///
/// `has_record` may report a record that `record` then fails to produce
/// (an invalid handle); callers treat that as an absent record.
pub trait ConditionsSource {
    /// Epoch the records belong to.
    fn epoch(&self) -> EpochId;

    /// Whether a record of `kind` exists for this epoch.
    fn has_record(&self, kind: RecordKind) -> bool;

    /// Fetch the record of `kind`.
    fn record(&self, kind: RecordKind) -> Option<Arc<StatusTable>>;
}

// =============================================================================
// IN-MEMORY EPOCH
// =============================================================================

/// An in-memory conditions epoch holding up to one table of each kind.
#[derive(Debug, Clone, Default)]
pub struct ConditionsEpoch {
    epoch: EpochId,
    channel_status: Option<Arc<StatusTable>>,
    tower_status: Option<Arc<StatusTable>>,
}

impl ConditionsEpoch {
    /// Create an epoch carrying no records.
    #[must_use]
    pub fn new(epoch: EpochId) -> Self {
        Self {
            epoch,
            channel_status: None,
            tower_status: None,
        }
    }

    /// Attach a channel status table.
    #[must_use]
    pub fn with_channel_status(mut self, table: StatusTable) -> Self {
        self.channel_status = Some(Arc::new(table));
        self
    }

    /// Attach a tower status table.
    #[must_use]
    pub fn with_tower_status(mut self, table: StatusTable) -> Self {
        self.tower_status = Some(Arc::new(table));
        self
    }

    /// Borrow a table without cloning the `Arc`.
    #[must_use]
    pub fn table(&self, kind: RecordKind) -> Option<&StatusTable> {
        match kind {
            RecordKind::ChannelStatus => self.channel_status.as_deref(),
            RecordKind::TowerStatus => self.tower_status.as_deref(),
        }
    }
}

impl ConditionsSource for ConditionsEpoch {
    fn epoch(&self) -> EpochId {
        self.epoch
    }

    fn has_record(&self, kind: RecordKind) -> bool {
        self.table(kind).is_some()
    }

    fn record(&self, kind: RecordKind) -> Option<Arc<StatusTable>> {
        match kind {
            RecordKind::ChannelStatus => self.channel_status.clone(),
            RecordKind::TowerStatus => self.tower_status.clone(),
        }
    }
}

// =============================================================================
// SERIALIZABLE FORM
// =============================================================================

/// Owned, serializable form of a conditions epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionsPayload {
    /// Epoch identifier.
    pub epoch: EpochId,
    /// Channel status table, if the epoch carries one.
    pub channel_status: Option<StatusTable>,
    /// Tower status table, if the epoch carries one.
    pub tower_status: Option<StatusTable>,
}

impl ConditionsPayload {
    /// Number of entries across both tables.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.channel_status.as_ref().map_or(0, StatusTable::len)
            + self.tower_status.as_ref().map_or(0, StatusTable::len)
    }

    /// Table of `kind`, if present.
    #[must_use]
    pub fn table(&self, kind: RecordKind) -> Option<&StatusTable> {
        match kind {
            RecordKind::ChannelStatus => self.channel_status.as_ref(),
            RecordKind::TowerStatus => self.tower_status.as_ref(),
        }
    }
}

impl From<ConditionsPayload> for ConditionsEpoch {
    fn from(payload: ConditionsPayload) -> Self {
        Self {
            epoch: payload.epoch,
            channel_status: payload.channel_status.map(Arc::new),
            tower_status: payload.tower_status.map(Arc::new),
        }
    }
}

impl From<&ConditionsEpoch> for ConditionsPayload {
    fn from(epoch: &ConditionsEpoch) -> Self {
        Self {
            epoch: epoch.epoch,
            channel_status: epoch.table(RecordKind::ChannelStatus).cloned(),
            tower_status: epoch.table(RecordKind::TowerStatus).cloned(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RawId, StatusCode};

    #[test]
    fn empty_epoch_has_no_records() {
        let epoch = ConditionsEpoch::new(EpochId(3));
        assert_eq!(epoch.epoch(), EpochId(3));
        for kind in RecordKind::ALL {
            assert!(!epoch.has_record(kind));
            assert!(epoch.record(kind).is_none());
        }
    }

    #[test]
    fn records_are_shared_not_copied() {
        let table: StatusTable = [(RawId(1), StatusCode::new(1))].into_iter().collect();
        let epoch = ConditionsEpoch::new(EpochId(1)).with_channel_status(table);

        let a = epoch.record(RecordKind::ChannelStatus).expect("present");
        let b = epoch.record(RecordKind::ChannelStatus).expect("present");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!epoch.has_record(RecordKind::TowerStatus));
    }

    #[test]
    fn payload_conversion_keeps_tables() {
        let table: StatusTable = [(RawId(9), StatusCode::new(4))].into_iter().collect();
        let payload = ConditionsPayload {
            epoch: EpochId(42),
            channel_status: None,
            tower_status: Some(table.clone()),
        };
        let epoch = ConditionsEpoch::from(payload.clone());
        assert_eq!(epoch.table(RecordKind::TowerStatus), Some(&table));
        assert_eq!(ConditionsPayload::from(&epoch), payload);
        assert_eq!(payload.entry_count(), 1);
        assert_eq!(payload.table(RecordKind::TowerStatus), Some(&table));
        assert!(payload.table(RecordKind::ChannelStatus).is_none());
    }
}
