//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the masking engine is INVALID.
//!
//! ## Tiers
//! - T0: Initialization
//! - T1: Subdetector Dispatch
//! - T2: Channel and Tower Queries
//! - T3: Epochs, Payloads and Storage

use ecalmask_core::{
    ConditionsEpoch, ConditionsSource, EbDetId, EcalSubdetector, EeDetId, EpochId, Geometry,
    MaskError, MaskResolver, MaskSnapshot, RawId, RecordKind, StatusCode, StatusTable,
};
use std::cell::Cell;
use std::sync::Arc;

/// Provider that counts every question it is asked.
struct CountingSource {
    inner: ConditionsEpoch,
    has_calls: Cell<usize>,
    record_calls: Cell<usize>,
}

impl CountingSource {
    fn new(inner: ConditionsEpoch) -> Self {
        Self {
            inner,
            has_calls: Cell::new(0),
            record_calls: Cell::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.has_calls.get() + self.record_calls.get()
    }
}

impl ConditionsSource for CountingSource {
    fn epoch(&self) -> EpochId {
        self.inner.epoch()
    }

    fn has_record(&self, kind: RecordKind) -> bool {
        self.has_calls.set(self.has_calls.get() + 1);
        self.inner.has_record(kind)
    }

    fn record(&self, kind: RecordKind) -> Option<Arc<StatusTable>> {
        self.record_calls.set(self.record_calls.get() + 1);
        self.inner.record(kind)
    }
}

/// Geometry that accepts no endcap position.
#[derive(Debug)]
struct NoCrystals;

impl Geometry for NoCrystals {
    fn ix0(&self, _ism: i32) -> i32 {
        0
    }

    fn iy0(&self, _ism: i32) -> i32 {
        0
    }

    fn valid_ee(&self, _ism: i32, _jx: i32, _jy: i32) -> bool {
        false
    }
}

fn table(entries: &[(RawId, u32)]) -> StatusTable {
    entries
        .iter()
        .map(|&(id, bits)| (id, StatusCode::new(bits)))
        .collect()
}

fn barrel_id(sm: i32, ix: i32, iy: i32) -> EbDetId {
    EbDetId::from_sm_crystal(sm, ecalmask_core::geometry::ic_eb(ix, iy))
        .expect("valid barrel crystal")
}

// =============================================================================
// TIER T0: INITIALIZATION
// =============================================================================

mod t0_initialization {
    use super::*;

    /// T0.1: Only the channel record exists; it is bound, the tower table is not.
    #[test]
    fn channel_only_provider_binds_channel_table() {
        let channels = table(&[(barrel_id(1, 1, 1).raw_id(), 0x1)]);
        let source = CountingSource::new(ConditionsEpoch::new(EpochId(1)).with_channel_status(channels));

        let mut resolver = MaskResolver::new();
        resolver.init_masking(&source, false);

        let snapshot = resolver.snapshot();
        assert!(snapshot.table(RecordKind::ChannelStatus).is_some());
        assert!(snapshot.table(RecordKind::TowerStatus).is_none());
        assert_eq!(resolver.bound_epoch(), Some(EpochId(1)));
    }

    /// T0.2: A second initialization never queries the provider.
    #[test]
    fn second_init_is_strict_noop() {
        let source = CountingSource::new(
            ConditionsEpoch::new(EpochId(1)).with_channel_status(table(&[])),
        );
        let mut resolver = MaskResolver::new();
        resolver.init_masking(&source, true);
        let after_first = source.calls();
        assert!(after_first > 0);

        let other = CountingSource::new(ConditionsEpoch::new(EpochId(2)));
        resolver.init_masking(&source, true);
        resolver.init_masking(&other, true);

        assert_eq!(source.calls(), after_first);
        assert_eq!(other.calls(), 0);
        assert_eq!(resolver.bound_epoch(), Some(EpochId(1)));
    }

    /// T0.3: Before initialization nothing is masked.
    #[test]
    fn uninitialized_resolver_masks_nothing() {
        let resolver = MaskResolver::new();
        assert!(!resolver.is_initialized());
        assert!(!resolver
            .mask_channel(1, 1, 1, u32::MAX, EcalSubdetector::Barrel)
            .expect("query"));
        assert!(!resolver
            .mask_tower(1, 1, 1, u32::MAX, EcalSubdetector::Barrel)
            .expect("query"));
    }
}

// =============================================================================
// TIER T1: SUBDETECTOR DISPATCH
// =============================================================================

mod t1_subdetector_dispatch {
    use super::*;

    /// T1.1: Every subdetector other than barrel and endcap is rejected.
    #[test]
    fn non_crystal_subdetectors_rejected() {
        let snapshot = MaskSnapshot::resolve(&ConditionsEpoch::new(EpochId(1)), false);
        for subdet in [
            EcalSubdetector::Preshower,
            EcalSubdetector::TriggerTower,
            EcalSubdetector::LaserPnDiode,
        ] {
            for (ism, ix, iy, bits) in [(1, 1, 1, 0x1), (9, 20, 30, 0), (40, -1, 500, u32::MAX)] {
                let channel = snapshot.mask_channel(ism, ix, iy, bits, subdet);
                let tower = snapshot.mask_tower(ism, ix, iy, bits, subdet);
                assert!(matches!(channel, Err(MaskError::InvalidSubdetector(s)) if s == subdet));
                assert!(matches!(tower, Err(MaskError::InvalidSubdetector(s)) if s == subdet));
            }
        }
    }

    /// T1.2: The error names the offending subdetector.
    #[test]
    fn error_message_names_tag() {
        let snapshot = MaskSnapshot::empty();
        let err = snapshot
            .mask_channel(1, 1, 1, 1, EcalSubdetector::Preshower)
            .expect_err("rejected");
        assert!(err.to_string().contains("Invalid subdetector"));
        assert!(err.to_string().contains(&EcalSubdetector::Preshower.tag().to_string()));
    }

    /// T1.3: Endcap sectors 1-9 sit on the negative side, 10-18 on the positive.
    #[test]
    fn endcap_side_by_sector() {
        use ecalmask_core::{EcalGeometry, locate_crystal};
        let mut checked = 0;
        for ism in 1..=18 {
            let located = locate_crystal(&EcalGeometry, ism, 20, 25, EcalSubdetector::Endcap)
                .expect("endcap accepted");
            let Some(crystal) = located else { continue };
            let positive = crystal.raw_id().value() & 0x4000 != 0;
            assert_eq!(positive, ism >= 10, "sector {}", ism);

            let channels = table(&[(crystal.raw_id(), 0x1)]);
            let snapshot = MaskSnapshot::resolve(
                &ConditionsEpoch::new(EpochId(1)).with_channel_status(channels),
                false,
            );
            assert!(snapshot
                .mask_channel(ism, 20, 25, 0x1, EcalSubdetector::Endcap)
                .expect("query"));
            checked += 1;
        }
        assert!(checked >= 2);
    }
}

// =============================================================================
// TIER T2: CHANNEL AND TOWER QUERIES
// =============================================================================

mod t2_queries {
    use super::*;

    /// T2.1: No tables bound means nothing is masked.
    #[test]
    fn unbound_tables_mask_nothing() {
        let snapshot = MaskSnapshot::resolve(&ConditionsEpoch::new(EpochId(3)), false);
        for ism in [1, 18, 19, 36] {
            for (ix, iy) in [(1, 1), (20, 85), (7, 40)] {
                assert!(!snapshot
                    .mask_channel(ism, ix, iy, u32::MAX, EcalSubdetector::Barrel)
                    .expect("query"));
                assert!(!snapshot
                    .mask_tower(ism, ix, iy, u32::MAX, EcalSubdetector::Barrel)
                    .expect("query"));
            }
        }
        assert!(!snapshot
            .mask_channel(4, 20, 25, u32::MAX, EcalSubdetector::Endcap)
            .expect("query"));
    }

    /// T2.2: Barrel (5, 3, 2) is crystal 23 of supermodule 5 and is masked by
    /// its channel status alone.
    #[test]
    fn barrel_channel_status_masks_without_tower() {
        let id = EbDetId::from_sm_crystal(5, 23).expect("valid");
        assert_eq!(id, barrel_id(5, 3, 2));

        let snapshot = MaskSnapshot::resolve(
            &ConditionsEpoch::new(EpochId(1))
                .with_channel_status(table(&[(id.raw_id(), 0x1)]))
                .with_tower_status(table(&[])),
            false,
        );
        assert!(snapshot
            .mask_channel(5, 3, 2, 0x1, EcalSubdetector::Barrel)
            .expect("query"));
        assert!(!snapshot
            .mask_tower(5, 3, 2, 0x1, EcalSubdetector::Barrel)
            .expect("query"));
    }

    /// T2.3: An invalid endcap position is never masked and never falls back
    /// to the tower record.
    #[test]
    fn invalid_endcap_position_not_masked() {
        let ee = EeDetId::new(30, 50, -1).expect("valid endcap crystal");
        let epoch = ConditionsEpoch::new(EpochId(1))
            .with_channel_status(table(&[(ee.raw_id(), u32::MAX)]))
            .with_tower_status(table(&[(ee.sc().raw_id(), u32::MAX)]));

        let snapshot = MaskSnapshot::resolve_with_geometry(&epoch, Arc::new(NoCrystals), false);
        assert!(!snapshot
            .mask_channel(4, 30, 50, u32::MAX, EcalSubdetector::Endcap)
            .expect("query"));
        assert!(!snapshot
            .mask_tower(4, 30, 50, u32::MAX, EcalSubdetector::Endcap)
            .expect("query"));
    }

    /// T2.4: The mask test is a bitwise intersection.
    #[test]
    fn bitwise_intersection() {
        let id = barrel_id(2, 4, 4).raw_id();
        let snapshot = MaskSnapshot::resolve(
            &ConditionsEpoch::new(EpochId(1)).with_channel_status(table(&[(id, 0x6)])),
            false,
        );
        assert!(!snapshot
            .mask_channel(2, 4, 4, 0x1, EcalSubdetector::Barrel)
            .expect("query"));
        assert!(snapshot
            .mask_channel(2, 4, 4, 0x2, EcalSubdetector::Barrel)
            .expect("query"));
        assert!(!snapshot
            .mask_channel(2, 4, 4, 0, EcalSubdetector::Barrel)
            .expect("query"));
    }

    /// T2.5: A masked barrel tower masks all 25 of its crystals.
    #[test]
    fn barrel_tower_propagates() {
        let tower = barrel_id(7, 3, 3).tower().raw_id();
        let snapshot = MaskSnapshot::resolve(
            &ConditionsEpoch::new(EpochId(1)).with_tower_status(table(&[(tower, 0x8)])),
            false,
        );

        let mut masked = 0;
        for ix in 1..=20 {
            for iy in 1..=85 {
                let channel = snapshot
                    .mask_channel(7, ix, iy, 0x8, EcalSubdetector::Barrel)
                    .expect("query");
                let by_tower = snapshot
                    .mask_tower(7, ix, iy, 0x8, EcalSubdetector::Barrel)
                    .expect("query");
                assert_eq!(channel, by_tower);
                if channel {
                    masked += 1;
                }
            }
        }
        assert_eq!(masked, 25);
    }

    /// T2.6: A masked endcap super-crystal masks its 25 crystals.
    #[test]
    fn endcap_super_crystal_propagates() {
        // Sector 14 window starts at global (1, 46); local (21, 6) is global (21, 51).
        let ee = EeDetId::new(21, 51, 1).expect("valid");
        let snapshot = MaskSnapshot::resolve(
            &ConditionsEpoch::new(EpochId(1)).with_tower_status(table(&[(ee.sc().raw_id(), 0x1)])),
            false,
        );

        let scan = snapshot
            .scan_module(14, 0x1, EcalSubdetector::Endcap)
            .expect("scan");
        assert_eq!(scan.tower_masked(), 25);
        assert_eq!(scan.channel_masked(), 0);
        assert!(scan.masked.iter().all(|p| (21..=25).contains(&p.ix) && (6..=10).contains(&p.iy)));

        // The negative side is unaffected.
        assert!(!snapshot
            .mask_channel(5, 21, 6, 0x1, EcalSubdetector::Endcap)
            .expect("query"));
    }

    /// T2.7: Extreme coordinates never alias onto a real crystal.
    #[test]
    fn extreme_coordinates_rejected() {
        // 20 * (iy - 1) wraps to 20 for this iy, which would alias onto crystal 23.
        let aliasing_iy = 1_073_741_826;
        let id = barrel_id(5, 3, 2).raw_id();
        let ee = EeDetId::new(21, 51, 1).expect("valid");
        let snapshot = MaskSnapshot::resolve(
            &ConditionsEpoch::new(EpochId(1))
                .with_channel_status(table(&[(id, u32::MAX), (ee.raw_id(), u32::MAX)]))
                .with_tower_status(table(&[(ee.sc().raw_id(), u32::MAX)])),
            false,
        );

        let barrel = [
            (3, aliasing_iy),
            (1, i32::MAX),
            (1, i32::MIN),
            (i32::MAX, 1),
            (i32::MIN, 1),
            (i32::MAX, i32::MAX),
        ];
        for (ix, iy) in barrel {
            assert!(matches!(
                snapshot.mask_channel(5, ix, iy, u32::MAX, EcalSubdetector::Barrel),
                Err(MaskError::InvalidDetId(_))
            ));
            assert!(matches!(
                snapshot.mask_tower(5, ix, iy, u32::MAX, EcalSubdetector::Barrel),
                Err(MaskError::InvalidDetId(_))
            ));
        }

        let endcap = [
            (i32::MAX, 1),
            (1, i32::MAX),
            (i32::MIN, i32::MIN),
            (i32::MAX, i32::MAX),
        ];
        for ism in [10, 14, 6] {
            for (ix, iy) in endcap {
                assert!(!snapshot
                    .mask_channel(ism, ix, iy, u32::MAX, EcalSubdetector::Endcap)
                    .expect("query"));
                assert!(!snapshot
                    .mask_tower(ism, ix, iy, u32::MAX, EcalSubdetector::Endcap)
                    .expect("query"));
            }
        }
    }
}

// =============================================================================
// TIER T3: EPOCHS, PAYLOADS AND STORAGE
// =============================================================================

mod t3_epochs_and_storage {
    use super::*;
    use ecalmask_core::{
        ConditionsPayload, ConditionsStore, SharedMasks, payload_from_bytes, payload_to_bytes,
    };

    /// T3.1: Payload encode/decode preserves both tables.
    #[test]
    fn payload_preserves_tables() {
        let payload = ConditionsPayload {
            epoch: EpochId(11),
            channel_status: Some(table(&[(barrel_id(1, 1, 1).raw_id(), 0x3)])),
            tower_status: Some(table(&[(barrel_id(1, 1, 1).tower().raw_id(), 0x4)])),
        };
        let restored = payload_from_bytes(&payload_to_bytes(&payload).expect("encode"))
            .expect("decode");
        assert_eq!(restored, payload);
    }

    /// T3.2: The store selects the epoch whose interval contains the run.
    #[test]
    fn store_selects_interval() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut store = ConditionsStore::open(temp.path().join("iov.redb")).expect("open");
        let empty = ConditionsPayload::default();
        store.put_epoch(1000, empty.clone()).expect("put");
        store.put_epoch(2000, empty).expect("put");

        assert_eq!(store.epoch_for_run(1500).expect("run").epoch, EpochId(1000));
        assert_eq!(store.epoch_for_run(2500).expect("run").epoch, EpochId(2000));
        assert!(matches!(
            store.epoch_for_run(999),
            Err(MaskError::EpochNotFound(999))
        ));
    }

    /// T3.3: Shared masks swap only when the epoch changes.
    #[test]
    fn shared_masks_swap_on_new_epoch() {
        let shared = SharedMasks::default();
        let first = ConditionsEpoch::new(EpochId(1));
        assert!(shared.refresh_from(&first, false));
        assert!(!shared.refresh_from(&first, false));

        let id = barrel_id(3, 1, 1).raw_id();
        let second = ConditionsEpoch::new(EpochId(2)).with_channel_status(table(&[(id, 0x1)]));
        assert!(shared.refresh_from(&second, false));
        assert_eq!(shared.current().epoch(), Some(EpochId(2)));
        assert!(shared
            .mask_channel(3, 1, 1, 0x1, EcalSubdetector::Barrel)
            .expect("query"));
    }
}
