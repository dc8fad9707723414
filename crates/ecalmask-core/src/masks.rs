//! # Masks Module
//!
//! Channel and tower mask queries over the status tables of one conditions
//! epoch.
//!
//! ## Layers
//!
//! - [`MaskSnapshot`]: immutable binding of the two tables plus the endcap
//!   geometry. All queries live here.
//! - [`MaskResolver`]: one-way `Uninitialized -> Initialized` state machine
//!   over a snapshot. Re-initialization is a no-op.
//! - [`SharedMasks`]: a snapshot published behind a read-write lock, swapped
//!   wholesale when a new epoch is resolved.
//!
//! ## Query semantics
//!
//! A channel is masked when its own status, or the status of the tower
//! (barrel) / super-crystal (endcap) containing it, shares a bit with the
//! requested mask. Absent tables never mask. Endcap coordinates outside the
//! sector are never masked.

use crate::conditions::ConditionsSource;
use crate::geometry::{Crystal, EcalGeometry, Geometry, locate_crystal};
use crate::status::{RecordKind, StatusTable};
use crate::{EcalSubdetector, EpochId, MaskError};
use parking_lot::RwLock;
use std::sync::Arc;

// =============================================================================
// MASK HIT
// =============================================================================

/// Which record kinds matched for one crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskHit {
    /// The crystal's own status matched.
    pub channel: bool,
    /// The tower or super-crystal status matched.
    pub tower: bool,
}

impl MaskHit {
    /// Whether either record matched.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.channel || self.tower
    }
}

// =============================================================================
// MASK SNAPSHOT
// =============================================================================

/// Status tables of one conditions epoch, bound for querying.
///
/// Either table may be absent; an absent table never masks.
#[derive(Debug, Clone)]
pub struct MaskSnapshot {
    epoch: Option<EpochId>,
    channel_status: Option<Arc<StatusTable>>,
    tower_status: Option<Arc<StatusTable>>,
    geometry: Arc<dyn Geometry>,
}

impl Default for MaskSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl MaskSnapshot {
    /// A snapshot with no tables bound; every query answers "not masked".
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with_geometry(Arc::new(EcalGeometry))
    }

    /// An empty snapshot using a custom endcap geometry.
    #[must_use]
    pub fn empty_with_geometry(geometry: Arc<dyn Geometry>) -> Self {
        Self {
            epoch: None,
            channel_status: None,
            tower_status: None,
            geometry,
        }
    }

    /// Bind the tables of `source` using the standard geometry.
    #[must_use]
    pub fn resolve(source: &dyn ConditionsSource, verbose: bool) -> Self {
        Self::resolve_with_geometry(source, Arc::new(EcalGeometry), verbose)
    }

    /// Bind the tables of `source`.
    ///
    /// For each record kind the provider is asked whether the record exists
    /// and, if so, for the record itself. Missing records are left unbound.
    #[must_use]
    pub fn resolve_with_geometry(
        source: &dyn ConditionsSource,
        geometry: Arc<dyn Geometry>,
        verbose: bool,
    ) -> Self {
        let epoch = source.epoch();
        if verbose {
            tracing::info!(epoch = epoch.0, "Initializing channel/tower status ...");
        }

        let bind = |kind: RecordKind| -> Option<Arc<StatusTable>> {
            if !source.has_record(kind) {
                tracing::debug!(epoch = epoch.0, record = %kind, "record absent, nothing masked");
                return None;
            }
            let table = source.record(kind);
            match &table {
                Some(t) => {
                    tracing::debug!(epoch = epoch.0, record = %kind, entries = t.len(), "record bound");
                }
                None => {
                    tracing::warn!(epoch = epoch.0, record = %kind, "record listed but not retrievable");
                }
            }
            table
        };

        let channel_status = bind(RecordKind::ChannelStatus);
        let tower_status = bind(RecordKind::TowerStatus);

        if verbose {
            tracing::info!(epoch = epoch.0, "done.");
        }

        Self {
            epoch: Some(epoch),
            channel_status,
            tower_status,
            geometry,
        }
    }

    /// Epoch the tables were resolved from; `None` for an empty snapshot.
    #[must_use]
    pub fn epoch(&self) -> Option<EpochId> {
        self.epoch
    }

    /// Bound table of `kind`, if any.
    #[must_use]
    pub fn table(&self, kind: RecordKind) -> Option<&StatusTable> {
        match kind {
            RecordKind::ChannelStatus => self.channel_status.as_deref(),
            RecordKind::TowerStatus => self.tower_status.as_deref(),
        }
    }

    /// Endcap geometry used for coordinate translation.
    #[must_use]
    pub fn geometry(&self) -> &dyn Geometry {
        self.geometry.as_ref()
    }

    /// Whether the channel at module-local `(ix, iy)` is masked for `bits`.
    ///
    /// Checks the crystal's own status, then the tower containing it.
    pub fn mask_channel(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        Ok(match self.locate(ism, ix, iy, subdet)? {
            Some(crystal) => self.channel_matches(crystal, bits) || self.tower_matches(crystal, bits),
            None => false,
        })
    }

    /// Whether the tower or super-crystal containing module-local `(ix, iy)`
    /// is masked for `bits`.
    pub fn mask_tower(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        Ok(match self.locate(ism, ix, iy, subdet)? {
            Some(crystal) => self.tower_matches(crystal, bits),
            None => false,
        })
    }

    /// Per-record breakdown for one position; `None` when the position is
    /// not a crystal of the module.
    pub fn classify(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<Option<MaskHit>, MaskError> {
        Ok(self
            .locate(ism, ix, iy, subdet)?
            .map(|crystal| MaskHit {
                channel: self.channel_matches(crystal, bits),
                tower: self.tower_matches(crystal, bits),
            }))
    }

    fn locate(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        subdet: EcalSubdetector,
    ) -> Result<Option<Crystal>, MaskError> {
        locate_crystal(self.geometry.as_ref(), ism, ix, iy, subdet)
    }

    fn channel_matches(&self, crystal: Crystal, bits: u32) -> bool {
        let Some(table) = self.channel_status.as_deref() else {
            return false;
        };
        table.matches(crystal.raw_id(), bits)
    }

    fn tower_matches(&self, crystal: Crystal, bits: u32) -> bool {
        let Some(table) = self.tower_status.as_deref() else {
            return false;
        };
        table.matches(crystal.tower_raw_id(), bits)
    }
}

// =============================================================================
// MASK RESOLVER
// =============================================================================

/// One-way resolver state: `Uninitialized -> Initialized`.
///
/// Once initialized, [`init_masking`](Self::init_masking) returns without
/// touching the provider. There is no reset; a new epoch needs a new
/// resolver or a [`SharedMasks`].
#[derive(Debug, Clone)]
pub struct MaskResolver {
    snapshot: Arc<MaskSnapshot>,
    initialized: bool,
}

impl Default for MaskResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskResolver {
    /// Create an uninitialized resolver with the standard geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_geometry(Arc::new(EcalGeometry))
    }

    /// Create an uninitialized resolver with a custom endcap geometry.
    #[must_use]
    pub fn with_geometry(geometry: Arc<dyn Geometry>) -> Self {
        Self {
            snapshot: Arc::new(MaskSnapshot::empty_with_geometry(geometry)),
            initialized: false,
        }
    }

    /// Bind the status tables of `source`, once.
    pub fn init_masking(&mut self, source: &dyn ConditionsSource, verbose: bool) {
        if self.initialized {
            tracing::debug!("masking already initialized, ignoring");
            return;
        }
        self.initialized = true;
        self.snapshot = Arc::new(MaskSnapshot::resolve_with_geometry(
            source,
            Arc::clone(&self.snapshot.geometry),
            verbose,
        ));
    }

    /// Whether `init_masking` has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Epoch the tables were bound from.
    ///
    /// Compare against the provider's current epoch to detect stale tables.
    #[must_use]
    pub fn bound_epoch(&self) -> Option<EpochId> {
        self.snapshot.epoch()
    }

    /// Current snapshot; empty before initialization.
    #[must_use]
    pub fn snapshot(&self) -> Arc<MaskSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// See [`MaskSnapshot::mask_channel`].
    pub fn mask_channel(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        self.snapshot.mask_channel(ism, ix, iy, bits, subdet)
    }

    /// See [`MaskSnapshot::mask_tower`].
    pub fn mask_tower(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        self.snapshot.mask_tower(ism, ix, iy, bits, subdet)
    }
}

// =============================================================================
// SHARED MASKS
// =============================================================================

/// A snapshot shared across threads, replaced wholesale per epoch.
///
/// Readers clone the `Arc` under a short read lock, so every query sees one
/// consistent pair of tables.
#[derive(Debug, Default)]
pub struct SharedMasks {
    current: RwLock<Arc<MaskSnapshot>>,
}

impl SharedMasks {
    /// Share an initial snapshot.
    #[must_use]
    pub fn new(snapshot: MaskSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The snapshot currently published.
    #[must_use]
    pub fn current(&self) -> Arc<MaskSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Publish a snapshot, returning the one it replaces.
    pub fn publish(&self, snapshot: MaskSnapshot) -> Arc<MaskSnapshot> {
        let mut guard = self.current.write();
        std::mem::replace(&mut *guard, Arc::new(snapshot))
    }

    /// Resolve and publish `source` if its epoch differs from the current one.
    ///
    /// Returns `true` when a new snapshot was published.
    pub fn refresh_from(&self, source: &dyn ConditionsSource, verbose: bool) -> bool {
        let wanted = source.epoch();
        let current = self.current();
        if current.epoch() == Some(wanted) {
            return false;
        }

        let snapshot =
            MaskSnapshot::resolve_with_geometry(source, Arc::clone(&current.geometry), verbose);

        let mut guard = self.current.write();
        if guard.epoch() == Some(wanted) {
            return false;
        }
        tracing::info!(
            from = ?guard.epoch().map(|e| e.0),
            to = wanted.0,
            "conditions epoch changed, masks republished"
        );
        *guard = Arc::new(snapshot);
        true
    }

    /// See [`MaskSnapshot::mask_channel`].
    pub fn mask_channel(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        self.current().mask_channel(ism, ix, iy, bits, subdet)
    }

    /// See [`MaskSnapshot::mask_tower`].
    pub fn mask_tower(
        &self,
        ism: i32,
        ix: i32,
        iy: i32,
        bits: u32,
        subdet: EcalSubdetector,
    ) -> Result<bool, MaskError> {
        self.current().mask_tower(ism, ix, iy, bits, subdet)
    }
}

// =============================================================================
// TESTS
// =============================================================================
