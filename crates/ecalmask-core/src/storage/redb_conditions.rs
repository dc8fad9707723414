//! # redb-backed Conditions Store
//!
//! Conditions epochs persisted in a redb embedded database.
//!
//! Each epoch is stored under the first run of its interval of validity, as
//! an encoded payload (header + postcard). An epoch covers every run from its
//! first run up to, but excluding, the next stored first run.

use crate::conditions::ConditionsPayload;
use crate::formats::{payload_from_bytes, payload_to_bytes};
use crate::primitives::FORMAT_VERSION;
use crate::{EpochId, MaskError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for epochs: first run (u64) -> encoded payload bytes
const EPOCHS: TableDefinition<u64, &[u8]> = TableDefinition::new("epochs");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// A disk-backed store of conditions epochs.
pub struct ConditionsStore {
    db: Database,
}

impl std::fmt::Debug for ConditionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionsStore").finish_non_exhaustive()
    }
}

impl ConditionsStore {
    /// Open or create a conditions store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MaskError> {
        let db = Database::create(path.as_ref()).map_err(|e| MaskError::IoError(e.to_string()))?;

        {
            let write_txn = db
                .begin_write()
                .map_err(|e| MaskError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(EPOCHS)
                .map_err(|e| MaskError::IoError(e.to_string()))?;
            {
                let mut meta = write_txn
                    .open_table(METADATA)
                    .map_err(|e| MaskError::IoError(e.to_string()))?;
                let stored = meta
                    .get("format_version")
                    .map_err(|e| MaskError::IoError(e.to_string()))?
                    .map(|v| v.value());
                match stored {
                    None => {
                        meta.insert("format_version", u64::from(FORMAT_VERSION))
                            .map_err(|e| MaskError::IoError(e.to_string()))?;
                    }
                    Some(version) if version != u64::from(FORMAT_VERSION) => {
                        return Err(MaskError::SerializationError(format!(
                            "Unsupported store version: {} (expected {})",
                            version, FORMAT_VERSION
                        )));
                    }
                    Some(_) => {}
                }
            }
            write_txn
                .commit()
                .map_err(|e| MaskError::IoError(e.to_string()))?;
        }

        tracing::debug!(path = %path.as_ref().display(), "opened conditions store");
        Ok(Self { db })
    }

    /// Store `payload` as the epoch starting at `first_run`.
    ///
    /// The payload's epoch id is rewritten to `first_run`. An existing epoch
    /// with the same first run is replaced.
    pub fn put_epoch(
        &mut self,
        first_run: u64,
        mut payload: ConditionsPayload,
    ) -> Result<(), MaskError> {
        payload.epoch = EpochId(first_run);
        let bytes = payload_to_bytes(&payload)?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        {
            let mut epochs = write_txn
                .open_table(EPOCHS)
                .map_err(|e| MaskError::IoError(e.to_string()))?;
            epochs
                .insert(first_run, bytes.as_slice())
                .map_err(|e| MaskError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MaskError::IoError(e.to_string()))?;

        tracing::info!(first_run, entries = payload.entry_count(), "stored conditions epoch");
        Ok(())
    }

    /// Load the epoch whose interval of validity contains `run`.
    ///
    /// That is the stored epoch with the greatest first run `<= run`.
    pub fn epoch_for_run(&self, run: u64) -> Result<ConditionsPayload, MaskError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        let epochs = read_txn
            .open_table(EPOCHS)
            .map_err(|e| MaskError::IoError(e.to_string()))?;

        let mut range = epochs
            .range(..=run)
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        let Some(entry) = range.next_back() else {
            return Err(MaskError::EpochNotFound(run));
        };
        let (key, value) = entry.map_err(|e| MaskError::IoError(e.to_string()))?;

        let payload = payload_from_bytes(value.value())?;
        tracing::debug!(run, first_run = key.value(), "selected conditions epoch");
        Ok(payload)
    }

    /// First runs of all stored epochs, ascending.
    pub fn epochs(&self) -> Result<Vec<u64>, MaskError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        let epochs = read_txn
            .open_table(EPOCHS)
            .map_err(|e| MaskError::IoError(e.to_string()))?;

        let mut runs = Vec::new();
        for entry in epochs
            .iter()
            .map_err(|e| MaskError::IoError(e.to_string()))?
        {
            let (key, _) = entry.map_err(|e| MaskError::IoError(e.to_string()))?;
            runs.push(key.value());
        }
        Ok(runs)
    }

    /// Number of stored epochs.
    pub fn epoch_count(&self) -> Result<u64, MaskError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        let epochs = read_txn
            .open_table(EPOCHS)
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        epochs.len().map_err(|e| MaskError::IoError(e.to_string()))
    }

    /// Remove the epoch starting at `first_run`. Returns whether it existed.
    pub fn remove_epoch(&mut self, first_run: u64) -> Result<bool, MaskError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MaskError::IoError(e.to_string()))?;
        let removed = {
            let mut epochs = write_txn
                .open_table(EPOCHS)
                .map_err(|e| MaskError::IoError(e.to_string()))?;
            epochs
                .remove(first_run)
                .map_err(|e| MaskError::IoError(e.to_string()))?
                .is_some()
        };
        write_txn
            .commit()
            .map_err(|e| MaskError::IoError(e.to_string()))?;

        if removed {
            tracing::info!(first_run, "removed conditions epoch");
        }
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
