//! # Payload Format
//!
//! Binary serialization for conditions payloads.
//! File I/O operations are in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized `ConditionsPayload`.
//! - 4 bytes: Magic ("EMSK")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::conditions::ConditionsPayload;
use crate::primitives::{self, MAX_TABLE_ENTRIES};
use crate::MaskError;

/// Maximum allowed payload size.
///
/// Two full tables of ECAL ids stay far below this.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Minimum valid file size (header only).
const MIN_FILE_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every conditions payload.
#[derive(Debug, Clone, Copy)]
pub struct PayloadHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PayloadHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), MaskError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(MaskError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(MaskError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MaskError> {
        if bytes.len() < MIN_FILE_SIZE {
            return Err(MaskError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PayloadHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a payload to bytes (header + postcard body).
pub fn payload_to_bytes(payload: &ConditionsPayload) -> Result<Vec<u8>, MaskError> {
    let header = PayloadHeader::new();
    let body = postcard::to_stdvec(payload)
        .map_err(|e| MaskError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + body.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&body);
    Ok(result)
}

/// Deserialize a payload from bytes.
///
/// Validates, in order: minimum size, maximum size, header, then table
/// sizes after decoding.
pub fn payload_from_bytes(bytes: &[u8]) -> Result<ConditionsPayload, MaskError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(MaskError::SerializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(MaskError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let header = PayloadHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload: ConditionsPayload = postcard::from_bytes(&bytes[MIN_FILE_SIZE..]).map_err(|e| {
        MaskError::SerializationError(format!("Failed to decode conditions payload: {}", e))
    })?;

    for table in [&payload.channel_status, &payload.tower_status]
        .into_iter()
        .flatten()
    {
        if table.len() > MAX_TABLE_ENTRIES {
            return Err(MaskError::SerializationError(format!(
                "Status table has {} entries, maximum is {}",
                table.len(),
                MAX_TABLE_ENTRIES
            )));
        }
    }

    Ok(payload)
}

// =============================================================================
// CHECKSUMS
// =============================================================================

/// Deterministic checksum over the epoch and every table entry.
#[must_use]
pub fn payload_checksum(payload: &ConditionsPayload) -> u64 {
    let mut hash: u64 = payload.epoch.0.rotate_left(3);

    if let Some(table) = &payload.channel_status {
        for (id, status) in table.iter() {
            hash ^= (id.0 as u64).rotate_left(13);
            hash ^= (status.bits() as u64).rotate_left(7);
        }
    }
    if let Some(table) = &payload.tower_status {
        for (id, status) in table.iter() {
            hash ^= (id.0 as u64).rotate_left(17);
            hash ^= (status.bits() as u64).rotate_left(11);
        }
    }

    hash
}

/// BLAKE3 hex digest of the encoded payload.
#[cfg(feature = "crypto-hash")]
pub fn payload_blake3(payload: &ConditionsPayload) -> Result<String, MaskError> {
    let data = payload_to_bytes(payload)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
