//! # Status Tables
//!
//! Status records bound by the resolver, keyed by packed detector id.
//!
//! - `StatusTable` maps a channel or tower id to its status bitmask
//! - `RecordKind` names the two record kinds a conditions epoch can carry
//! - Named status flags and the bit-mask parser used by the outer surfaces

use crate::{MaskError, RawId, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// RECORD KINDS
// =============================================================================

/// The two record kinds a conditions epoch may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// Per-crystal status.
    ChannelStatus,
    /// Per trigger tower (barrel) or super-crystal (endcap) status.
    TowerStatus,
}

impl RecordKind {
    /// Both kinds, in resolution order.
    pub const ALL: [RecordKind; 2] = [RecordKind::ChannelStatus, RecordKind::TowerStatus];

    /// Record name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::ChannelStatus => "channel-status",
            RecordKind::TowerStatus => "tower-status",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// STATUS TABLE
// =============================================================================

/// Map from packed detector id to status bitmask.
///
/// Uses `BTreeMap` so iteration and serialization are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusTable {
    entries: BTreeMap<RawId, StatusCode>,
}

impl StatusTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status of an id, replacing any previous value.
    pub fn set(&mut self, id: RawId, status: StatusCode) {
        self.entries.insert(id, status);
    }

    /// OR a status into the existing value of an id.
    pub fn merge(&mut self, id: RawId, status: StatusCode) {
        let entry = self.entries.entry(id).or_default();
        *entry = entry.union(status);
    }

    /// Status of an id, if recorded.
    #[must_use]
    pub fn get(&self, id: RawId) -> Option<StatusCode> {
        self.entries.get(&id).copied()
    }

    /// Whether the recorded status of `id` shares any bit with `bits`.
    ///
    /// Ids without an entry never match.
    #[must_use]
    pub fn matches(&self, id: RawId, bits: u32) -> bool {
        self.get(id).is_some_and(|status| status.intersects(bits))
    }

    /// Remove an id.
    pub fn remove(&mut self, id: RawId) -> Option<StatusCode> {
        self.entries.remove(&id)
    }

    /// Number of recorded ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no id is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (RawId, StatusCode)> + '_ {
        self.entries.iter().map(|(id, status)| (*id, *status))
    }

    /// Number of entries matching `bits`.
    #[must_use]
    pub fn count_matching(&self, bits: u32) -> usize {
        self.entries
            .values()
            .filter(|status| status.intersects(bits))
            .count()
    }
}

impl FromIterator<(RawId, StatusCode)> for StatusTable {
    fn from_iter<I: IntoIterator<Item = (RawId, StatusCode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// NAMED STATUS FLAGS
// =============================================================================

/// Named status bits understood by the bit-mask parser.
pub const STATUS_FLAGS: &[(&str, u32)] = &[
    ("ch-id-error", 1 << 0),
    ("ch-gain-zero-error", 1 << 1),
    ("ch-gain-switch-error", 1 << 2),
    ("tt-id-error", 1 << 3),
    ("tt-size-error", 1 << 4),
    ("pedestal-low-gain-mean-error", 1 << 5),
    ("pedestal-middle-gain-mean-error", 1 << 6),
    ("pedestal-high-gain-mean-error", 1 << 7),
    ("pedestal-low-gain-rms-error", 1 << 8),
    ("pedestal-middle-gain-rms-error", 1 << 9),
    ("pedestal-high-gain-rms-error", 1 << 10),
    ("pedestal-online-high-gain-mean-error", 1 << 11),
    ("pedestal-online-high-gain-rms-error", 1 << 12),
    ("testpulse-low-gain-mean-error", 1 << 13),
    ("testpulse-middle-gain-mean-error", 1 << 14),
    ("testpulse-high-gain-mean-error", 1 << 15),
    ("testpulse-low-gain-rms-error", 1 << 16),
    ("testpulse-middle-gain-rms-error", 1 << 17),
    ("testpulse-high-gain-rms-error", 1 << 18),
    ("laser-mean-error", 1 << 19),
    ("laser-rms-error", 1 << 20),
    ("laser-timing-mean-error", 1 << 21),
    ("laser-timing-rms-error", 1 << 22),
    ("led-mean-error", 1 << 23),
    ("led-rms-error", 1 << 24),
    ("led-timing-mean-error", 1 << 25),
    ("led-timing-rms-error", 1 << 26),
    ("status-flag-error", 1 << 27),
    ("physics-bad-channel-warning", 1 << 28),
    ("physics-bad-channel-error", 1 << 29),
];

/// Bit value of a named status flag.
#[must_use]
pub fn flag_bits(name: &str) -> Option<u32> {
    let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
    STATUS_FLAGS
        .iter()
        .find(|(flag, _)| *flag == wanted)
        .map(|(_, bits)| *bits)
}

/// Names of the flags set in `bits`, lowest bit first.
#[must_use]
pub fn flag_names(bits: u32) -> Vec<&'static str> {
    STATUS_FLAGS
        .iter()
        .filter(|(_, flag)| bits & flag != 0)
        .map(|(name, _)| *name)
        .collect()
}

/// Parse a bit mask: decimal, `0x` hex, `all`, or comma-separated flag names.
pub fn parse_bits(input: &str) -> Result<u32, MaskError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(MaskError::ConfigError("Empty bit mask".to_string()));
    }
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok(u32::MAX);
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16)
            .map_err(|e| MaskError::ConfigError(format!("Invalid hex mask '{}': {}", input, e)));
    }
    if let Ok(value) = trimmed.parse::<u32>() {
        return Ok(value);
    }

    let mut bits = 0u32;
    for name in trimmed.split(',') {
        bits |= flag_bits(name).ok_or_else(|| {
            MaskError::ConfigError(format!("Unknown status flag '{}'", name.trim()))
        })?;
    }
    Ok(bits)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_ors_status() {
        let mut table = StatusTable::new();
        table.merge(RawId(7), StatusCode::new(0x2));
        table.merge(RawId(7), StatusCode::new(0x4));
        assert_eq!(table.get(RawId(7)), Some(StatusCode::new(0x6)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn matches_uses_intersection() {
        let table: StatusTable = [(RawId(1), StatusCode::new(0x6))].into_iter().collect();
        assert!(!table.matches(RawId(1), 0x1));
        assert!(table.matches(RawId(1), 0x2));
        assert!(!table.matches(RawId(2), u32::MAX));
    }

    #[test]
    fn iteration_is_ordered() {
        let table: StatusTable = [
            (RawId(30), StatusCode::new(1)),
            (RawId(10), StatusCode::new(1)),
            (RawId(20), StatusCode::new(2)),
        ]
        .into_iter()
        .collect();
        let ids: Vec<u32> = table.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(table.count_matching(0x1), 2);
    }

    #[test]
    fn parse_bits_forms() {
        assert_eq!(parse_bits("0x6").expect("hex"), 6);
        assert_eq!(parse_bits("12").expect("dec"), 12);
        assert_eq!(parse_bits("all").expect("all"), u32::MAX);
        assert_eq!(
            parse_bits("ch-id-error, ch_gain_zero_error").expect("names"),
            0x3
        );
        assert!(parse_bits("no-such-flag").is_err());
        assert!(parse_bits("0xZZ").is_err());
        assert!(parse_bits("").is_err());
    }

    #[test]
    fn flag_names_lists_set_bits() {
        assert_eq!(flag_names(0x9), vec!["ch-id-error", "tt-id-error"]);
    }
}
