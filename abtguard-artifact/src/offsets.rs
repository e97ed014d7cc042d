//! Curated known-configuration offset table.

use abtguard_types::error::ConfigurationError;
use abtguard_types::schema::ABTGUARD_OFFSETS_V1;
use camino::Utf8Path;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const TABLE: &str = "offset";
const BUILTIN: &str = include_str!("../data/offsets.toml");

/// A byte range `[start, end)` inside one block that is known to hold configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRange {
    pub family: String,
    pub block_id: u32,
    pub start: u32,
    pub end: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OffsetRange {
    /// True when the whole `[offset, offset + width)` span lies inside the range.
    pub fn contains(&self, offset: u32, width: u32) -> bool {
        offset >= self.start && offset.saturating_add(width) <= self.end
    }
}

#[derive(Debug, Deserialize)]
struct RawTable {
    schema: String,
    version: String,
    #[serde(default)]
    range: Vec<OffsetRange>,
}

/// Validated, immutable offset table. Ranges are grouped by (family, block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    version: String,
    ranges: BTreeMap<(String, u32), Vec<OffsetRange>>,
}

impl OffsetTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_toml_str(BUILTIN)
    }

    pub fn load(path: &Utf8Path) -> Result<Self, ConfigurationError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            table: TABLE,
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let table = Self::from_toml_str(&contents)?;
        debug!(path = %path, version = %table.version, "loaded offset table");
        Ok(table)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let raw: RawTable = toml::from_str(contents).map_err(|e| ConfigurationError::Malformed {
            table: TABLE,
            message: e.to_string(),
        })?;

        if raw.schema != ABTGUARD_OFFSETS_V1 {
            return Err(ConfigurationError::UnsupportedSchema {
                table: TABLE,
                found: raw.schema,
                expected: ABTGUARD_OFFSETS_V1,
            });
        }
        if raw.version.trim().is_empty() {
            return Err(ConfigurationError::InvalidEntry {
                table: TABLE,
                entry: "version".to_string(),
                message: "version must not be empty".to_string(),
            });
        }

        let mut ranges: BTreeMap<(String, u32), Vec<OffsetRange>> = BTreeMap::new();
        for mut range in raw.range {
            let family = range.family.trim().to_ascii_uppercase();
            let entry = format!("{}/{:#x}", family, range.block_id);
            if family.is_empty() {
                return Err(ConfigurationError::InvalidEntry {
                    table: TABLE,
                    entry,
                    message: "family must not be empty".to_string(),
                });
            }
            if range.start >= range.end {
                return Err(ConfigurationError::InvalidEntry {
                    table: TABLE,
                    entry,
                    message: format!("empty range {}..{}", range.start, range.end),
                });
            }
            range.family = family.clone();

            let slot = ranges.entry((family, range.block_id)).or_default();
            if let Some(other) = slot
                .iter()
                .find(|o| range.start < o.end && o.start < range.end)
            {
                return Err(ConfigurationError::InvalidEntry {
                    table: TABLE,
                    entry,
                    message: format!(
                        "range {}..{} overlaps {}..{}",
                        range.start, range.end, other.start, other.end
                    ),
                });
            }
            slot.push(range);
        }

        for slot in ranges.values_mut() {
            slot.sort_by_key(|r| r.start);
        }

        Ok(Self {
            version: raw.version,
            ranges,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn has_entry(&self, family: &str, block_id: u32) -> bool {
        self.ranges
            .contains_key(&(family.trim().to_ascii_uppercase(), block_id))
    }

    /// True when a value of `width` bytes at `offset` lies inside a curated range.
    pub fn covers(&self, family: &str, block_id: u32, offset: u32, width: u32) -> bool {
        self.ranges
            .get(&(family.trim().to_ascii_uppercase(), block_id))
            .is_some_and(|slot| slot.iter().any(|r| r.contains(offset, width)))
    }

    pub fn ranges(&self) -> impl Iterator<Item = &OffsetRange> {
        self.ranges.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(body: &str) -> String {
        format!("schema = \"abtguard.offsets.v1\"\nversion = \"t1\"\n{body}")
    }

    #[test]
    fn builtin_table_loads() {
        let table = OffsetTable::builtin().expect("builtin");
        assert!(!table.version().is_empty());
        assert!(table.has_entry("bcm", 0x0101));
        assert!(table.covers("ABS", 0x0401, 2, 2));
        assert!(!table.covers("ABS", 0x0401, 4, 2));
    }

    #[test]
    fn covers_requires_whole_value_inside_range() {
        let t = OffsetTable::from_toml_str(&table(
            "[[range]]\nfamily = \"ipc\"\nblock_id = 1\nstart = 0\nend = 6\n",
        ))
        .expect("parse");
        assert!(t.covers("IPC", 1, 4, 2));
        assert!(!t.covers("IPC", 1, 4, 4));
        assert!(!t.covers("IPC", 2, 0, 2));
    }

    #[test]
    fn rejects_unknown_schema() {
        let err = OffsetTable::from_toml_str("schema = \"nope\"\nversion = \"1\"\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedSchema { .. }));
    }

    #[test]
    fn rejects_empty_range() {
        let err = OffsetTable::from_toml_str(&table(
            "[[range]]\nfamily = \"BCM\"\nblock_id = 1\nstart = 4\nend = 4\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidEntry { .. }));
    }

    #[test]
    fn rejects_overlapping_ranges() {
        let err = OffsetTable::from_toml_str(&table(
            "[[range]]\nfamily = \"BCM\"\nblock_id = 1\nstart = 0\nend = 4\n\
             [[range]]\nfamily = \"bcm\"\nblock_id = 1\nstart = 2\nend = 6\n",
        ))
        .unwrap_err();
        let ConfigurationError::InvalidEntry { message, .. } = err else {
            panic!("expected InvalidEntry");
        };
        assert!(message.contains("overlaps"));
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = OffsetTable::from_toml_str("schema = ").unwrap_err();
        assert!(matches!(err, ConfigurationError::Malformed { table: "offset", .. }));
    }
}
