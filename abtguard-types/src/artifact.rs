use camino::Utf8PathBuf;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence at or above which a `Configuration` block may be recommended for editing.
pub const EDITABLE_CONFIDENCE_THRESHOLD: f64 = 0.75;

/// Upper bound for the confidence attached to an `Unknown` label.
///
/// Kept strictly below [`EDITABLE_CONFIDENCE_THRESHOLD`].
pub const UNKNOWN_CONFIDENCE_CAP: f64 = 0.5;

/// Artifact encoding generation.
///
/// The legacy encoding uses narrow id/length fields and 16-bit values. The extended encoding
/// widens every field to address larger block/line ranges. The two are distinguished only by the
/// marker byte following the magic, never by guessing from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatVersion {
    Legacy,
    Extended,
}

impl FormatVersion {
    /// Magic prefix shared by every artifact.
    pub const MAGIC: &'static [u8; 3] = b"ABT";

    /// Total size of the fixed-position signature (magic + marker).
    pub const SIGNATURE_LEN: usize = 4;

    pub fn marker(self) -> u8 {
        match self {
            FormatVersion::Legacy => 0x01,
            FormatVersion::Extended => 0x02,
        }
    }

    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0x01 => Some(FormatVersion::Legacy),
            0x02 => Some(FormatVersion::Extended),
            _ => None,
        }
    }

    /// Width in bytes of one record value.
    pub fn value_width(self) -> usize {
        match self {
            FormatVersion::Legacy => 2,
            FormatVersion::Extended => 4,
        }
    }

    pub fn block_id_width(self) -> usize {
        match self {
            FormatVersion::Legacy => 2,
            FormatVersion::Extended => 4,
        }
    }

    pub fn block_len_width(self) -> usize {
        match self {
            FormatVersion::Legacy => 1,
            FormatVersion::Extended => 2,
        }
    }

    pub fn block_count_width(self) -> usize {
        match self {
            FormatVersion::Legacy => 1,
            FormatVersion::Extended => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormatVersion::Legacy => "legacy",
            FormatVersion::Extended => "extended",
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fixed-width value decoded from a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub block_id: u32,

    /// Byte position within the owning block.
    pub offset: u32,

    pub raw_value: u32,
}

/// What a block is believed to hold.
///
/// Every consumer has to handle `Unknown`: a block is only ever editable when it is
/// `Configuration` with enough confidence (see [`BlockClassification::is_editable`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum BlockClassification {
    Configuration { confidence: f64 },
    VolatileState { confidence: f64 },
    Unknown { confidence: f64 },
}

impl BlockClassification {
    /// The label the decoder attaches before any classifier has run.
    pub fn unclassified() -> Self {
        BlockClassification::Unknown { confidence: 0.0 }
    }

    pub fn confidence(&self) -> f64 {
        match *self {
            BlockClassification::Configuration { confidence }
            | BlockClassification::VolatileState { confidence }
            | BlockClassification::Unknown { confidence } => confidence,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockClassification::Configuration { .. } => "configuration",
            BlockClassification::VolatileState { .. } => "volatile_state",
            BlockClassification::Unknown { .. } => "unknown",
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            BlockClassification::Configuration { confidence }
                if *confidence >= EDITABLE_CONFIDENCE_THRESHOLD
        )
    }
}

impl Default for BlockClassification {
    fn default() -> Self {
        Self::unclassified()
    }
}

/// Evidence the classifier observed for a block. Recorded so a label can be audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassificationSignal {
    /// Values differ from the companion backup.
    ValuesChanged { changed: u32 },
    /// The companion backup holds the same values.
    ValuesStable,
    /// Records falling inside curated known-configuration ranges.
    CuratedCoverage { covered: u32, total: u32 },
    /// The curated table has nothing for this module family and block.
    NoCuratedEntry,
    /// Every record holds the same value (erased, padding, or uninitialised).
    Uniform { value: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBlock {
    pub block_id: u32,
    pub format_version: FormatVersion,

    #[serde(default)]
    pub records: Vec<ArtifactRecord>,

    #[serde(default)]
    pub classification: BlockClassification,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<ClassificationSignal>,
}

impl ArtifactBlock {
    /// Payload length in bytes.
    pub fn byte_len(&self) -> usize {
        self.records.len() * self.format_version.value_width()
    }

    pub fn record_at(&self, offset: u32) -> Option<&ArtifactRecord> {
        self.records
            .binary_search_by_key(&offset, |r| r.offset)
            .ok()
            .map(|idx| &self.records[idx])
    }
}

/// Which classifier run produced the labels on a [`ParsedArtifact`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierStamp {
    pub offset_table_version: String,
    pub companion_compared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedArtifact {
    pub format_version: FormatVersion,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_hint: Option<String>,

    #[serde(default)]
    pub blocks: Vec<ArtifactBlock>,

    /// `None` until a classifier has annotated the blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified: Option<ClassifierStamp>,
}

impl ParsedArtifact {
    pub fn block(&self, block_id: u32) -> Option<&ArtifactBlock> {
        self.blocks.iter().find(|b| b.block_id == block_id)
    }

    pub fn is_classified(&self) -> bool {
        self.classified.is_some()
    }

    pub fn record_count(&self) -> usize {
        self.blocks.iter().map(|b| b.records.len()).sum()
    }
}

/// Metadata recovered from a backup file name (`VIN_SYSTEM_YYYYMMDD_HHMMSS.abt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFileMeta {
    pub path: Utf8PathBuf,
    pub file_name: String,
    pub vin: String,
    pub system: String,
    pub captured_at: NaiveDateTime,
}
