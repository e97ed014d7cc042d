//! Port traits abstracting all I/O away from the pipeline.

use abtguard_artifact::OffsetTable;
use abtguard_evidence::EvidenceStore;
use abtguard_types::error::ConfigurationError;
use camino::Utf8Path;

/// Source of raw backup bytes.
pub trait ArtifactSource {
    fn read_artifact(&self, path: &Utf8Path) -> anyhow::Result<Vec<u8>>;
}

/// Source of the static tables. Each call returns a fully validated table or an error.
pub trait TableSource {
    fn evidence_store(&self) -> Result<EvidenceStore, ConfigurationError>;
    fn offset_table(&self) -> Result<OffsetTable, ConfigurationError>;
}
