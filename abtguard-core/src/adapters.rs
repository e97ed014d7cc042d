//! Default port implementations.

use crate::ports::{ArtifactSource, TableSource};
use abtguard_artifact::OffsetTable;
use abtguard_evidence::EvidenceStore;
use abtguard_types::error::ConfigurationError;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeMap;
use tracing::debug;

/// Reads backups from the filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsArtifactSource;

impl ArtifactSource for FsArtifactSource {
    fn read_artifact(&self, path: &Utf8Path) -> anyhow::Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("read artifact {}", path))
    }
}

/// In-memory backups keyed by path, for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactSource {
    files: BTreeMap<Utf8PathBuf, Vec<u8>>,
}

impl InMemoryArtifactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), bytes.into());
        self
    }
}

impl ArtifactSource for InMemoryArtifactSource {
    fn read_artifact(&self, path: &Utf8Path) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no in-memory artifact at {}", path))
    }
}

/// Built-in tables, optionally overridden by files.
#[derive(Debug, Clone, Default)]
pub struct FsTableSource {
    pub evidence: Option<Utf8PathBuf>,
    pub offsets: Option<Utf8PathBuf>,
}

impl FsTableSource {
    pub fn new(evidence: Option<Utf8PathBuf>, offsets: Option<Utf8PathBuf>) -> Self {
        Self { evidence, offsets }
    }
}

impl TableSource for FsTableSource {
    fn evidence_store(&self) -> Result<EvidenceStore, ConfigurationError> {
        match &self.evidence {
            Some(path) => EvidenceStore::load(path),
            None => {
                debug!("using built-in evidence table");
                EvidenceStore::builtin()
            }
        }
    }

    fn offset_table(&self) -> Result<OffsetTable, ConfigurationError> {
        match &self.offsets {
            Some(path) => OffsetTable::load(path),
            None => {
                debug!("using built-in offset table");
                OffsetTable::builtin()
            }
        }
    }
}
