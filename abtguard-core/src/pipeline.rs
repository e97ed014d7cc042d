//! Core inspect, assess and trust pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: backups and tables are read through the port traits.

use crate::ports::{ArtifactSource, TableSource};
use crate::settings::{AssessSettings, InspectSettings, TrustSettings};
use abtguard_artifact::{Classifier, decode_artifact_input, discover_artifacts};
use abtguard_domain::{AssessContext, AssessError, RiskEngine};
use abtguard_types::artifact::{ArtifactFileMeta, FormatVersion, ParsedArtifact};
use abtguard_types::change::RiskAssessment;
use abtguard_types::error::{ConfigurationError, FormatError, ValidationError};
use abtguard_types::evidence::TrustReport;
use abtguard_types::schema::ABTGUARD_INSPECT_V1;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Error type for pipeline results. Exit code 2 = input rejected, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{path}: {source}")]
    Format {
        path: Utf8PathBuf,
        #[source]
        source: FormatError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Format { .. } | ToolError::Validation(_) => 2,
            ToolError::Configuration(_) | ToolError::Internal(_) => 1,
        }
    }
}

impl From<AssessError> for ToolError {
    fn from(err: AssessError) -> Self {
        match err {
            AssessError::Validation(e) => ToolError::Validation(e),
            AssessError::Configuration(e) => ToolError::Configuration(e),
        }
    }
}

/// Outcome of `run_inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectOutcome {
    pub schema: String,
    pub source: Utf8PathBuf,

    /// SHA-256 of the raw input bytes, hex encoded.
    pub sha256: String,
    pub byte_len: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion: Option<Utf8PathBuf>,

    pub artifact: ParsedArtifact,
}

impl InspectOutcome {
    pub fn editable_blocks(&self) -> usize {
        self.artifact
            .blocks
            .iter()
            .filter(|b| b.classification.is_editable())
            .count()
    }
}

/// Decode and classify one backup, optionally against a companion backup.
pub fn run_inspect(
    settings: &InspectSettings,
    source: &dyn ArtifactSource,
    tables: &dyn TableSource,
) -> Result<InspectOutcome, ToolError> {
    let bytes = source.read_artifact(&settings.artifact)?;
    let sha256 = sha256_hex(&bytes);
    let parsed = decode(&settings.artifact, &bytes, settings.format_version)?;

    let companion = match &settings.companion {
        Some(path) => {
            let bytes = source
                .read_artifact(path)
                .with_context(|| format!("read companion {}", path))?;
            Some(decode(path, &bytes, settings.format_version)?)
        }
        None => None,
    };

    let offsets = tables.offset_table()?;
    let artifact =
        Classifier::new(&offsets).classify_with_companion(&parsed, companion.as_ref());

    let outcome = InspectOutcome {
        schema: ABTGUARD_INSPECT_V1.to_string(),
        source: settings.artifact.clone(),
        sha256,
        byte_len: bytes.len(),
        companion: settings.companion.clone(),
        artifact,
    };
    info!(
        source = %outcome.source,
        blocks = outcome.artifact.blocks.len(),
        editable = outcome.editable_blocks(),
        "inspected artifact"
    );
    Ok(outcome)
}

/// Assess a change request against the rule and evidence tables.
///
/// Rule citations are validated before evaluation, so a broken evidence table fails here even
/// for requests whose rules would not cite the missing entry.
pub fn run_assess(
    settings: &AssessSettings,
    source: &dyn ArtifactSource,
    tables: &dyn TableSource,
) -> Result<RiskAssessment, ToolError> {
    // Reject an incomplete request before any file is read.
    let request = settings.request.normalized()?;

    let store = tables.evidence_store()?;
    let engine = RiskEngine::new();
    engine.validate_citations(&store)?;

    let artifact = match &settings.artifact {
        Some(path) => {
            let inspect = InspectSettings {
                artifact: path.clone(),
                companion: settings.companion.clone(),
                format_version: settings.format_version,
            };
            Some(run_inspect(&inspect, source, tables)?.artifact)
        }
        None => None,
    };

    let ctx = AssessContext {
        confirmed: &settings.confirmed,
        artifact: artifact.as_ref(),
    };
    let assessment = engine.assess(&request, &store, &ctx)?;
    debug!(id = %assessment.assessment_id, tier = %assessment.risk_tier, "assessment ready");
    Ok(assessment)
}

/// Trust report over the named rules, or the whole table.
pub fn run_trust(
    settings: &TrustSettings,
    tables: &dyn TableSource,
) -> Result<TrustReport, ToolError> {
    let store = tables.evidence_store()?;
    let engine = RiskEngine::new();
    engine.validate_citations(&store)?;
    Ok(engine.aggregate_confidence(&settings.rule_ids, &store)?)
}

/// Backups in `dir`, newest first.
pub fn run_list_artifacts(dir: &Utf8Path) -> Result<Vec<ArtifactFileMeta>, ToolError> {
    let found = discover_artifacts(dir).with_context(|| format!("list backups in {}", dir))?;
    Ok(found)
}

fn decode(
    path: &Utf8Path,
    bytes: &[u8],
    version: Option<FormatVersion>,
) -> Result<ParsedArtifact, ToolError> {
    decode_artifact_input(bytes, version).map_err(|source| ToolError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
