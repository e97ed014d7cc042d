use crate::offsets::OffsetTable;
use abtguard_types::artifact::{
    ArtifactBlock, BlockClassification, ClassificationSignal, ClassifierStamp,
    EDITABLE_CONFIDENCE_THRESHOLD, ParsedArtifact, UNKNOWN_CONFIDENCE_CAP,
};
use tracing::{debug, warn};

/// Labels decoded blocks from two sources of evidence: the curated offset table and, when one
/// is supplied, a companion backup of the same module taken at another time.
///
/// Labels are recomputed from the decoded records on every call, so classifying an already
/// classified artifact yields the same labels.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'t> {
    table: &'t OffsetTable,
}

impl<'t> Classifier<'t> {
    pub fn new(table: &'t OffsetTable) -> Self {
        Self { table }
    }

    pub fn classify(&self, artifact: &ParsedArtifact) -> ParsedArtifact {
        self.classify_with_companion(artifact, None)
    }

    /// A companion whose module hint or format version differs from the artifact's is ignored.
    pub fn classify_with_companion(
        &self,
        artifact: &ParsedArtifact,
        companion: Option<&ParsedArtifact>,
    ) -> ParsedArtifact {
        let companion = companion.filter(|other| {
            if !same_module(artifact.module_hint.as_deref(), other.module_hint.as_deref()) {
                warn!(
                    artifact = artifact.module_hint.as_deref().unwrap_or("-"),
                    companion = other.module_hint.as_deref().unwrap_or("-"),
                    "companion backup belongs to another module; ignoring it"
                );
                return false;
            }
            // Offsets are width-scaled, so records of different encodings never line up.
            if other.format_version != artifact.format_version {
                warn!(
                    artifact = artifact.format_version.as_str(),
                    companion = other.format_version.as_str(),
                    "companion backup uses another format version; ignoring it"
                );
                return false;
            }
            true
        });

        let family = artifact
            .module_hint
            .as_deref()
            .map(|h| h.trim().to_ascii_uppercase());

        let blocks: Vec<ArtifactBlock> = artifact
            .blocks
            .iter()
            .map(|block| {
                let other = companion.and_then(|c| c.block(block.block_id));
                self.classify_block(block, family.as_deref(), other)
            })
            .collect();

        let editable = blocks
            .iter()
            .filter(|b| b.classification.is_editable())
            .count();
        debug!(
            blocks = blocks.len(),
            editable,
            companion = companion.is_some(),
            table = self.table.version(),
            "classified artifact"
        );

        ParsedArtifact {
            format_version: artifact.format_version,
            module_hint: artifact.module_hint.clone(),
            blocks,
            classified: Some(ClassifierStamp {
                offset_table_version: self.table.version().to_string(),
                companion_compared: companion.is_some(),
            }),
        }
    }

    fn classify_block(
        &self,
        block: &ArtifactBlock,
        family: Option<&str>,
        companion: Option<&ArtifactBlock>,
    ) -> ArtifactBlock {
        let mut signals = Vec::new();

        let changed = companion.map(|other| changed_records(block, other));
        match changed {
            Some(0) => signals.push(ClassificationSignal::ValuesStable),
            Some(n) => signals.push(ClassificationSignal::ValuesChanged { changed: n }),
            None => {}
        }

        let total = block.records.len() as u32;
        let width = block.format_version.value_width() as u32;
        let curated = family.filter(|f| self.table.has_entry(f, block.block_id));
        let covered = match curated {
            Some(f) => {
                let covered = block
                    .records
                    .iter()
                    .filter(|r| self.table.covers(f, block.block_id, r.offset, width))
                    .count() as u32;
                signals.push(ClassificationSignal::CuratedCoverage { covered, total });
                covered
            }
            None => {
                signals.push(ClassificationSignal::NoCuratedEntry);
                0
            }
        };

        let uniform = uniform_value(block);
        if let Some(value) = uniform {
            signals.push(ClassificationSignal::Uniform { value });
        }

        let classification = combine(Evidence {
            changed,
            covered,
            total,
            uniform: uniform.is_some(),
        });

        ArtifactBlock {
            block_id: block.block_id,
            format_version: block.format_version,
            records: block.records.clone(),
            classification,
            signals,
        }
    }
}

/// Classify with the given table and no companion.
pub fn classify_blocks(artifact: &ParsedArtifact, table: &OffsetTable) -> ParsedArtifact {
    Classifier::new(table).classify(artifact)
}

struct Evidence {
    changed: Option<u32>,
    covered: u32,
    total: u32,
    uniform: bool,
}

fn combine(ev: Evidence) -> BlockClassification {
    if let Some(changed) = ev.changed
        && changed > 0
    {
        let confidence = if ev.covered > 0 { 0.6 } else { 0.9 };
        return BlockClassification::VolatileState { confidence };
    }

    if ev.total > 0 && ev.covered == ev.total {
        let stable = ev.changed == Some(0);
        let confidence = match (stable, ev.uniform) {
            (true, false) => 0.95,
            (false, false) => 0.8,
            (true, true) => 0.85,
            (false, true) => 0.7,
        };
        if confidence >= EDITABLE_CONFIDENCE_THRESHOLD {
            return BlockClassification::Configuration { confidence };
        }
        return BlockClassification::Unknown {
            confidence: confidence.min(UNKNOWN_CONFIDENCE_CAP),
        };
    }

    let coverage = if ev.total == 0 {
        0.0
    } else {
        f64::from(ev.covered) / f64::from(ev.total)
    };
    BlockClassification::Unknown {
        confidence: coverage * UNKNOWN_CONFIDENCE_CAP,
    }
}

/// Offsets whose values differ, plus offsets present on only one side.
fn changed_records(block: &ArtifactBlock, other: &ArtifactBlock) -> u32 {
    let mut changed = 0u32;
    for record in &block.records {
        match other.record_at(record.offset) {
            Some(o) if o.raw_value == record.raw_value => {}
            _ => changed += 1,
        }
    }
    for record in &other.records {
        if block.record_at(record.offset).is_none() {
            changed += 1;
        }
    }
    changed
}

fn uniform_value(block: &ArtifactBlock) -> Option<u32> {
    let (first, rest) = block.records.split_first()?;
    if rest.is_empty() || rest.iter().any(|r| r.raw_value != first.raw_value) {
        return None;
    }
    Some(first.raw_value)
}

fn same_module(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (None, None) => true,
        _ => false,
    }
}
