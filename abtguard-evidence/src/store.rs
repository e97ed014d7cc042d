use abtguard_types::error::ConfigurationError;
use abtguard_types::evidence::{EvidenceRecord, TrustReport, verdict_for};
use abtguard_types::schema::ABTGUARD_EVIDENCE_V1;
use camino::Utf8Path;
use fs_err as fs;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TABLE: &str = "evidence";
const BUILTIN: &str = include_str!("../data/evidence.toml");

#[derive(Debug, Deserialize)]
struct RawTable {
    schema: String,
    version: String,
    #[serde(default)]
    evidence: Vec<EvidenceRecord>,
}

/// Validated evidence table keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceStore {
    version: String,
    records: BTreeMap<String, EvidenceRecord>,
}

impl EvidenceStore {
    /// The official project sources shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_toml_str(BUILTIN)
    }

    pub fn load(path: &Utf8Path) -> Result<Self, ConfigurationError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            table: TABLE,
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let store = Self::from_toml_str(&contents)?;
        debug!(path = %path, version = %store.version, records = store.len(), "loaded evidence table");
        Ok(store)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let raw: RawTable = toml::from_str(contents).map_err(|e| ConfigurationError::Malformed {
            table: TABLE,
            message: e.to_string(),
        })?;
        if raw.schema != ABTGUARD_EVIDENCE_V1 {
            return Err(ConfigurationError::UnsupportedSchema {
                table: TABLE,
                found: raw.schema,
                expected: ABTGUARD_EVIDENCE_V1,
            });
        }
        Self::from_records(raw.version, raw.evidence)
    }

    /// Build a store from already-parsed records, applying the same validation as a file load.
    pub fn from_records(
        version: impl Into<String>,
        records: Vec<EvidenceRecord>,
    ) -> Result<Self, ConfigurationError> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(invalid("version", "version must not be empty"));
        }

        let mut out = BTreeMap::new();
        for mut record in records {
            record.id = record.id.trim().to_string();
            if record.id.is_empty() {
                return Err(invalid(&record.title, "id must not be empty"));
            }
            if record.source_url.trim().is_empty() {
                return Err(invalid(&record.id, "source_url must not be empty"));
            }
            if !(0.0..=1.0).contains(&record.confidence) {
                return Err(invalid(
                    &record.id,
                    &format!("confidence {} is outside 0..=1", record.confidence),
                ));
            }
            if out.contains_key(&record.id) {
                return Err(ConfigurationError::DuplicateEntry {
                    table: TABLE,
                    entry: record.id,
                });
            }
            out.insert(record.id.clone(), record);
        }

        Ok(Self {
            version,
            records: out,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EvidenceRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Records in id order.
    pub fn records(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.records.values()
    }

    /// Tier-weighted mean confidence over the distinct records named by `evidence_ids`.
    ///
    /// Duplicates and input order don't matter. An empty set scores 0. An id missing from the
    /// table is a configuration error, since every citation is checked at startup.
    pub fn aggregate<I, S>(&self, evidence_ids: I) -> Result<TrustReport, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: BTreeSet<String> = evidence_ids
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .collect();

        let mut sources = Vec::with_capacity(ids.len());
        for id in &ids {
            let record = self.get(id).ok_or_else(|| {
                invalid(id, "cited but not present in the evidence table")
            })?;
            sources.push(record.clone());
        }

        let (weighted, weights) = sources.iter().fold((0.0, 0.0), |(num, den), r| {
            let w = r.tier.weight();
            (num + w * r.confidence, den + w)
        });
        let score = if weights > 0.0 { weighted / weights } else { 0.0 };
        let legitimacy_score = (score * 100.0).round().clamp(0.0, 100.0) as u8;

        let strengths = dedup(sources.iter().flat_map(|r| r.strengths.iter()));
        let caveats = dedup(sources.iter().flat_map(|r| r.caveats.iter()));

        Ok(TrustReport {
            score,
            legitimacy_score,
            verdict: verdict_for(legitimacy_score).to_string(),
            table_version: self.version.clone(),
            cited_rules: Vec::new(),
            sources,
            strengths,
            caveats,
        })
    }
}

fn dedup<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn invalid(entry: &str, message: &str) -> ConfigurationError {
    ConfigurationError::InvalidEntry {
        table: TABLE,
        entry: entry.to_string(),
        message: message.to_string(),
    }
}
