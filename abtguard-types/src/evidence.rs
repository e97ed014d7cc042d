use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trust level of a cited source. Serialized as its numeric tier (1 is most trusted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EvidenceTier {
    /// Official, authoritative publication.
    Official,
    /// Official community consensus (pinned forum guidance and the like).
    OfficialCommunity,
    /// Third-party anecdote.
    ThirdParty,
}

impl EvidenceTier {
    pub fn rank(self) -> u8 {
        match self {
            EvidenceTier::Official => 1,
            EvidenceTier::OfficialCommunity => 2,
            EvidenceTier::ThirdParty => 3,
        }
    }

    /// Weight used by tier-weighted averaging. Strictly decreasing with rank.
    pub fn weight(self) -> f64 {
        match self {
            EvidenceTier::Official => 1.0,
            EvidenceTier::OfficialCommunity => 0.6,
            EvidenceTier::ThirdParty => 0.25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EvidenceTier::Official => "official",
            EvidenceTier::OfficialCommunity => "official-community",
            EvidenceTier::ThirdParty => "third-party",
        }
    }
}

impl TryFrom<u8> for EvidenceTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EvidenceTier::Official),
            2 => Ok(EvidenceTier::OfficialCommunity),
            3 => Ok(EvidenceTier::ThirdParty),
            other => Err(format!("evidence tier must be 1, 2 or 3 (got {other})")),
        }
    }
}

impl From<EvidenceTier> for u8 {
    fn from(tier: EvidenceTier) -> Self {
        tier.rank()
    }
}

impl fmt::Display for EvidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.rank(), self.label())
    }
}

/// One cited guidance source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub tier: EvidenceTier,

    /// How far the source itself can be relied on, 0–1.
    pub confidence: f64,

    pub date_checked: NaiveDate,

    /// What makes the source worth citing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

/// Aggregated confidence snapshot over a set of cited sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustReport {
    /// Tier-weighted mean confidence, 0–1.
    pub score: f64,

    /// `score` scaled to 0–100 and rounded.
    pub legitimacy_score: u8,

    pub verdict: String,
    pub table_version: String,

    #[serde(default)]
    pub cited_rules: Vec<String>,

    #[serde(default)]
    pub sources: Vec<EvidenceRecord>,

    /// Source strengths, deduplicated in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,

    /// Source caveats, deduplicated in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

pub const VERDICT_HIGH: &str = "high-confidence with normal technical caution";
pub const VERDICT_MODERATE: &str = "moderate-confidence, verify per-vehicle before writes";
pub const VERDICT_LOW: &str = "low-confidence, do not use without independent validation";

pub fn verdict_for(legitimacy_score: u8) -> &'static str {
    if legitimacy_score >= 85 {
        VERDICT_HIGH
    } else if legitimacy_score >= 70 {
        VERDICT_MODERATE
    } else {
        VERDICT_LOW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_weights_strictly_decrease() {
        assert!(EvidenceTier::Official.weight() > EvidenceTier::OfficialCommunity.weight());
        assert!(EvidenceTier::OfficialCommunity.weight() > EvidenceTier::ThirdParty.weight());
        assert!(EvidenceTier::ThirdParty.weight() > 0.0);
    }

    #[test]
    fn tier_serializes_as_number() {
        assert_eq!(
            serde_json::to_value(EvidenceTier::OfficialCommunity).unwrap(),
            serde_json::json!(2)
        );
        let tier: EvidenceTier = serde_json::from_value(serde_json::json!(3)).unwrap();
        assert_eq!(tier, EvidenceTier::ThirdParty);
        assert!(serde_json::from_value::<EvidenceTier>(serde_json::json!(4)).is_err());
    }

    #[test]
    fn verdict_thresholds() {
        assert_eq!(verdict_for(100), VERDICT_HIGH);
        assert_eq!(verdict_for(85), VERDICT_HIGH);
        assert_eq!(verdict_for(84), VERDICT_MODERATE);
        assert_eq!(verdict_for(70), VERDICT_MODERATE);
        assert_eq!(verdict_for(0), VERDICT_LOW);
    }
}
