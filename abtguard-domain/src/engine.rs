use crate::cross_check::cross_check;
use crate::rules::{self, COMMON_ROLLBACK, Rule, RuleMeta};
use abtguard_evidence::EvidenceStore;
use abtguard_types::artifact::ParsedArtifact;
use abtguard_types::change::{
    ChangeRequest, Prerequisite, PrerequisiteKind, RiskAssessment, RiskTier,
};
use abtguard_types::error::{ConfigurationError, ValidationError};
use abtguard_types::evidence::TrustReport;
use abtguard_types::schema::ABTGUARD_ASSESSMENT_V1;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const NO_WRITES_WARNING: &str = "This tool does not perform writes to the vehicle.";
const VALIDATE_WARNING: &str =
    "Always validate against official Ford service data before programming.";
const SAFETY_CRITICAL_WARNING: &str = "Safety-critical change detected: use OEM procedure and do not proceed without backup power.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Caller-supplied state for one assessment.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssessContext<'a> {
    /// Prerequisite ids the caller has confirmed.
    pub confirmed: &'a [String],

    /// Decoded (ideally classified) backup of the target module.
    pub artifact: Option<&'a ParsedArtifact>,
}

pub struct RiskEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    pub fn new() -> Self {
        Self {
            rules: rules::builtin_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Rule metadata in table order.
    pub fn rule_metas(&self) -> Vec<RuleMeta> {
        self.rules.iter().map(|r| r.meta()).collect()
    }

    /// Check the rule table against the evidence table. Run once at startup.
    pub fn validate_citations(&self, store: &EvidenceStore) -> Result<(), ConfigurationError> {
        let mut seen = BTreeSet::new();
        for meta in self.rule_metas().into_iter().chain([rules::default_rule()]) {
            if meta.rule_id.trim().is_empty() {
                return Err(ConfigurationError::InvalidRule {
                    rule_id: meta.rule_id.to_string(),
                    message: "rule id must not be empty".to_string(),
                });
            }
            if !seen.insert(meta.rule_id) {
                return Err(ConfigurationError::InvalidRule {
                    rule_id: meta.rule_id.to_string(),
                    message: "rule id declared more than once".to_string(),
                });
            }
            if meta.module_patterns.is_empty() {
                return Err(ConfigurationError::InvalidRule {
                    rule_id: meta.rule_id.to_string(),
                    message: "rule has no module pattern".to_string(),
                });
            }
            if let Some(missing) = meta.evidence.iter().find(|id| !store.contains(id)) {
                return Err(ConfigurationError::UnknownCitation {
                    rule_id: meta.rule_id.to_string(),
                    evidence_id: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Assess one change request.
    ///
    /// The tier depends only on `(module, parameter)` and the rule table. Confirmations gate
    /// the execution steps; an artifact only adds cross-check findings.
    pub fn assess(
        &self,
        request: &ChangeRequest,
        store: &EvidenceStore,
        ctx: &AssessContext<'_>,
    ) -> Result<RiskAssessment, AssessError> {
        let request = request.normalized()?;

        let mut fired: Vec<RuleMeta> = self
            .rules
            .iter()
            .filter(|r| r.matches(&request))
            .map(|r| r.meta())
            .collect();
        if fired.is_empty() {
            fired.push(rules::default_rule());
        }

        let risk_tier = fired
            .iter()
            .map(|m| m.tier)
            .max()
            .unwrap_or(RiskTier::Medium);

        let (confirmed, unknown_confirmations) = parse_confirmations(ctx.confirmed);
        let prerequisites = merge_prerequisites(&fired, &confirmed);
        let rollback_steps = merge_rollback(&fired);

        let unmet: Vec<&str> = prerequisites
            .iter()
            .filter(|p| !p.satisfied)
            .map(|p| p.id.id())
            .collect();
        let blocked = !unmet.is_empty();
        let blocked_reason = blocked.then(|| format!("unmet prerequisites: {}", unmet.join(", ")));
        let execution_steps = if blocked {
            Vec::new()
        } else {
            execution_steps(&request)
        };

        let mut warnings = vec![NO_WRITES_WARNING.to_string(), VALIDATE_WARNING.to_string()];
        if risk_tier == RiskTier::High {
            warnings.push(SAFETY_CRITICAL_WARNING.to_string());
        }
        if !unknown_confirmations.is_empty() {
            warnings.push(format!(
                "Ignored unknown prerequisite confirmations: {}",
                unknown_confirmations.join(", ")
            ));
        }

        let cross_checks = ctx
            .artifact
            .map(|artifact| cross_check(&request, artifact))
            .unwrap_or_default();

        let fired_rules: Vec<String> = fired.iter().map(|m| m.rule_id.to_string()).collect();
        let trust = trust_for(&fired, store)?;

        debug!(
            module = %request.module,
            parameter = %request.parameter,
            tier = %risk_tier,
            fired = fired_rules.len(),
            blocked,
            "assessed change request"
        );

        Ok(RiskAssessment {
            schema: ABTGUARD_ASSESSMENT_V1.to_string(),
            assessment_id: assessment_id(&request).to_string(),
            request,
            risk_tier,
            fired_rules,
            prerequisites,
            rollback_steps,
            execution_steps,
            blocked,
            blocked_reason,
            warnings,
            cross_checks,
            trust,
        })
    }

    /// Trust report over the evidence cited by `rule_ids`. An empty slice means every rule.
    pub fn aggregate_confidence(
        &self,
        rule_ids: &[String],
        store: &EvidenceStore,
    ) -> Result<TrustReport, AssessError> {
        let table = self.rule_metas();
        let selected: Vec<RuleMeta> = if rule_ids.is_empty() {
            table
        } else {
            let wanted: BTreeSet<&str> = rule_ids.iter().map(|s| s.trim()).collect();
            let mut selected = Vec::new();
            for id in &wanted {
                let meta = table
                    .iter()
                    .chain(std::iter::once(&rules::default_rule()))
                    .find(|m| m.rule_id == *id)
                    .cloned()
                    .ok_or_else(|| ValidationError::UnknownRule {
                        rule_id: id.to_string(),
                    })?;
                selected.push(meta);
            }
            selected
        };
        trust_for(&selected, store)
    }
}

/// Assess with the built-in rule table, no confirmations and no artifact.
pub fn assess_change(
    request: &ChangeRequest,
    store: &EvidenceStore,
) -> Result<RiskAssessment, AssessError> {
    RiskEngine::new().assess(request, store, &AssessContext::default())
}

fn parse_confirmations(ids: &[String]) -> (BTreeSet<PrerequisiteKind>, Vec<String>) {
    let mut known = BTreeSet::new();
    let mut unknown = Vec::new();
    for id in ids {
        match PrerequisiteKind::from_id(id) {
            Some(kind) => {
                known.insert(kind);
            }
            None => {
                let id = id.trim().to_string();
                if !unknown.contains(&id) {
                    unknown.push(id);
                }
            }
        }
    }
    (known, unknown)
}

/// Canonical checklist order, whatever order the rules fired in.
fn merge_prerequisites(
    fired: &[RuleMeta],
    confirmed: &BTreeSet<PrerequisiteKind>,
) -> Vec<Prerequisite> {
    let mut required: BTreeMap<PrerequisiteKind, Vec<String>> = BTreeMap::new();
    for meta in fired {
        for kind in meta.prerequisites {
            let by = required.entry(*kind).or_default();
            if !by.iter().any(|r| r == meta.rule_id) {
                by.push(meta.rule_id.to_string());
            }
        }
    }

    required
        .into_iter()
        .map(|(kind, required_by)| Prerequisite {
            id: kind,
            description: kind.description().to_string(),
            required_by,
            satisfied: confirmed.contains(&kind),
        })
        .collect()
}

fn merge_rollback(fired: &[RuleMeta]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let steps = fired
        .iter()
        .flat_map(|m| m.rollback.iter())
        .chain(COMMON_ROLLBACK.iter());
    for step in steps {
        if !out.iter().any(|s| s == step) {
            out.push(step.to_string());
        }
    }
    out
}

fn execution_steps(request: &ChangeRequest) -> Vec<String> {
    vec![
        format!(
            "Open {} in FORScan Configuration and Programming",
            request.module
        ),
        format!(
            "Locate parameter '{}' and confirm current value '{}'",
            request.parameter, request.current_value
        ),
        format!("Apply target value '{}'", request.target_value),
        "Perform module reset/relearn if prompted by FORScan".to_string(),
        "Rescan DTCs and validate no new faults".to_string(),
    ]
}

fn trust_for(rules: &[RuleMeta], store: &EvidenceStore) -> Result<TrustReport, AssessError> {
    let evidence = rules.iter().flat_map(|m| m.evidence.iter().copied());
    let mut report = store.aggregate(evidence)?;
    let cited: BTreeSet<&str> = rules.iter().map(|m| m.rule_id).collect();
    report.cited_rules = cited.into_iter().map(str::to_string).collect();
    Ok(report)
}

fn assessment_id(request: &ChangeRequest) -> Uuid {
    // v5(namespace, normalized request)
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x8f, 0x2e, 0x6a, 0x91, 0x3c, 0x47, 0x4d, 0x1b, 0xa5, 0x0e, 0x72, 0xc4, 0x19, 0xd3, 0x6b,
        0x25,
    ]);

    let stable_key = format!(
        "{}|{}|{}|{}",
        request.module.to_ascii_uppercase(),
        request.parameter,
        request.current_value,
        request.target_value
    );
    Uuid::new_v5(&NAMESPACE, stable_key.as_bytes())
}
