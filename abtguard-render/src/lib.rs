//! Rendering helpers (markdown) for human-readable output.

use abtguard_types::artifact::{ClassificationSignal, ParsedArtifact};
use abtguard_types::change::{CrossCheckKind, RiskAssessment};
use abtguard_types::evidence::TrustReport;

pub fn render_assessment_md(a: &RiskAssessment) -> String {
    let mut out = String::new();
    out.push_str("# abtguard assessment\n\n");
    out.push_str(&format!("- Module: `{}`\n", a.request.module));
    out.push_str(&format!("- Parameter: `{}`\n", a.request.parameter));
    out.push_str(&format!(
        "- Current -> Target: `{}` -> `{}`\n",
        a.request.current_value, a.request.target_value
    ));
    out.push_str(&format!("- Risk tier: **{}**\n", a.risk_tier.as_str().to_uppercase()));
    out.push_str(&format!("- Fired rules: {}\n", a.fired_rules.join(", ")));
    out.push_str(&format!("- Assessment id: `{}`\n\n", a.assessment_id));

    out.push_str("## Prerequisites\n\n");
    for p in &a.prerequisites {
        let mark = if p.satisfied { "x" } else { " " };
        out.push_str(&format!(
            "- [{}] `{}` {} (required by {})\n",
            mark,
            p.id,
            p.description,
            p.required_by.join(", ")
        ));
    }
    out.push('\n');

    out.push_str("## Execution steps\n\n");
    if a.execution_steps.is_empty() {
        let reason = a.blocked_reason.as_deref().unwrap_or("prerequisites unmet");
        out.push_str(&format!("_Withheld: {}._\n\n", reason));
    } else {
        for (i, step) in a.execution_steps.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, step));
        }
        out.push('\n');
    }

    out.push_str("## Rollback\n\n");
    for step in &a.rollback_steps {
        out.push_str(&format!("- {}\n", step));
    }
    out.push('\n');

    if !a.cross_checks.is_empty() {
        out.push_str("## Backup cross-checks\n\n");
        for c in &a.cross_checks {
            out.push_str(&format!("- `{}` {}\n", cross_check_label(c.kind), c.message));
        }
        out.push('\n');
    }

    if !a.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in &a.warnings {
            out.push_str(&format!("- {}\n", w));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Trust: {}/100 ({})\n",
        a.trust.legitimacy_score, a.trust.verdict
    ));
    out
}

pub fn render_trust_md(report: &TrustReport) -> String {
    let mut out = String::new();
    out.push_str("# abtguard trust report\n\n");
    out.push_str(&format!(
        "- Legitimacy score: {}/100\n",
        report.legitimacy_score
    ));
    out.push_str(&format!("- Verdict: {}\n", report.verdict));
    out.push_str(&format!("- Evidence table: `{}`\n", report.table_version));
    if !report.cited_rules.is_empty() {
        out.push_str(&format!("- Rules: {}\n", report.cited_rules.join(", ")));
    }
    out.push('\n');

    if !report.strengths.is_empty() {
        out.push_str("## Strengths\n\n");
        for item in &report.strengths {
            out.push_str(&format!("- {}\n", item));
        }
        out.push('\n');
    }

    if !report.caveats.is_empty() {
        out.push_str("## Caveats\n\n");
        for c in &report.caveats {
            out.push_str(&format!("- {}\n", c));
        }
        out.push('\n');
    }

    out.push_str("## Sources\n\n");
    if report.sources.is_empty() {
        out.push_str("_No sources cited._\n");
        return out;
    }
    for s in &report.sources {
        out.push_str(&format!(
            "- [{}] {}: {} (checked {}, confidence {:.2})\n",
            s.tier.label(),
            s.title,
            s.source_url,
            s.date_checked,
            s.confidence
        ));
    }
    out
}

pub fn render_artifact_md(source: &str, sha256: &str, artifact: &ParsedArtifact) -> String {
    let mut out = String::new();
    out.push_str("# abtguard artifact\n\n");
    out.push_str(&format!("- Source: `{}`\n", source));
    out.push_str(&format!("- SHA-256: `{}`\n", sha256));
    out.push_str(&format!("- Format: `{}`\n", artifact.format_version));
    out.push_str(&format!(
        "- Module hint: {}\n",
        artifact.module_hint.as_deref().unwrap_or("-")
    ));
    if let Some(stamp) = &artifact.classified {
        out.push_str(&format!(
            "- Offset table: `{}` (companion compared: {})\n",
            stamp.offset_table_version, stamp.companion_compared
        ));
    }
    out.push_str(&format!(
        "- Blocks: {} ({} records)\n\n",
        artifact.blocks.len(),
        artifact.record_count()
    ));

    out.push_str("## Blocks\n\n");
    if artifact.blocks.is_empty() {
        out.push_str("_No blocks._\n");
        return out;
    }

    out.push_str("| Block | Bytes | Label | Confidence | Editable | Signals |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for b in &artifact.blocks {
        let signals: Vec<String> = b.signals.iter().map(signal_label).collect();
        out.push_str(&format!(
            "| `{:#06x}` | {} | {} | {:.2} | {} | {} |\n",
            b.block_id,
            b.byte_len(),
            b.classification.label(),
            b.classification.confidence(),
            if b.classification.is_editable() { "yes" } else { "no" },
            if signals.is_empty() { "-".to_string() } else { signals.join(", ") }
        ));
    }
    out
}

fn signal_label(s: &ClassificationSignal) -> String {
    match s {
        ClassificationSignal::ValuesChanged { changed } => format!("changed({})", changed),
        ClassificationSignal::ValuesStable => "stable".to_string(),
        ClassificationSignal::CuratedCoverage { covered, total } => {
            format!("curated({}/{})", covered, total)
        }
        ClassificationSignal::NoCuratedEntry => "uncurated".to_string(),
        ClassificationSignal::Uniform { value } => format!("uniform({:#x})", value),
    }
}

fn cross_check_label(k: CrossCheckKind) -> &'static str {
    match k {
        CrossCheckKind::ValueConfirmed => "value_confirmed",
        CrossCheckKind::AddressNotFound => "address_not_found",
        CrossCheckKind::CurrentValueMismatch => "current_value_mismatch",
        CrossCheckKind::CurrentValueUnparsed => "current_value_unparsed",
        CrossCheckKind::NotEditable => "not_editable",
        CrossCheckKind::ModuleHintMismatch => "module_hint_mismatch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abtguard_types::artifact::{
        ArtifactBlock, ArtifactRecord, BlockClassification, ClassifierStamp, FormatVersion,
    };
    use abtguard_types::change::{
        ChangeRequest, CrossCheck, Prerequisite, PrerequisiteKind, RiskTier,
    };
    use abtguard_types::evidence::{EvidenceRecord, EvidenceTier, VERDICT_MODERATE};
    use pretty_assertions::assert_eq;

    fn trust() -> TrustReport {
        TrustReport {
            score: 0.82,
            legitimacy_score: 82,
            verdict: VERDICT_MODERATE.to_string(),
            table_version: "2026.02.21".to_string(),
            cited_rules: vec!["param.tire_size".to_string()],
            sources: vec![EvidenceRecord {
                id: "forscan.home".to_string(),
                title: "FORScan home".to_string(),
                source_url: "https://forscan.org/home.html".to_string(),
                tier: EvidenceTier::Official,
                confidence: 0.9,
                date_checked: "2026-02-21".parse().unwrap(),
                strengths: vec!["Active release notes.".to_string()],
                caveats: vec![],
            }],
            strengths: vec!["Active release notes.".to_string()],
            caveats: vec!["Behavior varies by model year.".to_string()],
        }
    }

    fn assessment(satisfied: bool) -> RiskAssessment {
        RiskAssessment {
            schema: "abtguard.assessment.v1".to_string(),
            assessment_id: "id-1".to_string(),
            request: ChangeRequest::new("ABS", "TireSize", "265/70R17", "285/70R17"),
            risk_tier: RiskTier::High,
            fired_rules: vec!["module.braking".to_string(), "param.tire_size".to_string()],
            prerequisites: vec![Prerequisite {
                id: PrerequisiteKind::BackupExported,
                description: PrerequisiteKind::BackupExported.description().to_string(),
                required_by: vec!["module.braking".to_string()],
                satisfied,
            }],
            rollback_steps: vec!["Restore the exported backup.".to_string()],
            execution_steps: if satisfied {
                vec!["Write the new value.".to_string()]
            } else {
                vec![]
            },
            blocked: !satisfied,
            blocked_reason: (!satisfied).then(|| "unmet prerequisites: backup_exported".to_string()),
            warnings: vec!["No writes are performed by this tool.".to_string()],
            cross_checks: vec![CrossCheck {
                kind: CrossCheckKind::AddressNotFound,
                message: "block 0x0401 not present".to_string(),
            }],
            trust: trust(),
        }
    }

    #[test]
    fn blocked_assessment_withholds_steps() {
        let md = render_assessment_md(&assessment(false));
        assert!(md.starts_with("# abtguard assessment\n\n"));
        assert!(md.contains("- Risk tier: **HIGH**\n"));
        assert!(md.contains("- [ ] `backup_exported`"));
        assert!(md.contains("_Withheld: unmet prerequisites: backup_exported._"));
        assert!(md.contains("- `address_not_found` block 0x0401 not present\n"));
        assert!(md.ends_with("Trust: 82/100 (moderate-confidence, verify per-vehicle before writes)\n"));
    }

    #[test]
    fn released_assessment_lists_numbered_steps() {
        let md = render_assessment_md(&assessment(true));
        assert!(md.contains("- [x] `backup_exported`"));
        assert!(md.contains("1. Write the new value.\n"));
        assert!(!md.contains("_Withheld"));
    }

    #[test]
    fn trust_report_lists_sources() {
        let md = render_trust_md(&trust());
        assert!(md.contains("- Legitimacy score: 82/100\n"));
        assert!(md.contains(
            "## Strengths\n\n- Active release notes.\n\n## Caveats\n\n- Behavior varies by model year.\n"
        ));
        assert!(md.contains(
            "- [official] FORScan home: https://forscan.org/home.html (checked 2026-02-21, confidence 0.90)\n"
        ));
    }

    #[test]
    fn trust_report_without_sources() {
        let mut report = trust();
        report.sources.clear();
        report.strengths.clear();
        report.caveats.clear();
        report.cited_rules.clear();
        let md = render_trust_md(&report);
        assert!(md.ends_with("## Sources\n\n_No sources cited._\n"));
        assert!(!md.contains("## Strengths"));
        assert!(!md.contains("- Rules:"));
    }

    #[test]
    fn artifact_table_rows() {
        let artifact = ParsedArtifact {
            format_version: FormatVersion::Legacy,
            module_hint: Some("BCM".to_string()),
            blocks: vec![ArtifactBlock {
                block_id: 0x0101,
                format_version: FormatVersion::Legacy,
                records: vec![ArtifactRecord {
                    block_id: 0x0101,
                    offset: 0,
                    raw_value: 0x1234,
                }],
                classification: BlockClassification::Configuration { confidence: 0.8 },
                signals: vec![ClassificationSignal::CuratedCoverage {
                    covered: 1,
                    total: 1,
                }],
            }],
            classified: Some(ClassifierStamp {
                offset_table_version: "2026.02.1".to_string(),
                companion_compared: false,
            }),
        };
        let md = render_artifact_md("backup.abt", "abc123", &artifact);
        assert_eq!(
            md.lines().last(),
            Some("| `0x0101` | 2 | configuration | 0.80 | yes | curated(1/1) |")
        );
        assert!(md.contains("- Offset table: `2026.02.1` (companion compared: false)\n"));
    }
}
