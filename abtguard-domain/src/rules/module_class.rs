//! Module-class rules: these modules are `High` whatever the parameter.

use super::RuleMeta;
use abtguard_types::change::{PrerequisiteKind as P, RiskTier};

const SAFETY_CRITICAL: &[P] = &[
    P::BackupExported,
    P::StablePower,
    P::BaselineScan,
    P::NetworkVerified,
    P::ModuleTypeAcknowledged,
    P::OemProcedureReviewed,
];

pub(super) fn metas() -> Vec<RuleMeta> {
    vec![
        RuleMeta {
            rule_id: "module.braking",
            description: "Braking modules (ABS, electronic brake control, parking brake).",
            tier: RiskTier::High,
            module_patterns: &["ABS", "EBCM", "EPB", "PBM"],
            parameter_patterns: &[],
            prerequisites: SAFETY_CRITICAL,
            rollback: &[
                "Restore the saved As-Built backup for the braking module",
                "Run the brake system self-test and confirm no brake warnings before driving",
            ],
            evidence: &[
                "forscan.modules",
                "forscan.docs",
                "forscan.forum.configuration",
            ],
        },
        RuleMeta {
            rule_id: "module.restraint",
            description: "Restraint and occupant classification modules (airbags, seat sensing).",
            tier: RiskTier::High,
            module_patterns: &["RCM", "SRS", "OCSM", "OCS"],
            parameter_patterns: &[],
            prerequisites: SAFETY_CRITICAL,
            rollback: &[
                "Restore the saved As-Built backup for the restraint module",
                "Confirm the airbag lamp self-test completes and no restraint DTCs remain",
            ],
            evidence: &[
                "forscan.modules",
                "forscan.docs",
                "forscan.forum.configuration",
            ],
        },
        RuleMeta {
            rule_id: "module.powertrain_identity",
            description: "Powertrain and transmission modules carrying calibration identity.",
            tier: RiskTier::High,
            module_patterns: &["PCM", "ECM", "TCM"],
            parameter_patterns: &[],
            prerequisites: SAFETY_CRITICAL,
            rollback: &[
                "Restore the original As-Built and identity blocks from backup",
                "Verify the engine starts and no new powertrain DTCs are stored",
            ],
            evidence: &[
                "forscan.modules",
                "forscan.downloads",
                "forscan.forum.configuration",
            ],
        },
        RuleMeta {
            rule_id: "module.relearn_required",
            description: "Steering and driver-assist modules that need a relearn after any write.",
            tier: RiskTier::High,
            module_patterns: &["PSCM", "EPS", "IPMA", "SCCM"],
            parameter_patterns: &[],
            prerequisites: &[
                P::BackupExported,
                P::StablePower,
                P::BaselineScan,
                P::ModuleTypeAcknowledged,
                P::OemProcedureReviewed,
                P::RelearnPlan,
            ],
            rollback: &[
                "Restore the saved As-Built backup for the module",
                "Repeat the relearn/initialization procedure after restoring",
            ],
            evidence: &[
                "forscan.modules",
                "forscan.howto",
                "forscan.forum.configuration",
            ],
        },
    ]
}
