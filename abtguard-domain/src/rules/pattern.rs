//! Parameter-pattern rules.

use super::RuleMeta;
use abtguard_types::change::{PrerequisiteKind as P, RiskTier};

const IDENTITY_BLOCK: &[P] = &[
    P::BackupExported,
    P::StablePower,
    P::BaselineScan,
    P::NetworkVerified,
    P::OemProcedureReviewed,
    P::AdapterVerified,
];

pub(super) fn metas() -> Vec<RuleMeta> {
    vec![
        RuleMeta {
            rule_id: "param.tire_size",
            description: "Tire size changes speedometer, ABS and stability control calibration.",
            tier: RiskTier::Medium,
            module_patterns: &["*"],
            parameter_patterns: &["*tire*size*"],
            prerequisites: &[P::BackupExported, P::StablePower, P::BaselineScan],
            rollback: &[
                "Restore the previous tire size value",
                "Compare speedometer reading against GPS after the change",
            ],
            evidence: &["forscan.howto", "forscan.forum.configuration"],
        },
        RuleMeta {
            rule_id: "param.vid_block",
            description: "PCM vehicle identification (VID) block.",
            tier: RiskTier::High,
            module_patterns: &["PCM"],
            parameter_patterns: &["*VID*"],
            prerequisites: IDENTITY_BLOCK,
            rollback: &["Restore the original VID block from the saved backup"],
            evidence: &["forscan.downloads", "forscan.forum.configuration"],
        },
        RuleMeta {
            rule_id: "param.trid_block",
            description: "TCM transmission identification (TRID) block.",
            tier: RiskTier::High,
            module_patterns: &["TCM"],
            parameter_patterns: &["*TRID*"],
            prerequisites: IDENTITY_BLOCK,
            rollback: &[
                "Restore the original TRID block from the saved backup",
                "Perform the transmission adaptive relearn drive cycle",
            ],
            evidence: &["forscan.downloads", "forscan.forum.configuration"],
        },
        RuleMeta {
            rule_id: "param.ecc",
            description: "Economized Central Configuration is shared by many modules at once.",
            tier: RiskTier::High,
            module_patterns: &["*"],
            parameter_patterns: &["ECC", "ECC *", "* ECC", "*central*config*"],
            prerequisites: &[
                P::BackupExported,
                P::StablePower,
                P::BaselineScan,
                P::NetworkVerified,
                P::OemProcedureReviewed,
                P::RelearnPlan,
            ],
            rollback: &[
                "Restore the previous ECC values in every module that received them",
                "Run initialization/relearn on all affected modules before clearing U2100/U2101",
            ],
            evidence: &[
                "forscan.docs",
                "forscan.howto",
                "forscan.forum.configuration",
            ],
        },
        RuleMeta {
            rule_id: "param.infotainment",
            description: "Infotainment feature enables.",
            tier: RiskTier::Low,
            module_patterns: &["APIM", "ACM", "SYNC*"],
            parameter_patterns: &[],
            prerequisites: &[P::BackupExported],
            rollback: &["Restore the previous value and power-cycle the module"],
            evidence: &["forscan.home", "forscan.forum.configuration"],
        },
        RuleMeta {
            rule_id: "param.cluster_display",
            description: "Instrument cluster display, menu and gauge options.",
            tier: RiskTier::Low,
            module_patterns: &["IPC"],
            parameter_patterns: &["*display*", "*menu*", "*gauge*"],
            prerequisites: &[P::BackupExported],
            rollback: &["Restore the previous value and cycle the ignition"],
            evidence: &["forscan.home", "forscan.forum.configuration"],
        },
        RuleMeta {
            rule_id: "param.lighting_convenience",
            description: "Body control lighting convenience options.",
            tier: RiskTier::Low,
            module_patterns: &["BCM"],
            parameter_patterns: &["*lamp*", "*DRL*", "*light*"],
            prerequisites: &[P::BackupExported, P::StablePower],
            rollback: &["Restore the previous value and confirm exterior lamps operate"],
            evidence: &["forscan.home", "forscan.forum.configuration"],
        },
    ]
}
