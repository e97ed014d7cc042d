use crate::error::ValidationError;
use crate::evidence::TrustReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A proposed edit to one module parameter.
///
/// All four fields are opaque strings. Only non-emptiness is validated; value syntax is
/// vehicle specific and never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub module: String,
    pub parameter: String,
    pub current_value: String,
    pub target_value: String,
}

impl ChangeRequest {
    pub fn new(
        module: impl Into<String>,
        parameter: impl Into<String>,
        current_value: impl Into<String>,
        target_value: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            parameter: parameter.into(),
            current_value: current_value.into(),
            target_value: target_value.into(),
        }
    }

    /// Trimmed copy of the request, or the first empty field in declaration order.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let fields = [
            ("module", &self.module),
            ("parameter", &self.parameter),
            ("current_value", &self.current_value),
            ("target_value", &self.target_value),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField { field });
            }
        }
        Ok(Self::new(
            self.module.trim(),
            self.parameter.trim(),
            self.current_value.trim(),
            self.target_value.trim(),
        ))
    }
}

/// Declaration order is severity order, so `max()` is the worst tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checklist vocabulary. Declaration order is the canonical checklist order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrerequisiteKind {
    BackupExported,
    StablePower,
    BaselineScan,
    NetworkVerified,
    ModuleTypeAcknowledged,
    OemProcedureReviewed,
    RelearnPlan,
    AdapterVerified,
}

impl PrerequisiteKind {
    pub const ALL: &'static [PrerequisiteKind] = &[
        PrerequisiteKind::BackupExported,
        PrerequisiteKind::StablePower,
        PrerequisiteKind::BaselineScan,
        PrerequisiteKind::NetworkVerified,
        PrerequisiteKind::ModuleTypeAcknowledged,
        PrerequisiteKind::OemProcedureReviewed,
        PrerequisiteKind::RelearnPlan,
        PrerequisiteKind::AdapterVerified,
    ];

    pub fn id(self) -> &'static str {
        match self {
            PrerequisiteKind::BackupExported => "backup_exported",
            PrerequisiteKind::StablePower => "stable_power",
            PrerequisiteKind::BaselineScan => "baseline_scan",
            PrerequisiteKind::NetworkVerified => "network_verified",
            PrerequisiteKind::ModuleTypeAcknowledged => "module_type_acknowledged",
            PrerequisiteKind::OemProcedureReviewed => "oem_procedure_reviewed",
            PrerequisiteKind::RelearnPlan => "relearn_plan",
            PrerequisiteKind::AdapterVerified => "adapter_verified",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let wanted = id.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.iter().copied().find(|k| k.id() == wanted)
    }

    pub fn description(self) -> &'static str {
        match self {
            PrerequisiteKind::BackupExported => {
                "Module backup exported (As-Built and plain-text configuration)"
            }
            PrerequisiteKind::StablePower => {
                "Stable external power (battery maintainer) connected before any write"
            }
            PrerequisiteKind::BaselineScan => "Baseline DTC scan of all modules recorded",
            PrerequisiteKind::NetworkVerified => "Ignition state and network stability verified",
            PrerequisiteKind::ModuleTypeAcknowledged => {
                "Module type and its safety classification acknowledged"
            }
            PrerequisiteKind::OemProcedureReviewed => {
                "Official service procedure for this module and model year reviewed"
            }
            PrerequisiteKind::RelearnPlan => {
                "Relearn/initialization procedure identified and available after the write"
            }
            PrerequisiteKind::AdapterVerified => {
                "Adapter capability for this operation confirmed"
            }
        }
    }
}

impl fmt::Display for PrerequisiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
    pub id: PrerequisiteKind,
    pub description: String,

    /// Rules that demanded this item, in rule-table order.
    #[serde(default)]
    pub required_by: Vec<String>,

    /// Supplied by the caller; `false` unless explicitly confirmed.
    #[serde(default)]
    pub satisfied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossCheckKind {
    ValueConfirmed,
    AddressNotFound,
    CurrentValueMismatch,
    CurrentValueUnparsed,
    NotEditable,
    ModuleHintMismatch,
}

/// A finding from comparing a request against a decoded artifact. Never changes the tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCheck {
    pub kind: CrossCheckKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub schema: String,
    pub assessment_id: String,
    pub request: ChangeRequest,
    pub risk_tier: RiskTier,
    pub fired_rules: Vec<String>,
    pub prerequisites: Vec<Prerequisite>,
    pub rollback_steps: Vec<String>,

    /// Withheld (empty) while any prerequisite is unmet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_steps: Vec<String>,

    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cross_checks: Vec<CrossCheck>,

    pub trust: TrustReport,
}

impl RiskAssessment {
    pub fn unmet_prerequisites(&self) -> impl Iterator<Item = &Prerequisite> {
        self.prerequisites.iter().filter(|p| !p.satisfied)
    }

    pub fn requires(&self, kind: PrerequisiteKind) -> bool {
        self.prerequisites.iter().any(|p| p.id == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_every_field() {
        let request = ChangeRequest::new(" BCM ", "DRL\t", " off", "on ");
        assert_eq!(
            request.normalized().unwrap(),
            ChangeRequest::new("BCM", "DRL", "off", "on")
        );
    }

    #[test]
    fn normalized_reports_first_empty_field() {
        let err = ChangeRequest::new("BCM", "DRL", "  ", "").normalized().unwrap_err();
        assert_eq!(
            err,
            ValidationError::EmptyField {
                field: "current_value"
            }
        );
    }

    #[test]
    fn tiers_order_by_severity() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
        assert_eq!(
            [RiskTier::Medium, RiskTier::High, RiskTier::Low]
                .into_iter()
                .max(),
            Some(RiskTier::High)
        );
    }

    #[test]
    fn prerequisite_ids_round_trip() {
        for kind in PrerequisiteKind::ALL {
            assert_eq!(PrerequisiteKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(
            PrerequisiteKind::from_id(" Stable-Power "),
            Some(PrerequisiteKind::StablePower)
        );
        assert_eq!(PrerequisiteKind::from_id("coffee"), None);
    }

    #[test]
    fn prerequisite_serializes_snake_case() {
        let value = serde_json::to_value(PrerequisiteKind::ModuleTypeAcknowledged).unwrap();
        assert_eq!(value, serde_json::json!("module_type_acknowledged"));
    }
}
