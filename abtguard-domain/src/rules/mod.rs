use abtguard_types::change::{ChangeRequest, PrerequisiteKind, RiskTier};
use serde::Serialize;

mod module_class;
mod pattern;

/// Id reported when no table rule matched.
pub const DEFAULT_RULE_ID: &str = "default.unmatched";

/// Static description of one rule: when it fires and what it demands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMeta {
    pub rule_id: &'static str,
    pub description: &'static str,
    pub tier: RiskTier,

    /// Case-insensitive globs (`*`, `?`) over the module name.
    pub module_patterns: &'static [&'static str],

    /// Case-insensitive globs over the parameter name. Empty matches any parameter.
    pub parameter_patterns: &'static [&'static str],

    pub prerequisites: &'static [PrerequisiteKind],
    pub rollback: &'static [&'static str],

    /// Evidence ids backing this rule.
    pub evidence: &'static [&'static str],
}

impl RuleMeta {
    pub fn matches(&self, request: &ChangeRequest) -> bool {
        let module = request.module.trim();
        let parameter = request.parameter.trim();
        self.module_patterns.iter().any(|p| glob_match(p, module))
            && (self.parameter_patterns.is_empty()
                || self.parameter_patterns.iter().any(|p| glob_match(p, parameter)))
    }
}

pub trait Rule: Send + Sync {
    fn meta(&self) -> RuleMeta;

    fn matches(&self, request: &ChangeRequest) -> bool {
        self.meta().matches(request)
    }
}

/// A rule fully described by its [`RuleMeta`].
#[derive(Debug, Clone)]
pub struct TableRule(pub RuleMeta);

impl Rule for TableRule {
    fn meta(&self) -> RuleMeta {
        self.0.clone()
    }

    fn matches(&self, request: &ChangeRequest) -> bool {
        self.0.matches(request)
    }
}

/// The ordered built-in rule table.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    builtin_rule_metas()
        .into_iter()
        .map(|meta| Box::new(TableRule(meta)) as Box<dyn Rule>)
        .collect()
}

pub fn builtin_rule_metas() -> Vec<RuleMeta> {
    let mut metas = module_class::metas();
    metas.extend(pattern::metas());
    metas
}

/// Outcome used when nothing in the table matched. Never `Low`.
pub(crate) fn default_rule() -> RuleMeta {
    RuleMeta {
        rule_id: DEFAULT_RULE_ID,
        description: "No specific rule covers this module/parameter pair; generic caution applies.",
        tier: RiskTier::Medium,
        module_patterns: &["*"],
        parameter_patterns: &[],
        prerequisites: &[
            PrerequisiteKind::BackupExported,
            PrerequisiteKind::StablePower,
            PrerequisiteKind::BaselineScan,
        ],
        rollback: &["If behavior regresses, restore previous value immediately"],
        evidence: &["forscan.home", "forscan.forum.configuration"],
    }
}

/// Appended after every rule's own rollback steps.
pub(crate) const COMMON_ROLLBACK: &[&str] = &[
    "If communication faults appear, write original As-Built backup",
    "Clear DTCs only after root cause is addressed and repair is verified",
];

/// Case-insensitive glob with `*` and `?`.
fn glob_match(pat: &str, text: &str) -> bool {
    let p = pat.to_ascii_lowercase().into_bytes();
    let t = text.to_ascii_lowercase().into_bytes();
    let mut dp = vec![vec![false; t.len() + 1]; p.len() + 1];
    dp[0][0] = true;

    for i in 1..=p.len() {
        if p[i - 1] == b'*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=p.len() {
        for j in 1..=t.len() {
            dp[i][j] = match p[i - 1] {
                b'*' => dp[i - 1][j] || dp[i][j - 1],
                b'?' => dp[i - 1][j - 1],
                c => dp[i - 1][j - 1] && c == t[j - 1],
            };
        }
    }

    dp[p.len()][t.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn glob_match_is_case_insensitive() {
        assert!(glob_match("abs", "ABS"));
        assert!(glob_match("*tire*size*", "TireSize"));
        assert!(glob_match("*tire*size*", "Tire Size (mm)"));
        assert!(glob_match("SYNC*", "sync3"));
        assert!(!glob_match("a?b", "ab"));
        assert!(glob_match("a?b", "AcB"));
    }

    #[test]
    fn builtin_rule_ids_are_unique() {
        let metas = builtin_rule_metas();
        let ids: BTreeSet<_> = metas.iter().map(|m| m.rule_id).collect();
        assert_eq!(ids.len(), metas.len());
        assert!(!ids.contains(DEFAULT_RULE_ID));
    }

    #[test]
    fn every_rule_demands_a_backup() {
        for meta in builtin_rule_metas().into_iter().chain([default_rule()]) {
            assert!(
                meta.prerequisites.contains(&PrerequisiteKind::BackupExported),
                "{}",
                meta.rule_id
            );
            assert!(!meta.evidence.is_empty(), "{}", meta.rule_id);
        }
    }

    #[test]
    fn default_rule_is_never_low() {
        assert_eq!(default_rule().tier, RiskTier::Medium);
    }
}
