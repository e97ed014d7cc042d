//! Domain logic: turn a proposed change into a risk tier and a gated checklist.
//!
//! This crate decides *how risky* an edit is and *what must be true* before advice is released.
//! It never talks to a vehicle; every output is advisory.

mod cross_check;
mod engine;
mod rules;

pub use cross_check::{cross_check, parse_address};
pub use engine::{AssessContext, AssessError, RiskEngine, assess_change};
pub use rules::{DEFAULT_RULE_ID, Rule, RuleMeta, TableRule, builtin_rule_metas, builtin_rules};
