//! Shared DTOs (schemas-as-code) for the abtguard workspace.
//!
//! # Design constraints
//! - Everything here is handed to exporters as-is, so every type serializes.
//! - Decoded and classified values are never mutated in place; producers return new values.
//! - Prefer adding optional fields over changing semantics.

pub mod artifact;
pub mod change;
pub mod error;
pub mod evidence;

/// Schema identifiers.
pub mod schema {
    pub const ABTGUARD_EVIDENCE_V1: &str = "abtguard.evidence.v1";
    pub const ABTGUARD_OFFSETS_V1: &str = "abtguard.offsets.v1";
    pub const ABTGUARD_ASSESSMENT_V1: &str = "abtguard.assessment.v1";
    pub const ABTGUARD_INSPECT_V1: &str = "abtguard.inspect.v1";
}
