//! Error taxonomy shared by every abtguard crate.
//!
//! - [`FormatError`]: the artifact could not be decoded. Fatal to that parse.
//! - [`ConfigurationError`]: a static table (rules, evidence, offsets) is malformed. Fatal at
//!   startup.
//! - [`ValidationError`]: a caller-supplied request is incomplete. Rejected before evaluation.
//!
//! Each variant names the offending offset, table entry, rule, or field.

use crate::artifact::FormatVersion;
use thiserror::Error;

/// An artifact that cannot be decoded. Never accompanied by a partial result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("format error at byte {offset}: {reason}")]
pub struct FormatError {
    pub reason: FormatErrorReason,

    /// Byte position where the problem was detected.
    pub offset: usize,
}

impl FormatError {
    pub fn new(reason: FormatErrorReason, offset: usize) -> Self {
        Self { reason, offset }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatErrorReason {
    #[error("ambiguous version: no legacy or extended signature found")]
    AmbiguousVersion,

    #[error("version mismatch: declared {declared}, artifact signature says {detected}")]
    VersionMismatch {
        declared: FormatVersion,
        detected: FormatVersion,
    },

    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("block {block_id:#x}: length {length} is not a multiple of the {width}-byte value width")]
    MisalignedBlock {
        block_id: u32,
        length: usize,
        width: usize,
    },

    #[error("block {block_id:#x} declared more than once")]
    DuplicateBlock { block_id: u32 },

    #[error("{count} trailing bytes after the last declared block")]
    TrailingBytes { count: usize },

    #[error("module hint is not valid UTF-8")]
    InvalidModuleHint,

    #[error("text line {line} is not valid hex")]
    InvalidText { line: usize },
}

/// A static table that failed validation. The table is never partially loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{table} table: cannot read {path}: {message}")]
    Unreadable {
        table: &'static str,
        path: String,
        message: String,
    },

    #[error("{table} table: parse error: {message}")]
    Malformed { table: &'static str, message: String },

    #[error("{table} table: unsupported schema '{found}' (expected '{expected}')")]
    UnsupportedSchema {
        table: &'static str,
        found: String,
        expected: &'static str,
    },

    #[error("{table} table: entry '{entry}': {message}")]
    InvalidEntry {
        table: &'static str,
        entry: String,
        message: String,
    },

    #[error("{table} table: duplicate entry '{entry}'")]
    DuplicateEntry { table: &'static str, entry: String },

    #[error("rule '{rule_id}' cites unknown evidence '{evidence_id}'")]
    UnknownCitation {
        rule_id: String,
        evidence_id: String,
    },

    #[error("rule '{rule_id}': {message}")]
    InvalidRule { rule_id: String, message: String },
}

/// A caller-supplied value that was rejected before any evaluation ran.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("change request field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("unknown rule '{rule_id}'")]
    UnknownRule { rule_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_display_names_offset_and_reason() {
        let err = FormatError::new(
            FormatErrorReason::Truncated {
                needed: 8,
                available: 4,
            },
            9,
        );
        let msg = err.to_string();
        assert!(msg.contains("byte 9"));
        assert!(msg.contains("needed 8"));
    }

    #[test]
    fn version_mismatch_display_names_both_versions() {
        let reason = FormatErrorReason::VersionMismatch {
            declared: FormatVersion::Legacy,
            detected: FormatVersion::Extended,
        };
        assert_eq!(
            reason.to_string(),
            "version mismatch: declared legacy, artifact signature says extended"
        );
    }

    #[test]
    fn validation_error_names_field() {
        let err = ValidationError::EmptyField { field: "parameter" };
        assert!(err.to_string().contains("'parameter'"));
    }
}
