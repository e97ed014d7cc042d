//! Compare a change request against a decoded backup of the same module.
//!
//! Findings are advisory. They never change the risk tier.

use abtguard_types::artifact::ParsedArtifact;
use abtguard_types::change::{ChangeRequest, CrossCheck, CrossCheckKind};

/// Parse the address form `<block>@<offset>`. Both parts accept decimal or `0x` hex.
pub fn parse_address(parameter: &str) -> Option<(u32, u32)> {
    let (block, offset) = parameter.trim().split_once('@')?;
    Some((parse_number(block)?, parse_number(offset)?))
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

pub fn cross_check(request: &ChangeRequest, artifact: &ParsedArtifact) -> Vec<CrossCheck> {
    let mut out = Vec::new();

    if let Some(hint) = artifact.module_hint.as_deref()
        && !hint.trim().eq_ignore_ascii_case(request.module.trim())
    {
        out.push(CrossCheck {
            kind: CrossCheckKind::ModuleHintMismatch,
            message: format!(
                "backup is for module '{}' but the request targets '{}'",
                hint.trim(),
                request.module.trim()
            ),
        });
    }

    let Some((block_id, offset)) = parse_address(&request.parameter) else {
        return out;
    };

    let Some(block) = artifact.block(block_id) else {
        out.push(CrossCheck {
            kind: CrossCheckKind::AddressNotFound,
            message: format!("block {block_id:#x} is not present in the backup"),
        });
        return out;
    };
    let Some(record) = block.record_at(offset) else {
        out.push(CrossCheck {
            kind: CrossCheckKind::AddressNotFound,
            message: format!("block {block_id:#x} has no value at offset {offset}"),
        });
        return out;
    };

    match parse_number(&request.current_value) {
        None => out.push(CrossCheck {
            kind: CrossCheckKind::CurrentValueUnparsed,
            message: format!(
                "current value '{}' is not a number; backup holds {:#x}",
                request.current_value.trim(),
                record.raw_value
            ),
        }),
        Some(declared) if declared != record.raw_value => out.push(CrossCheck {
            kind: CrossCheckKind::CurrentValueMismatch,
            message: format!(
                "declared current value {declared:#x} differs from backup value {:#x}",
                record.raw_value
            ),
        }),
        Some(_) => out.push(CrossCheck {
            kind: CrossCheckKind::ValueConfirmed,
            message: format!(
                "backup confirms {:#x} at {block_id:#x}@{offset}",
                record.raw_value
            ),
        }),
    }

    if !block.classification.is_editable() {
        let message = if artifact.is_classified() {
            format!(
                "block {block_id:#x} is classified {} (confidence {:.2}), not editable configuration",
                block.classification.label(),
                block.classification.confidence()
            )
        } else {
            format!("block {block_id:#x} has not been classified; treat it as unknown")
        };
        out.push(CrossCheck {
            kind: CrossCheckKind::NotEditable,
            message,
        });
    }

    out
}
