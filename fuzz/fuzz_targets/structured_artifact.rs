#![no_main]

//! Fuzz target for well-formed backups.
//!
//! Builds a valid encoding from structured input and checks that it decodes back to the same
//! blocks, and that every strict prefix is rejected.

use abtguard_artifact::decode_artifact;
use abtguard_types::artifact::FormatVersion;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

#[derive(Debug, Arbitrary)]
struct Input {
    extended: bool,
    hint: Option<String>,
    blocks: BTreeMap<u16, Vec<u16>>,
}

fn put(out: &mut Vec<u8>, value: u32, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

fuzz_target!(|input: Input| {
    let version = if input.extended {
        FormatVersion::Extended
    } else {
        FormatVersion::Legacy
    };
    let width = version.value_width();

    let hint = input.hint.unwrap_or_default();
    if hint.len() > usize::from(u8::MAX) || input.blocks.len() > usize::from(u8::MAX) {
        return;
    }
    let max_values = if input.extended { 255 } else { 255 / width };

    let mut out = FormatVersion::MAGIC.to_vec();
    out.push(version.marker());
    out.push(hint.len() as u8);
    out.extend_from_slice(hint.as_bytes());
    put(&mut out, input.blocks.len() as u32, version.block_count_width());
    for (id, values) in &input.blocks {
        let values = &values[..values.len().min(max_values)];
        put(&mut out, u32::from(*id), version.block_id_width());
        put(&mut out, (values.len() * width) as u32, version.block_len_width());
        for v in values {
            put(&mut out, u32::from(*v), width);
        }
    }

    let parsed = decode_artifact(&out, None).expect("well-formed backup decodes");
    assert_eq!(parsed.format_version, version);
    assert_eq!(parsed.blocks.len(), input.blocks.len());
    for (block, (id, values)) in parsed.blocks.iter().zip(&input.blocks) {
        assert_eq!(block.block_id, u32::from(*id));
        let decoded: Vec<u32> = block.records.iter().map(|r| r.raw_value).collect();
        let expected: Vec<u32> = values
            .iter()
            .take(max_values)
            .map(|v| u32::from(*v))
            .collect();
        assert_eq!(decoded, expected);
    }

    for cut in 0..out.len() {
        assert!(decode_artifact(&out[..cut], None).is_err());
    }
});
