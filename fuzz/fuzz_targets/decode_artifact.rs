#![no_main]

//! Fuzz target for backup decoding.
//!
//! Arbitrary bytes go through the binary and text decoders. Decoding must never panic, and
//! anything that decodes must classify the same way twice.

use abtguard_artifact::{OffsetTable, classify_blocks, decode_artifact, decode_artifact_input};
use abtguard_types::artifact::{BlockClassification, FormatVersion};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_artifact(data, Some(FormatVersion::Legacy));
    let _ = decode_artifact(data, Some(FormatVersion::Extended));

    let Ok(parsed) = decode_artifact_input(data, None) else {
        return;
    };

    // Decoded block ids are unique.
    let mut ids: Vec<u32> = parsed.blocks.iter().map(|b| b.block_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), parsed.blocks.len());

    let Ok(table) = OffsetTable::builtin() else {
        return;
    };
    let once = classify_blocks(&parsed, &table);
    let twice = classify_blocks(&once, &table);
    assert_eq!(once, twice);
    for block in &once.blocks {
        if let BlockClassification::Unknown { confidence } = block.classification {
            assert!(confidence <= 0.5);
        }
    }
});
