//! Test-only encoder. Production code never writes artifacts.

#![allow(dead_code)]

use abtguard_types::artifact::{
    ArtifactBlock, ArtifactRecord, BlockClassification, FormatVersion, ParsedArtifact,
};

fn put(out: &mut Vec<u8>, value: u32, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

pub fn encode(artifact: &ParsedArtifact) -> Vec<u8> {
    let v = artifact.format_version;
    let mut out = FormatVersion::MAGIC.to_vec();
    out.push(v.marker());

    let hint = artifact.module_hint.as_deref().unwrap_or("");
    out.push(hint.len() as u8);
    out.extend_from_slice(hint.as_bytes());

    put(&mut out, artifact.blocks.len() as u32, v.block_count_width());
    for block in &artifact.blocks {
        put(&mut out, block.block_id, v.block_id_width());
        put(&mut out, block.byte_len() as u32, v.block_len_width());
        for record in &block.records {
            put(&mut out, record.raw_value, v.value_width());
        }
    }
    out
}

pub fn block(version: FormatVersion, block_id: u32, values: &[u32]) -> ArtifactBlock {
    let width = version.value_width() as u32;
    ArtifactBlock {
        block_id,
        format_version: version,
        records: values
            .iter()
            .enumerate()
            .map(|(i, v)| ArtifactRecord {
                block_id,
                offset: i as u32 * width,
                raw_value: *v,
            })
            .collect(),
        classification: BlockClassification::unclassified(),
        signals: Vec::new(),
    }
}

pub fn artifact(
    version: FormatVersion,
    module_hint: Option<&str>,
    blocks: Vec<ArtifactBlock>,
) -> ParsedArtifact {
    ParsedArtifact {
        format_version: version,
        module_hint: module_hint.map(str::to_string),
        blocks,
        classified: None,
    }
}
