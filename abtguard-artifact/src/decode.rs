use abtguard_types::artifact::{
    ArtifactBlock, ArtifactRecord, BlockClassification, FormatVersion, ParsedArtifact,
};
use abtguard_types::error::{FormatError, FormatErrorReason};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Resolve the format version from the fixed-position signature.
///
/// Only the magic and the marker byte are consulted. Payload bytes never influence the result,
/// so a legacy artifact can't be read as extended (or the reverse) by accident.
pub fn detect_version(bytes: &[u8]) -> Result<FormatVersion, FormatError> {
    let magic = FormatVersion::MAGIC;
    if !bytes.starts_with(magic) {
        return Err(FormatError::new(FormatErrorReason::AmbiguousVersion, 0));
    }

    let Some(&marker) = bytes.get(magic.len()) else {
        return Err(FormatError::new(
            FormatErrorReason::Truncated {
                needed: 1,
                available: 0,
            },
            magic.len(),
        ));
    };

    FormatVersion::from_marker(marker)
        .ok_or_else(|| FormatError::new(FormatErrorReason::AmbiguousVersion, magic.len()))
}

/// Decode a binary artifact.
///
/// A `version_hint` is checked against the signature, never trusted over it: a mismatch fails
/// with `VersionMismatch`, and a hint can't stand in for a missing signature.
pub fn decode_artifact(
    bytes: &[u8],
    version_hint: Option<FormatVersion>,
) -> Result<ParsedArtifact, FormatError> {
    let version = detect_version(bytes)?;
    if let Some(declared) = version_hint
        && declared != version
    {
        return Err(FormatError::new(
            FormatErrorReason::VersionMismatch {
                declared,
                detected: version,
            },
            FormatVersion::MAGIC.len(),
        ));
    }

    let mut cur = Cursor::new(bytes, FormatVersion::SIGNATURE_LEN);

    let hint_len = cur.read_uint(1)? as usize;
    let hint_at = cur.pos;
    let hint_bytes = cur.take(hint_len)?;
    let module_hint = if hint_bytes.is_empty() {
        None
    } else {
        let s = std::str::from_utf8(hint_bytes)
            .map_err(|_| FormatError::new(FormatErrorReason::InvalidModuleHint, hint_at))?;
        Some(s.to_string())
    };

    let block_count = cur.read_uint(version.block_count_width())?;
    let width = version.value_width();

    let mut seen = BTreeSet::new();
    let mut blocks = Vec::new();
    for _ in 0..block_count {
        let header_at = cur.pos;
        let block_id = cur.read_uint(version.block_id_width())?;
        let length = cur.read_uint(version.block_len_width())? as usize;

        if length % width != 0 {
            return Err(FormatError::new(
                FormatErrorReason::MisalignedBlock {
                    block_id,
                    length,
                    width,
                },
                header_at,
            ));
        }
        if !seen.insert(block_id) {
            return Err(FormatError::new(
                FormatErrorReason::DuplicateBlock { block_id },
                header_at,
            ));
        }

        let payload = cur.take(length)?;
        let records = payload
            .chunks_exact(width)
            .enumerate()
            .map(|(idx, chunk)| ArtifactRecord {
                block_id,
                offset: (idx * width) as u32,
                raw_value: le_uint(chunk),
            })
            .collect();

        blocks.push(ArtifactBlock {
            block_id,
            format_version: version,
            records,
            classification: BlockClassification::unclassified(),
            signals: Vec::new(),
        });
    }

    let trailing = cur.remaining();
    if trailing > 0 {
        return Err(FormatError::new(
            FormatErrorReason::TrailingBytes { count: trailing },
            cur.pos,
        ));
    }

    debug!(
        version = %version,
        blocks = blocks.len(),
        module_hint = module_hint.as_deref().unwrap_or("-"),
        "decoded artifact"
    );

    Ok(ParsedArtifact {
        format_version: version,
        module_hint,
        blocks,
        classified: None,
    })
}

/// Decode the text (hex dump) form of an artifact.
///
/// Blank lines and `#` comments are skipped and whitespace inside a line is ignored. The
/// remaining hex is concatenated and decoded exactly like the binary form.
pub fn decode_artifact_text(
    text: &str,
    version_hint: Option<FormatVersion>,
) -> Result<ParsedArtifact, FormatError> {
    let mut bytes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            continue;
        }
        let decoded = hex::decode(&compact).map_err(|_| {
            FormatError::new(FormatErrorReason::InvalidText { line: idx + 1 }, bytes.len())
        })?;
        bytes.extend_from_slice(&decoded);
    }
    decode_artifact(&bytes, version_hint)
}

/// Decode either form. Input is read as a hex dump only when it is UTF-8 whose non-comment
/// content is hex digits and whitespace; anything else is decoded as binary, so a foreign
/// file surfaces as a signature error rather than a text error.
pub fn decode_artifact_input(
    bytes: &[u8],
    version_hint: Option<FormatVersion>,
) -> Result<ParsedArtifact, FormatError> {
    if bytes.starts_with(FormatVersion::MAGIC) {
        return decode_artifact(bytes, version_hint);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) if looks_like_hex_dump(text) => decode_artifact_text(text, version_hint),
        _ => decode_artifact(bytes, version_hint),
    }
}

fn looks_like_hex_dump(text: &str) -> bool {
    let mut digits = false;
    for line in text.lines() {
        let content = line.split('#').next().unwrap_or_default();
        for c in content.chars() {
            if c.is_ascii_hexdigit() {
                digits = true;
            } else if !c.is_whitespace() {
                return false;
            }
        }
    }
    digits
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArtifactLoadError {
    #[error("io error reading {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("{path}: {source}")]
    Format {
        path: Utf8PathBuf,
        #[source]
        source: FormatError,
    },
}

/// Read and decode one artifact file.
pub fn load_artifact(
    path: &Utf8Path,
    version_hint: Option<FormatVersion>,
) -> Result<ParsedArtifact, ArtifactLoadError> {
    let bytes = fs::read(path).map_err(|e| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    decode_artifact_input(&bytes, version_hint).map_err(|source| ArtifactLoadError::Format {
        path: path.to_path_buf(),
        source,
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let available = self.remaining();
        if available < n {
            return Err(FormatError::new(
                FormatErrorReason::Truncated {
                    needed: n,
                    available,
                },
                self.pos,
            ));
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_uint(&mut self, width: usize) -> Result<u32, FormatError> {
        self.take(width).map(le_uint)
    }
}

fn le_uint(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .rev()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_uint_reads_little_endian() {
        assert_eq!(le_uint(&[0x34, 0x12]), 0x1234);
        assert_eq!(le_uint(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(le_uint(&[0xff]), 0xff);
    }

    #[test]
    fn detect_rejects_missing_magic() {
        let err = detect_version(b"XYZ\x01").unwrap_err();
        assert_eq!(err.reason, FormatErrorReason::AmbiguousVersion);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn detect_rejects_unknown_marker() {
        let err = detect_version(b"ABT\x07").unwrap_err();
        assert_eq!(err.reason, FormatErrorReason::AmbiguousVersion);
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn detect_reports_missing_marker_as_truncated() {
        let err = detect_version(b"ABT").unwrap_err();
        assert!(matches!(err.reason, FormatErrorReason::Truncated { .. }));
    }

    #[test]
    fn cursor_take_never_short_reads() {
        let mut cur = Cursor::new(&[1, 2, 3], 1);
        let err = cur.take(3).unwrap_err();
        assert_eq!(
            err.reason,
            FormatErrorReason::Truncated {
                needed: 3,
                available: 2
            }
        );
        assert_eq!(cur.pos, 1);
    }
}
