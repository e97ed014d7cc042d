//! ABT artifact ingestion.
//!
//! Two steps, both pure:
//! - [`decode_artifact`] turns bytes into a [`ParsedArtifact`] or a typed [`FormatError`]. The
//!   format version comes from the fixed-position signature; field widths follow from it.
//! - [`Classifier`] labels each decoded block as configuration, volatile state, or unknown.
//!   When the evidence is thin it says `Unknown` rather than guess `Configuration`.
//!
//! [`ParsedArtifact`]: abtguard_types::artifact::ParsedArtifact
//! [`FormatError`]: abtguard_types::error::FormatError

mod classify;
mod decode;
mod discover;
mod offsets;

pub use classify::{Classifier, classify_blocks};
pub use decode::{
    ArtifactLoadError, decode_artifact, decode_artifact_input, decode_artifact_text,
    detect_version, load_artifact,
};
pub use discover::{discover_artifacts, parse_file_name};
pub use offsets::{OffsetRange, OffsetTable};
