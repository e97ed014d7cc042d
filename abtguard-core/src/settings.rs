//! Clap-free settings for the pipelines.

use abtguard_types::artifact::FormatVersion;
use abtguard_types::change::ChangeRequest;
use camino::Utf8PathBuf;

/// Settings for the inspect pipeline.
#[derive(Debug, Clone)]
pub struct InspectSettings {
    pub artifact: Utf8PathBuf,

    /// Second backup of the same module, taken shortly after the first.
    pub companion: Option<Utf8PathBuf>,

    /// Expected format version. Checked against the signature, never trusted over it.
    pub format_version: Option<FormatVersion>,
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self {
            artifact: Utf8PathBuf::from("backup.abt"),
            companion: None,
            format_version: None,
        }
    }
}

/// Settings for the assess pipeline.
#[derive(Debug, Clone)]
pub struct AssessSettings {
    pub request: ChangeRequest,

    /// Prerequisite ids the operator has confirmed.
    pub confirmed: Vec<String>,

    // Optional backup for cross-checks
    pub artifact: Option<Utf8PathBuf>,
    pub companion: Option<Utf8PathBuf>,
    pub format_version: Option<FormatVersion>,
}

impl AssessSettings {
    pub fn new(request: ChangeRequest) -> Self {
        Self {
            request,
            confirmed: Vec::new(),
            artifact: None,
            companion: None,
            format_version: None,
        }
    }
}

/// Settings for the trust report.
#[derive(Debug, Clone, Default)]
pub struct TrustSettings {
    /// Rules to report on. Empty means the whole table.
    pub rule_ids: Vec<String>,
}
