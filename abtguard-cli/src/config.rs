//! Configuration file loading for abtguard.
//!
//! Discovers and loads `abtguard.toml` from the working root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "abtguard.toml";

/// Top-level configuration from abtguard.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbtguardConfig {
    /// Table file overrides.
    pub tables: TablesConfig,

    /// Defaults for the assess command.
    pub assess: AssessConfig,
}

/// Tables section. Relative paths resolve against the directory holding the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TablesConfig {
    pub evidence: Option<Utf8PathBuf>,
    pub offsets: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssessConfig {
    /// Prerequisite ids confirmed on every run (a bench setup with a fixed power supply, say).
    pub confirm: Vec<String>,
}

/// Discover the abtguard.toml config file in `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.is_file() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a config file, resolving table paths against its directory.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<AbtguardConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    let mut config =
        parse_config(&contents).with_context(|| format!("parse config file {}", path))?;

    let base = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    config.tables.evidence = config.tables.evidence.map(|p| resolve(base, p));
    config.tables.offsets = config.tables.offsets.map(|p| resolve(base, p));
    Ok(config)
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<AbtguardConfig> {
    let config: AbtguardConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return default if not found.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<AbtguardConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(AbtguardConfig::default()),
    }
}

fn resolve(base: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() || base.as_str().is_empty() {
        path
    } else {
        base.join(path)
    }
}

/// Configuration after CLI arguments were applied over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedConfig {
    pub evidence_table: Option<Utf8PathBuf>,
    pub offset_table: Option<Utf8PathBuf>,

    /// Confirmed prerequisite ids (config file first, extended by CLI).
    pub confirmed: Vec<String>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: AbtguardConfig,
}

impl ConfigMerger {
    pub fn new(config: AbtguardConfig) -> Self {
        Self { config }
    }

    /// CLI table paths replace the file's; CLI confirmations extend the file's list.
    pub fn merge(
        self,
        cli_evidence: Option<Utf8PathBuf>,
        cli_offsets: Option<Utf8PathBuf>,
        cli_confirm: &[String],
    ) -> MergedConfig {
        let mut confirmed = self.config.assess.confirm;
        for id in cli_confirm {
            if !confirmed.contains(id) {
                confirmed.push(id.clone());
            }
        }

        MergedConfig {
            evidence_table: cli_evidence.or(self.config.tables.evidence),
            offset_table: cli_offsets.or(self.config.tables.offsets),
            confirmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn parse_full_config() {
        let contents = r#"
[tables]
evidence = "tables/evidence.toml"
offsets = "/etc/abtguard/offsets.toml"

[assess]
confirm = ["stable_power", "adapter_verified"]
"#;
        let config = parse_config(contents).unwrap();
        assert_eq!(
            config.tables.evidence.as_deref(),
            Some(Utf8Path::new("tables/evidence.toml"))
        );
        assert_eq!(config.assess.confirm, vec!["stable_power", "adapter_verified"]);
    }

    #[test]
    fn parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.tables.evidence.is_none());
        assert!(config.tables.offsets.is_none());
        assert!(config.assess.confirm.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("[tables]\nrules = \"x.toml\"\n").is_err());
    }

    #[test]
    fn cli_overrides_tables_and_extends_confirmations() {
        let config = AbtguardConfig {
            tables: TablesConfig {
                evidence: Some("file/evidence.toml".into()),
                offsets: Some("file/offsets.toml".into()),
            },
            assess: AssessConfig {
                confirm: vec!["stable_power".to_string()],
            },
        };
        let merged = ConfigMerger::new(config).merge(
            Some("cli/evidence.toml".into()),
            None,
            &["stable_power".to_string(), "backup_exported".to_string()],
        );
        assert_eq!(
            merged,
            MergedConfig {
                evidence_table: Some("cli/evidence.toml".into()),
                offset_table: Some("file/offsets.toml".into()),
                confirmed: vec!["stable_power".to_string(), "backup_exported".to_string()],
            }
        );
    }

    #[test]
    fn discover_and_resolve_relative_tables() {
        let td = TempDir::new().unwrap();
        let root = Utf8Path::from_path(td.path()).unwrap();
        assert!(discover_config(root).is_none());
        assert!(load_or_default(root).unwrap().tables.evidence.is_none());

        fs::write(
            root.join(CONFIG_FILE_NAME),
            "[tables]\nevidence = \"evidence.toml\"\n",
        )
        .unwrap();
        let config = load_or_default(root).unwrap();
        assert_eq!(config.tables.evidence, Some(root.join("evidence.toml")));
    }

    #[test]
    fn broken_config_names_the_file() {
        let td = TempDir::new().unwrap();
        let root = Utf8Path::from_path(td.path()).unwrap();
        fs::write(root.join(CONFIG_FILE_NAME), "[assess\n").unwrap();
        let err = load_or_default(root).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    }
}
