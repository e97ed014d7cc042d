use abtguard_types::artifact::ArtifactFileMeta;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use glob::glob;
use tracing::debug;

/// List the `*.abt` backups in `dir`, newest capture first.
///
/// Files must be named `VIN_SYSTEM_YYYYMMDD_HHMMSS.abt`; anything else is skipped. A missing
/// directory yields an empty list.
pub fn discover_artifacts(dir: &Utf8Path) -> anyhow::Result<Vec<ArtifactFileMeta>> {
    if !dir.is_dir() {
        debug!(dir = %dir, "backup directory does not exist");
        return Ok(Vec::new());
    }

    let pattern = dir.join("*.abt");
    let mut out = Vec::new();
    for entry in glob(pattern.as_str()).context("glob *.abt")? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            debug!("skipping non UTF-8 path");
            continue;
        };
        match parse_file_name(&path) {
            Some(meta) => out.push(meta),
            None => debug!(path = %path, "skipping backup with non-conforming name"),
        }
    }

    // Newest first; ties broken by name so the listing is stable.
    out.sort_by(|a, b| {
        b.captured_at
            .cmp(&a.captured_at)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    Ok(out)
}

/// Recover VIN, system and capture time from a backup file name.
pub fn parse_file_name(path: &Utf8Path) -> Option<ArtifactFileMeta> {
    let file_name = path.file_name()?;
    let stem = file_name.strip_suffix(".abt")?;

    let mut parts = stem.split('_');
    let vin = parts.next().filter(|s| !s.is_empty())?;
    let system = parts.next().filter(|s| !s.is_empty())?;
    let date = parts.next()?;
    let time = parts.next()?;

    let captured_at = NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S").ok()?;

    Some(ArtifactFileMeta {
        path: path.to_path_buf(),
        file_name: file_name.to_string(),
        vin: vin.to_string(),
        system: system.to_string(),
        captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn parses_conforming_name() {
        let meta = parse_file_name(Utf8Path::new("/tmp/1FTFW1E50NFA00001_BCM_20260221_134501.abt"))
            .expect("conforming");
        assert_eq!(meta.vin, "1FTFW1E50NFA00001");
        assert_eq!(meta.system, "BCM");
        assert_eq!(
            meta.captured_at,
            NaiveDate::from_ymd_opt(2026, 2, 21)
                .and_then(|d| d.and_hms_opt(13, 45, 1))
                .expect("valid date")
        );
    }

    #[test]
    fn rejects_bad_names() {
        for name in [
            "VIN_BCM.abt",
            "VIN_BCM_2026_1200.abt",
            "VIN_BCM_20261340_120000.abt",
            "_BCM_20260221_134501.abt",
            "VIN_BCM_20260221_134501.txt",
        ] {
            assert!(parse_file_name(Utf8Path::new(name)).is_none(), "{name}");
        }
    }
}
