use abtguard_evidence::EvidenceStore;
use abtguard_types::error::ConfigurationError;
use abtguard_types::evidence::{EvidenceTier, VERDICT_LOW, VERDICT_MODERATE};
use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn table(entries: &str) -> String {
    format!("schema = \"abtguard.evidence.v1\"\nversion = \"t1\"\n{entries}")
}

fn entry(id: &str, tier: u8, confidence: f64, caveats: &[&str]) -> String {
    let caveats: Vec<String> = caveats.iter().map(|c| format!("\"{c}\"")).collect();
    format!(
        "[[evidence]]\nid = \"{id}\"\ntitle = \"{id} title\"\nsource_url = \"https://example.test/{id}\"\n\
         tier = {tier}\nconfidence = {confidence:?}\ndate_checked = \"2026-02-21\"\ncaveats = [{}]\n",
        caveats.join(", ")
    )
}

fn three_tier_store() -> EvidenceStore {
    let body = [
        entry("a.official", 1, 1.0, &["shared caveat"]),
        entry("b.community", 2, 0.5, &["shared caveat", "forum only"]),
        entry("c.anecdote", 3, 0.0, &[]),
    ]
    .concat();
    EvidenceStore::from_toml_str(&table(&body)).expect("valid table")
}

#[test]
fn aggregate_is_tier_weighted_mean() {
    let store = three_tier_store();
    let report = store
        .aggregate(["a.official", "b.community", "c.anecdote"])
        .expect("aggregate");

    // (1.0*1.0 + 0.6*0.5 + 0.25*0.0) / (1.0 + 0.6 + 0.25)
    let expected = 1.3 / 1.85;
    assert!((report.score - expected).abs() < 1e-9);
    assert_eq!(report.legitimacy_score, 70);
    assert_eq!(report.verdict, VERDICT_MODERATE);
    assert_eq!(report.table_version, "t1");

    let ids: Vec<&str> = report.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a.official", "b.community", "c.anecdote"]);
    assert_eq!(report.caveats, vec!["shared caveat", "forum only"]);
}

#[test]
fn official_source_outweighs_anecdote() {
    let store = three_tier_store();
    let mostly_official = store.aggregate(["a.official", "c.anecdote"]).expect("aggregate");
    let anecdote = store.aggregate(["c.anecdote"]).expect("aggregate");

    assert!(mostly_official.score > 0.5);
    assert_eq!(anecdote.score, 0.0);
    assert_eq!(anecdote.verdict, VERDICT_LOW);
}

#[test]
fn duplicate_ids_count_once() {
    let store = three_tier_store();
    let once = store.aggregate(["b.community", "a.official"]).expect("aggregate");
    let twice = store
        .aggregate(["a.official", "b.community", "a.official", " b.community "])
        .expect("aggregate");
    assert_eq!(once, twice);
}

#[test]
fn builtin_table_scores_moderate_overall() {
    let store = EvidenceStore::builtin().expect("builtin");
    let ids: Vec<String> = store.records().map(|r| r.id.clone()).collect();
    let report = store.aggregate(&ids).expect("aggregate");

    assert_eq!(report.sources.len(), 6);
    assert_eq!(report.legitimacy_score, 82);
    assert_eq!(report.verdict, VERDICT_MODERATE);
    assert!(
        report
            .sources
            .iter()
            .any(|s| s.tier == EvidenceTier::OfficialCommunity)
    );
}

#[test]
fn builtin_strengths_are_deduplicated_in_source_order() {
    let store = EvidenceStore::builtin().expect("builtin");
    let ids: Vec<String> = store.records().map(|r| r.id.clone()).collect();
    let report = store.aggregate(&ids).expect("aggregate");

    assert_eq!(
        report.strengths,
        vec![
            "Support, documentation, and forum channels are clearly linked.",
            "Current release notes show active maintenance (v2.3.70 referenced).",
            "Primary project website and long-term publication history are available.",
        ]
    );

    let howto = store.aggregate(["forscan.howto"]).expect("aggregate");
    assert!(howto.strengths.is_empty());
}

#[test]
fn duplicate_id_fails_whole_load() {
    let body = [entry("x", 1, 0.5, &[]), entry("x", 2, 0.5, &[])].concat();
    let err = EvidenceStore::from_toml_str(&table(&body)).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateEntry {
            table: "evidence",
            entry: "x".to_string()
        }
    );
}

#[test]
fn out_of_range_confidence_is_rejected() {
    let err = EvidenceStore::from_toml_str(&table(&entry("x", 1, 1.5, &[]))).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidEntry { ref entry, .. } if entry == "x"));
}

#[test]
fn out_of_range_tier_is_rejected() {
    let err = EvidenceStore::from_toml_str(&table(&entry("x", 4, 0.5, &[]))).unwrap_err();
    assert!(matches!(err, ConfigurationError::Malformed { .. }));
}

#[test]
fn empty_url_is_rejected() {
    let body = "[[evidence]]\nid = \"x\"\ntitle = \"t\"\nsource_url = \"  \"\ntier = 1\n\
                confidence = 0.5\ndate_checked = \"2026-02-21\"\n";
    let err = EvidenceStore::from_toml_str(&table(body)).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidEntry { .. }));
}

#[test]
fn unknown_schema_is_rejected() {
    let err = EvidenceStore::from_toml_str("schema = \"abtguard.evidence.v0\"\nversion = \"1\"\n")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::UnsupportedSchema { .. }));
}

#[test]
fn load_reads_override_file() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
    let path = root.join("evidence.toml");
    std::fs::write(&path, table(&entry("local", 2, 0.9, &[]))).expect("write");

    let store = EvidenceStore::load(&path).expect("load");
    assert_eq!(store.len(), 1);

    let err = EvidenceStore::load(&root.join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Unreadable { table: "evidence", .. }));
}

proptest! {
    #[test]
    fn aggregate_ignores_citation_order(picks in proptest::sample::subsequence(
        vec!["a.official", "b.community", "c.anecdote"], 0..=3
    ), seed in any::<u64>()) {
        let store = three_tier_store();
        let mut shuffled = picks.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }
        let a = store.aggregate(&picks).expect("aggregate");
        let b = store.aggregate(&shuffled).expect("aggregate");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn score_stays_within_unit_interval(conf in proptest::collection::vec(0.0f64..=1.0, 1..6)) {
        let body: String = conf
            .iter()
            .enumerate()
            .map(|(i, c)| entry(&format!("e{i}"), (i % 3 + 1) as u8, *c, &[]))
            .collect();
        let store = EvidenceStore::from_toml_str(&table(&body)).expect("valid table");
        let ids: Vec<String> = store.records().map(|r| r.id.clone()).collect();
        let report = store.aggregate(&ids).expect("aggregate");
        prop_assert!((0.0..=1.0).contains(&report.score));
        prop_assert!(report.legitimacy_score <= 100);
    }
}
