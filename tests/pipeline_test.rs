//! End-to-end tests of the library pipeline
//!
//! corpus → counts → count_dict.json → distributions, without the CLI.

use pwdist::counts::{ComponentKind, CountAggregator, CountStore, ShiftLabelPolicy};
use pwdist::distribution::{
    build_distributions, count_to_distribution, read_distribution, top_n, DistributionStore,
};
use std::path::Path;

/// Ten passwords: three illegal (too long, non-printable, too short).
const CORPUS: &str = r#"[
    {"password": "Dragon1990"},
    {"password": "dragon2000"},
    {"password": "DRAGON!!"},
    {"password": "m0nkey123"},
    {"password": "monkey123"},
    {"password": "123456"},
    {"password": "sunshine"},
    {"password": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"},
    {"password": "tab\tinside"},
    {"password": "abc1"}
]"#;

fn write_corpus(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("dump.json"), CORPUS).unwrap();
}

#[test]
fn test_ten_passwords_three_illegal() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus/Poland");
    write_corpus(&corpus);

    let bundle = CountAggregator::default().aggregate_dir(&corpus).unwrap();
    assert_eq!(bundle.total_passwords, 7);
    assert_eq!(bundle.illegal_passwords, 3);

    // dragon x3, monkey x2 (one de-leeted), 123456, sunshine
    let base = bundle.table(ComponentKind::BaseWord).unwrap();
    assert_eq!(base.len(), 4);
    assert_eq!(base.get("dragon"), 3);
    assert_eq!(base.get("monkey"), 2);
    assert_eq!(base.get("123456"), 1);
    assert_eq!(base.total(), 7);

    let suffix = bundle.table(ComponentKind::Suffix).unwrap();
    assert_eq!(suffix.get("123"), 2);
    assert_eq!(suffix.get(""), 2);
}

#[test]
fn test_counts_survive_the_round_trip_and_build_the_same_models() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus/Japan");
    write_corpus(&corpus);
    let out = dir.path().join("models/Japan");

    let bundle = CountAggregator::default().aggregate_dir(&corpus).unwrap();
    let store = CountStore::new(&out);
    store.save(&bundle, true).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded.total_passwords, bundle.total_passwords);
    assert_eq!(loaded.illegal_passwords, bundle.illegal_passwords);
    for kind in ComponentKind::all() {
        let a = bundle.table(*kind).unwrap();
        let b = loaded.table(*kind).unwrap();
        assert_eq!(a.len(), b.len(), "{}", kind);
        for (key, count) in a.iter() {
            assert_eq!(b.get(key), count, "{} {:?}", kind, key);
        }
    }

    let distributions = DistributionStore::new(&out);
    build_distributions(&loaded, &[1, 2], &distributions).unwrap();

    for kind in ComponentKind::all() {
        let name = DistributionStore::full_table_name(*kind);
        let entries = read_distribution(&distributions.table_path(&name)).unwrap();
        let mass: f64 = entries.iter().map(|(_, p)| p).sum();
        assert!((mass - 1.0).abs() < 1e-9, "{} sums to {}", name, mass);

        let keys: Vec<&String> = entries.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    let metadata = distributions.read_metadata(2).unwrap();
    assert_eq!(metadata.len(), 5);
    assert!(!distributions.metadata_path(1).exists());
}

#[test]
fn test_truncation_keeps_the_most_probable_keys() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus/France");
    write_corpus(&corpus);

    let bundle = CountAggregator::default().aggregate_dir(&corpus).unwrap();
    let probs = count_to_distribution(bundle.table(ComponentKind::BaseWord).unwrap()).unwrap();

    let top = top_n(&probs, 2);
    assert_eq!(top.table.len(), 2);
    assert!((top.table.get("dragon").unwrap() - 3.0 / 7.0).abs() < 1e-12);
    assert!((top.table.get("monkey").unwrap() - 2.0 / 7.0).abs() < 1e-12);
    assert!((top.retained_mass - 5.0 / 7.0).abs() < 1e-12);
}

#[test]
fn test_all_cap_policy_changes_only_the_shift_table() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus/Italy");
    write_corpus(&corpus);

    let verbatim = CountAggregator::default().aggregate_dir(&corpus).unwrap();
    let sentinel = CountAggregator::default()
        .with_shift_policy(ShiftLabelPolicy::AllCapSentinel)
        .aggregate_dir(&corpus)
        .unwrap();

    let shifts = verbatim.table(ComponentKind::ShiftPattern).unwrap();
    assert_eq!(shifts.get("[0, 1, 2, 3, 4, 5]"), 1);
    assert_eq!(shifts.get("all-cap"), 0);

    let shifts = sentinel.table(ComponentKind::ShiftPattern).unwrap();
    assert_eq!(shifts.get("all-cap"), 1);
    assert_eq!(shifts.get("[0, 1, 2, 3, 4, 5]"), 0);

    assert_eq!(
        verbatim.table(ComponentKind::BaseWord),
        sentinel.table(ComponentKind::BaseWord)
    );
}
