//! Tests for copies, splits and appends of matching data

use crate::utils::{duplicated_populations, fixture_data};
use popmatch::{MatchingError, generate_toy_dataset};

#[test]
fn test_copy_is_independent_of_append() {
    let original = generate_toy_dataset(30, 10, 3).unwrap();
    let snapshot = original.copy().unwrap();
    let mut copy = original.copy().unwrap();

    let extra = original.population("target").unwrap();
    copy.append(&extra).unwrap();

    assert_eq!(copy.num_rows(), 50);
    assert_eq!(original.num_rows(), 40);
    assert_eq!(original, snapshot);
    assert_eq!(original.counts()["target"], 10);
}

#[test]
fn test_append_relabelled_records_adds_populations() {
    let mut data = duplicated_populations();
    let matched = data.take(&[0, 5]).unwrap();
    data.append(&matched.relabel_populations(" (postmatch)").unwrap())
        .unwrap();

    let counts = data.counts();
    assert_eq!(counts.len(), 4);
    assert_eq!(counts["target (postmatch)"], 1);
    assert_eq!(counts["pool (postmatch)"], 1);
}

#[test]
fn test_append_rejects_different_schema() {
    let mut data = duplicated_populations();
    let other = generate_toy_dataset(5, 5, 1).unwrap();
    assert!(matches!(
        data.append(&other),
        Err(MatchingError::SchemaMismatch(_))
    ));
}

#[test]
fn test_split_with_third_population_is_ambiguous() {
    let data = fixture_data(
        &[1.0, 2.0, 3.0],
        &["red", "blue", "red"],
        &["pool", "target", "other"],
    );
    assert!(matches!(
        data.split_by_population("pool", "target"),
        Err(MatchingError::Partition(_))
    ));
}

#[test]
fn test_split_missing_population() {
    let data = fixture_data(&[1.0, 2.0], &["red", "blue"], &["pool", "control"]);
    assert!(matches!(
        data.split_by_population("pool", "target"),
        Err(MatchingError::Partition(_))
    ));
}

#[test]
fn test_population_keeps_record_order() {
    let data = fixture_data(
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &["red", "blue", "green", "red", "blue"],
        &["pool", "target", "pool", "target", "pool"],
    );
    let pool = data.population("pool").unwrap();
    assert_eq!(pool.num_rows(), 3);
    assert_eq!(pool.labels(), ["pool", "pool", "pool"]);
    assert_eq!(pool.numeric_values("x").unwrap(), vec![1.0, 3.0, 5.0]);
    assert_eq!(
        pool.categoric_values("color").unwrap(),
        vec!["red", "green", "blue"]
    );
    assert!(matches!(
        data.population("control"),
        Err(MatchingError::Partition(_))
    ));
}
