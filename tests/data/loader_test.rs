//! Tests for loading matching data from CSV and Parquet files

use crate::utils::{duplicated_populations, fixture_schema, write_csv};
use popmatch::data::io::write_parquet;
use popmatch::{FeatureSchema, MatchingData, MatchingError};
use tempfile::tempdir;

#[test]
fn test_load_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.csv");
    write_csv(
        &path,
        &["1.5,red,pool", "2.0,blue,pool", "3.5,red,target", "0.5,green,target"],
    );

    let data = MatchingData::from_path(&path, "population", fixture_schema()).unwrap();
    assert_eq!(data.num_rows(), 4);
    assert_eq!(data.populations(), vec!["pool", "target"]);
    assert_eq!(data.numeric_values("x").unwrap(), vec![1.5, 2.0, 3.5, 0.5]);
    assert_eq!(
        data.categoric_values("color").unwrap(),
        vec!["red", "blue", "red", "green"]
    );
}

#[test]
fn test_parquet_round_trip_keeps_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.parquet");
    let data = duplicated_populations();
    write_parquet(data.batch(), &path).unwrap();

    let loaded = MatchingData::from_path(&path, "population", fixture_schema()).unwrap();
    assert_eq!(loaded.num_rows(), data.num_rows());
    assert_eq!(loaded.counts(), data.counts());
    assert_eq!(
        loaded.numeric_values("x").unwrap(),
        data.numeric_values("x").unwrap()
    );
}

#[test]
fn test_single_population_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("single.csv");
    write_csv(&path, &["1.0,red,pool", "2.0,blue,pool"]);

    let result = MatchingData::from_path(&path, "population", fixture_schema());
    assert!(matches!(result, Err(MatchingError::Schema(_))));
}

#[test]
fn test_missing_feature_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.csv");
    write_csv(&path, &["1.0,red,pool", "2.0,blue,target"]);

    let schema = FeatureSchema::from_lists(&["x", "age"], &["color"]);
    let result = MatchingData::from_path(&path, "population", schema);
    assert!(matches!(result, Err(MatchingError::Schema(_))));
}

#[test]
fn test_missing_population_column_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.csv");
    write_csv(&path, &["1.0,red,pool", "2.0,blue,target"]);

    let result = MatchingData::from_path(&path, "group", fixture_schema());
    assert!(matches!(result, Err(MatchingError::Schema(_))));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.json");
    std::fs::write(&path, "{}").unwrap();

    let result = MatchingData::from_path(&path, "population", fixture_schema());
    assert!(matches!(result, Err(MatchingError::Io(_))));
}
