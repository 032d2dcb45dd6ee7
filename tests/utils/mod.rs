use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use popmatch::{FeatureSchema, MatcherConfig, MatchingData};

/// Schema used by the hand-built fixtures
#[must_use]
pub fn fixture_schema() -> FeatureSchema {
    FeatureSchema::from_lists(&["x"], &["color"])
}

/// Build a two-feature dataset from columns
#[must_use]
pub fn fixture_data(x: &[f64], color: &[&str], population: &[&str]) -> MatchingData {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float64, false),
        Field::new("color", DataType::Utf8, false),
        Field::new("population", DataType::Utf8, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Float64Array::from(x.to_vec())),
        Arc::new(StringArray::from(color.to_vec())),
        Arc::new(StringArray::from(population.to_vec())),
    ];
    let batch = RecordBatch::try_new(schema, columns).expect("valid fixture batch");
    MatchingData::new(batch, "population", fixture_schema()).expect("valid fixture data")
}

/// Dataset whose pool is an exact copy of its target
#[must_use]
pub fn duplicated_populations() -> MatchingData {
    let x = [1.0, 2.5, 3.0, 4.5, 7.0];
    let color = ["red", "blue", "blue", "green", "red"];
    let all_x: Vec<f64> = x.iter().chain(x.iter()).copied().collect();
    let all_color: Vec<&str> = color.iter().chain(color.iter()).copied().collect();
    let population: Vec<&str> = std::iter::repeat_n("target", x.len())
        .chain(std::iter::repeat_n("pool", x.len()))
        .collect();
    fixture_data(&all_x, &all_color, &population)
}

/// Quiet configuration for short searches
#[must_use]
pub fn quiet_config(max_iter: usize) -> MatcherConfig {
    MatcherConfig::builder()
        .max_iter(max_iter)
        .show_progress(false)
        .build()
}

/// Write a small CSV file with a header row
pub fn write_csv(path: &Path, rows: &[&str]) {
    let mut content = String::from("x,color,population\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    std::fs::write(path, content).expect("write csv fixture");
}
