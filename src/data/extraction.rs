//! Column extraction from Arrow record batches
//!
//! Numeric features are read through a cast to `Float64`, categoric
//! features and population labels through a cast to `Utf8`, so any Arrow
//! type with a lossless cast is accepted.

use crate::error::{MatchingError, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

/// Level used for null categoric values
pub const MISSING_LEVEL: &str = "<missing>";

/// Look up a column by name
pub fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| MatchingError::Schema(format!("Column {name} not found")))?;
    Ok(batch.column(idx))
}

/// Whether a data type can be read as a numeric feature
#[must_use]
pub const fn is_numeric_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Read a column as nullable `f64` values, one per row
///
/// Non-finite values are treated as missing.
pub fn numeric_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column_by_name(batch, name)?;
    if !is_numeric_type(array.data_type()) {
        return Err(MatchingError::Schema(format!(
            "Column {name} has non-numeric type {:?}",
            array.data_type()
        )));
    }

    let casted = cast(array, &DataType::Float64)?;
    let floats = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| MatchingError::Schema(format!("Column {name} is not a float array")))?;

    Ok((0..floats.len())
        .map(|i| {
            if floats.is_null(i) {
                None
            } else {
                Some(floats.value(i)).filter(|v| v.is_finite())
            }
        })
        .collect())
}

/// Read the non-missing values of a numeric column
pub fn numeric_values(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    Ok(numeric_column(batch, name)?.into_iter().flatten().collect())
}

/// Read a column as nullable strings, one per row
pub fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let array = column_by_name(batch, name)?;
    let casted = cast(array, &DataType::Utf8).map_err(|e| {
        MatchingError::Schema(format!("Column {name} cannot be read as text: {e}"))
    })?;
    let strings = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| MatchingError::Schema(format!("Column {name} is not a string array")))?;

    Ok((0..strings.len())
        .map(|i| {
            if strings.is_null(i) {
                None
            } else {
                Some(strings.value(i).to_string())
            }
        })
        .collect())
}

/// Read a categoric column, mapping nulls to [`MISSING_LEVEL`]
pub fn categoric_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    Ok(string_column(batch, name)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| MISSING_LEVEL.to_string()))
        .collect())
}

/// Read the population label column; null labels are rejected
pub fn label_column(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    string_column(batch, name)?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label.ok_or_else(|| {
                MatchingError::Schema(format!("Population column {name} is null at row {row}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("count", DataType::Int32, true),
            Field::new("color", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![Some(1), None, Some(3)])),
                Arc::new(StringArray::from(vec![Some("red"), Some("blue"), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_column_casts_integers() {
        let values = numeric_column(&batch(), "count").unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(numeric_values(&batch(), "count").unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_categoric_column_maps_nulls() {
        let values = categoric_column(&batch(), "color").unwrap();
        assert_eq!(values, vec!["red", "blue", MISSING_LEVEL]);
    }

    #[test]
    fn test_numeric_column_rejects_strings() {
        assert!(matches!(
            numeric_column(&batch(), "color"),
            Err(MatchingError::Schema(_))
        ));
    }

    #[test]
    fn test_label_column_rejects_nulls() {
        assert!(label_column(&batch(), "color").is_err());
        assert!(column_by_name(&batch(), "missing").is_err());
    }
}
