//! Row selection utilities for matching data
//!
//! This module provides functions for selecting rows of record batches by
//! index and for rewriting the population label column.

use crate::data::extraction::label_column;
use crate::error::{MatchingError, Result};
use arrow::array::{ArrayRef, BooleanArray, StringArray, UInt32Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Take rows of a `RecordBatch` in the order given by `indices`
///
/// # Errors
/// Returns an error if an index is out of bounds
pub fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    let num_rows = batch.num_rows();
    let take_indices = indices
        .iter()
        .map(|&idx| {
            if idx < num_rows {
                u32::try_from(idx).map_err(|_| {
                    MatchingError::Schema(format!("Row index {idx} exceeds u32 range"))
                })
            } else {
                Err(MatchingError::Schema(format!(
                    "Index out of bounds: {idx} >= {num_rows}"
                )))
            }
        })
        .collect::<Result<Vec<u32>>>()?;

    let take_indices = UInt32Array::from(take_indices);
    Ok(compute::take_record_batch(batch, &take_indices)?)
}

/// Keep only rows where `mask` is true, preserving order
pub fn filter_rows(batch: &RecordBatch, mask: &[bool]) -> Result<RecordBatch> {
    if mask.len() != batch.num_rows() {
        return Err(MatchingError::Schema(format!(
            "Mask length {} does not match {} rows",
            mask.len(),
            batch.num_rows()
        )));
    }
    let mask = BooleanArray::from(mask.to_vec());
    Ok(compute::filter_record_batch(batch, &mask)?)
}

/// Replace the label column with `label + suffix` for every row
///
/// The column is rewritten as `Utf8` regardless of its original type.
pub fn suffix_labels(batch: &RecordBatch, column: &str, suffix: &str) -> Result<RecordBatch> {
    let labels = label_column(batch, column)?;
    let relabeled: ArrayRef = Arc::new(StringArray::from(
        labels
            .iter()
            .map(|label| format!("{label}{suffix}"))
            .collect::<Vec<_>>(),
    ));

    let schema = batch.schema();
    let idx = schema
        .index_of(column)
        .map_err(|_| MatchingError::Schema(format!("Column {column} not found")))?;

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            if i == idx {
                Field::new(field.name(), DataType::Utf8, field.is_nullable())
            } else {
                field.as_ref().clone()
            }
        })
        .collect();

    let mut columns = batch.columns().to_vec();
    columns[idx] = relabeled;

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Deep copy a batch into freshly allocated buffers
pub fn deep_copy(batch: &RecordBatch) -> Result<RecordBatch> {
    let columns = batch
        .columns()
        .iter()
        .map(|col| {
            // Concatenating a single array allocates new buffers
            compute::concat(&[col.as_ref()]).map_err(MatchingError::from)
        })
        .collect::<Result<Vec<ArrayRef>>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}
