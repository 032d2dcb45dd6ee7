//! Matching data: a record table bound to a population label and a feature schema
//!
//! `MatchingData` wraps a single Arrow `RecordBatch`. The population
//! column partitions the records into named populations (conventionally
//! "pool" and "target"); the [`FeatureSchema`] declares which columns are
//! numeric and which are categoric covariates. Columns that are not
//! declared are carried along untouched.
//!
//! Every operation that changes the records returns or builds a new
//! batch; Arrow arrays are immutable, and [`MatchingData::copy`] allocates
//! fresh buffers, so a copy is fully independent of its source.

pub mod describe;
pub mod extraction;
pub mod filtering;
pub mod io;
pub mod schema;
pub mod sim;

use crate::error::{MatchingError, Result};
use arrow::compute::{can_cast_types, cast, concat_batches};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

pub use describe::{CategoricSummary, LevelFrequency, NumericSummary};
pub use schema::{FeatureKind, FeatureSchema};

/// Default name of the population label column
pub const DEFAULT_POPULATION_COL: &str = "population";

/// Conventional label of the candidate population
pub const POOL: &str = "pool";

/// Conventional label of the reference population
pub const TARGET: &str = "target";

/// Record table with population labels and a feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingData {
    batch: RecordBatch,
    population_col: String,
    schema: FeatureSchema,
    labels: Vec<String>,
}

impl MatchingData {
    /// Bind a record batch to a population column and feature schema
    ///
    /// # Errors
    /// Returns `MatchingError::Schema` if the population column or any
    /// declared feature is missing, a feature has an unusable type, or the
    /// population column has fewer than 2 distinct values.
    pub fn new(batch: RecordBatch, population_col: &str, schema: FeatureSchema) -> Result<Self> {
        let data = Self::from_parts(batch, population_col, schema)?;

        let populations = data.populations();
        if populations.len() < 2 {
            return Err(MatchingError::Schema(format!(
                "Population column {population_col} needs at least 2 distinct values, found {}",
                populations.len()
            )));
        }

        debug!(
            "Constructed matching data with {} rows, populations {:?}",
            data.num_rows(),
            populations
        );

        Ok(data)
    }

    /// Load a CSV or Parquet file and bind it
    pub fn from_path(path: &Path, population_col: &str, schema: FeatureSchema) -> Result<Self> {
        let batch = io::load_table(path)?;
        Self::new(batch, population_col, schema)
    }

    /// Validate columns and build without the distinct-population check
    fn from_parts(batch: RecordBatch, population_col: &str, schema: FeatureSchema) -> Result<Self> {
        let labels = extraction::label_column(&batch, population_col)?;

        let arrow_schema = batch.schema();
        for (name, kind) in schema.iter() {
            if name == population_col {
                return Err(MatchingError::Schema(format!(
                    "Feature {name} is the population column"
                )));
            }
            let field = arrow_schema
                .field_with_name(name)
                .map_err(|_| MatchingError::Schema(format!("Declared feature {name} not in table")))?;
            let usable = match kind {
                FeatureKind::Numeric => extraction::is_numeric_type(field.data_type()),
                FeatureKind::Categoric => can_cast_types(field.data_type(), &DataType::Utf8),
            };
            if !usable {
                return Err(MatchingError::Schema(format!(
                    "Feature {name} declared {kind} has incompatible type {:?}",
                    field.data_type()
                )));
            }
        }

        Ok(Self {
            batch,
            population_col: population_col.to_string(),
            schema,
            labels,
        })
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Feature schema
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Name of the population label column
    #[must_use]
    pub fn population_col(&self) -> &str {
        &self.population_col
    }

    /// Population label of every record
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of records
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether there are no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Distinct population labels in order of first appearance
    #[must_use]
    pub fn populations(&self) -> Vec<String> {
        self.labels.iter().unique().cloned().collect()
    }

    /// Record counts per population
    #[must_use]
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Row indices of a population, in record order
    #[must_use]
    pub fn indices_of(&self, population: &str) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == population)
            .map(|(i, _)| i)
            .collect()
    }

    /// Deep, independent copy
    pub fn copy(&self) -> Result<Self> {
        Ok(Self {
            batch: filtering::deep_copy(&self.batch)?,
            population_col: self.population_col.clone(),
            schema: self.schema.clone(),
            labels: self.labels.clone(),
        })
    }

    /// Records of a single population
    ///
    /// # Errors
    /// Returns `MatchingError::Partition` if the population is absent.
    pub fn population(&self, name: &str) -> Result<Self> {
        let mask: Vec<bool> = self.labels.iter().map(|l| l == name).collect();
        if !mask.contains(&true) {
            return Err(MatchingError::Partition(format!(
                "Population {name} not present (have {:?})",
                self.populations()
            )));
        }
        Ok(Self {
            batch: filtering::filter_rows(&self.batch, &mask)?,
            population_col: self.population_col.clone(),
            schema: self.schema.clone(),
            labels: vec![name.to_string(); mask.iter().filter(|&&keep| keep).count()],
        })
    }

    /// Split into (pool, target) views
    ///
    /// # Errors
    /// Returns `MatchingError::Partition` if either population is absent or
    /// a third population label is present.
    pub fn split_by_population(&self, pool: &str, target: &str) -> Result<(Self, Self)> {
        let populations = self.populations();
        if let Some(extra) = populations.iter().find(|p| *p != pool && *p != target) {
            return Err(MatchingError::Partition(format!(
                "Ambiguous split: population {extra} is neither {pool} nor {target}"
            )));
        }
        Ok((self.population(pool)?, self.population(target)?))
    }

    /// Records at the given row indices, in that order
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        let batch = filtering::take_rows(&self.batch, indices)?;
        let labels = indices.iter().map(|&i| self.labels[i].clone()).collect();
        Ok(Self {
            batch,
            population_col: self.population_col.clone(),
            schema: self.schema.clone(),
            labels,
        })
    }

    /// Copy with every population label suffixed, e.g. " (postmatch)"
    pub fn relabel_populations(&self, suffix: &str) -> Result<Self> {
        let batch = filtering::suffix_labels(&self.batch, &self.population_col, suffix)?;
        let labels = self.labels.iter().map(|l| format!("{l}{suffix}")).collect();
        Ok(Self {
            batch,
            population_col: self.population_col.clone(),
            schema: self.schema.clone(),
            labels,
        })
    }

    /// Append the records of another `MatchingData`
    ///
    /// Columns of `other` are cast to this table's column types.
    ///
    /// # Errors
    /// Returns `MatchingError::SchemaMismatch` if the feature schema,
    /// population column or column names differ.
    pub fn append(&mut self, other: &Self) -> Result<()> {
        if self.schema != other.schema || self.population_col != other.population_col {
            return Err(MatchingError::SchemaMismatch(format!(
                "Cannot append data with population column {} and features {:?} to {} / {:?}",
                other.population_col,
                other.schema.names(),
                self.population_col,
                self.schema.names()
            )));
        }

        let own_schema = self.batch.schema();
        let other_schema = other.batch.schema();
        let own_names: Vec<&String> = own_schema.fields().iter().map(|f| f.name()).collect();
        let other_names: Vec<&String> = other_schema.fields().iter().map(|f| f.name()).collect();
        if own_names != other_names {
            return Err(MatchingError::SchemaMismatch(format!(
                "Column names differ: {own_names:?} vs {other_names:?}"
            )));
        }

        let columns = own_schema
            .fields()
            .iter()
            .zip(other.batch.columns())
            .map(|(field, col)| {
                if col.data_type() == field.data_type() {
                    Ok(col.clone())
                } else {
                    cast(col, field.data_type()).map_err(|e| {
                        MatchingError::SchemaMismatch(format!(
                            "Column {} cannot be cast to {:?}: {e}",
                            field.name(),
                            field.data_type()
                        ))
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let aligned = RecordBatch::try_new(own_schema.clone(), columns)?;

        self.batch = concat_batches(&own_schema, [&self.batch, &aligned])?;
        self.labels.extend(other.labels.iter().cloned());
        Ok(())
    }

    /// Non-missing values of a numeric feature
    pub fn numeric_values(&self, feature: &str) -> Result<Vec<f64>> {
        extraction::numeric_values(&self.batch, feature)
    }

    /// Nullable values of a numeric feature, one per record
    pub fn numeric_column(&self, feature: &str) -> Result<Vec<Option<f64>>> {
        extraction::numeric_column(&self.batch, feature)
    }

    /// Levels of a categoric feature, one per record
    pub fn categoric_values(&self, feature: &str) -> Result<Vec<String>> {
        extraction::categoric_column(&self.batch, feature)
    }

    /// Per-population summaries of every numeric feature
    pub fn describe_numeric(&self) -> Result<Vec<NumericSummary>> {
        let populations = self.populations();
        let mut summaries = Vec::new();
        for feature in self.schema.numeric() {
            let column = self.numeric_column(feature)?;
            for population in &populations {
                let values: Vec<Option<f64>> = self
                    .indices_of(population)
                    .into_iter()
                    .map(|i| column[i])
                    .collect();
                summaries.push(NumericSummary::from_values(feature, population, &values));
            }
        }
        Ok(summaries)
    }

    /// Per-population level frequencies of every categoric feature
    pub fn describe_categoric(&self) -> Result<Vec<CategoricSummary>> {
        let populations = self.populations();
        let mut summaries = Vec::new();
        for feature in self.schema.categoric() {
            let column = self.categoric_values(feature)?;
            for population in &populations {
                let values: Vec<String> = self
                    .indices_of(population)
                    .into_iter()
                    .map(|i| column[i].clone())
                    .collect();
                summaries.push(CategoricSummary::from_values(feature, population, &values));
            }
        }
        Ok(summaries)
    }
}
