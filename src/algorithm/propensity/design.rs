//! Design matrix construction for propensity models
//!
//! Numeric features are z-scored over the included rows (missing values
//! imputed with the mean, i.e. 0 after scaling). Categoric features are
//! one-hot encoded with their first level (in sorted order) dropped.

use crate::algorithm::balance::statistics::{calculate_mean, calculate_std_dev};
use crate::data::{FeatureKind, MatchingData};
use crate::error::{MatchingError, Result};
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

/// Name of the intercept column
pub const INTERCEPT: &str = "(intercept)";

/// Covariate matrix with binary population labels
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// Row-per-record covariates
    pub x: DMatrix<f64>,
    /// 1.0 for target records, 0.0 for pool records
    pub y: DVector<f64>,
    /// Column names (`feature` or `feature=level`)
    pub columns: Vec<String>,
    /// Row index in the source data for each design row
    pub rows: Vec<usize>,
    /// Whether column 0 is an intercept
    pub has_intercept: bool,
}

impl DesignMatrix {
    /// Build a design matrix over the pool and target records of `data`
    ///
    /// # Errors
    /// Returns `MatchingError::Fit` if no features are selected and
    /// `MatchingError::Schema` if a feature is not declared.
    pub fn build(
        data: &MatchingData,
        features: &[String],
        pool: &str,
        target: &str,
        fit_intercept: bool,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(MatchingError::Fit("No features selected for the model".to_string()));
        }

        let rows: Vec<usize> = data
            .labels()
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == pool || *l == target)
            .map(|(i, _)| i)
            .collect();
        let y = DVector::from_iterator(
            rows.len(),
            rows.iter()
                .map(|&i| if data.labels()[i] == target { 1.0 } else { 0.0 }),
        );

        let mut columns: Vec<String> = Vec::new();
        let mut values: Vec<Vec<f64>> = Vec::new();

        if fit_intercept {
            columns.push(INTERCEPT.to_string());
            values.push(vec![1.0; rows.len()]);
        }

        for feature in features {
            let kind = data.schema().kind_of(feature).ok_or_else(|| {
                MatchingError::Schema(format!("Feature {feature} is not declared"))
            })?;
            match kind {
                FeatureKind::Numeric => {
                    let column = data.numeric_column(feature)?;
                    let selected: Vec<Option<f64>> = rows.iter().map(|&i| column[i]).collect();
                    let present: Vec<f64> = selected.iter().flatten().copied().collect();
                    let mean = if present.is_empty() { 0.0 } else { calculate_mean(&present) };
                    let std = calculate_std_dev(&present, mean);
                    let scaled = selected
                        .iter()
                        .map(|v| match v {
                            Some(v) if std > f64::EPSILON => (v - mean) / std,
                            _ => 0.0,
                        })
                        .collect();
                    columns.push(feature.clone());
                    values.push(scaled);
                }
                FeatureKind::Categoric => {
                    let column = data.categoric_values(feature)?;
                    let selected: Vec<&String> = rows.iter().map(|&i| &column[i]).collect();
                    let levels = selected.iter().unique().sorted().skip(1).collect_vec();
                    for level in levels {
                        columns.push(format!("{feature}={level}"));
                        values.push(
                            selected
                                .iter()
                                .map(|v| if v == level { 1.0 } else { 0.0 })
                                .collect(),
                        );
                    }
                }
            }
        }

        let x = DMatrix::from_fn(rows.len(), columns.len(), |r, c| values[c][r]);

        Ok(Self {
            x,
            y,
            columns,
            rows,
            has_intercept: fit_intercept,
        })
    }

    /// Number of target (label 1) rows
    #[must_use]
    pub fn positives(&self) -> usize {
        self.y.iter().filter(|v| **v > 0.5).count()
    }

    /// Number of pool (label 0) rows
    #[must_use]
    pub fn negatives(&self) -> usize {
        self.y.len() - self.positives()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sim::generate_toy_dataset;

    #[test]
    fn test_design_matrix_shape() {
        let data = generate_toy_dataset(40, 10, 1).unwrap();
        let features = vec!["age".to_string(), "gender".to_string(), "country".to_string()];
        let design = DesignMatrix::build(&data, &features, "pool", "target", true).unwrap();

        // intercept + age + gender (2 levels - 1) + country (up to 5 levels - 1)
        assert_eq!(design.x.nrows(), 50);
        assert_eq!(design.columns[0], INTERCEPT);
        assert_eq!(design.columns[1], "age");
        assert_eq!(design.columns[2], "gender=M");
        assert!(design.x.ncols() <= 7);
        assert_eq!(design.positives(), 10);
        assert_eq!(design.negatives(), 40);
    }

    #[test]
    fn test_numeric_columns_are_standardised() {
        let data = generate_toy_dataset(40, 10, 2).unwrap();
        let design =
            DesignMatrix::build(&data, &["height".to_string()], "pool", "target", false).unwrap();
        let column: Vec<f64> = design.x.column(0).iter().copied().collect();
        assert!(calculate_mean(&column).abs() < 1e-9);
        assert!((calculate_std_dev(&column, 0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_feature_list_fails() {
        let data = generate_toy_dataset(10, 5, 2).unwrap();
        assert!(matches!(
            DesignMatrix::build(&data, &[], "pool", "target", true),
            Err(MatchingError::Fit(_))
        ));
    }
}
