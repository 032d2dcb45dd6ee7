//! Propensity models: P(record belongs to the target population | covariates)
//!
//! Models are fit on a [`DesignMatrix`] built from a `MatchingData` and
//! score the same design. Any binary classifier implementing
//! [`PropensityModel`] can be plugged in; the family is picked per
//! search iteration through [`Hyperparameters::model`].

pub mod design;
pub mod hyperparameters;
pub mod logistic;
pub mod naive_bayes;

use crate::data::MatchingData;
use crate::error::{MatchingError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use design::DesignMatrix;
pub use hyperparameters::Hyperparameters;
pub use logistic::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;

/// Minimum records per population for a fit
pub const MIN_RECORDS_PER_CLASS: usize = 2;

/// Binary probabilistic classifier
pub trait PropensityModel {
    /// Fit the model parameters
    fn fit(&mut self, design: &DesignMatrix) -> Result<()>;

    /// Estimated probability of target membership for every design row
    fn predict_proba(&self, design: &DesignMatrix) -> Result<Vec<f64>>;
}

/// Classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// L2-regularised logistic regression
    #[default]
    Logistic,
    /// Gaussian naive Bayes
    NaiveBayes,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logistic => write!(f, "logistic"),
            Self::NaiveBayes => write!(f, "naive_bayes"),
        }
    }
}

/// Propensity scores of the pool and target records of a dataset
#[derive(Debug, Clone)]
pub struct PropensityScores {
    /// Row indices (into the scored data) of target records
    pub target_rows: Vec<usize>,
    /// Scores of target records, aligned with `target_rows`
    pub target_scores: Vec<f64>,
    /// Row indices of pool records
    pub pool_rows: Vec<usize>,
    /// Scores of pool records, aligned with `pool_rows`
    pub pool_scores: Vec<f64>,
}

/// Fit a model on `data` and score every pool and target record
///
/// # Errors
/// Returns `MatchingError::Fit` if either population has fewer than
/// [`MIN_RECORDS_PER_CLASS`] records, the design is rank deficient, or
/// the model fails to converge to finite scores.
pub fn fit_and_score(
    data: &MatchingData,
    hyperparameters: &Hyperparameters,
    pool: &str,
    target: &str,
) -> Result<PropensityScores> {
    let design = DesignMatrix::build(
        data,
        &hyperparameters.features,
        pool,
        target,
        hyperparameters.fit_intercept,
    )?;

    let (positives, negatives) = (design.positives(), design.negatives());
    if positives < MIN_RECORDS_PER_CLASS || negatives < MIN_RECORDS_PER_CLASS {
        return Err(MatchingError::Fit(format!(
            "Need at least {MIN_RECORDS_PER_CLASS} records per population, have {positives} {target} and {negatives} {pool}"
        )));
    }

    let mut model = hyperparameters.build_model();
    model.fit(&design)?;
    let scores = model.predict_proba(&design)?;
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(MatchingError::Fit("Model produced non-finite scores".to_string()));
    }

    debug!(
        "Fitted {} model on {} columns ({} {target}, {} {pool})",
        hyperparameters.model,
        design.columns.len(),
        positives,
        negatives
    );

    let mut result = PropensityScores {
        target_rows: Vec::with_capacity(positives),
        target_scores: Vec::with_capacity(positives),
        pool_rows: Vec::with_capacity(negatives),
        pool_scores: Vec::with_capacity(negatives),
    };
    for ((&row, &label), score) in design.rows.iter().zip(design.y.iter()).zip(scores) {
        if label > 0.5 {
            result.target_rows.push(row);
            result.target_scores.push(score);
        } else {
            result.pool_rows.push(row);
            result.pool_scores.push(score);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sim::generate_toy_dataset;
    use crate::data::{POOL, TARGET};

    #[test]
    fn test_fit_and_score_toy_data() {
        let data = generate_toy_dataset(200, 50, 7).unwrap();
        let hp = Hyperparameters::defaults(data.schema(), None);
        let scores = fit_and_score(&data, &hp, POOL, TARGET).unwrap();

        assert_eq!(scores.target_rows.len(), 50);
        assert_eq!(scores.pool_rows.len(), 200);
        assert!(scores.pool_scores.iter().all(|s| (0.0..=1.0).contains(s)));

        // target records look like the target population on average
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean(&scores.target_scores) > mean(&scores.pool_scores));
    }

    #[test]
    fn test_naive_bayes_family() {
        let data = generate_toy_dataset(100, 30, 3).unwrap();
        let hp = Hyperparameters {
            model: ModelFamily::NaiveBayes,
            ..Hyperparameters::defaults(data.schema(), None)
        };
        let scores = fit_and_score(&data, &hp, POOL, TARGET).unwrap();
        assert_eq!(scores.target_scores.len(), 30);
    }

    #[test]
    fn test_too_few_records_fails() {
        let data = generate_toy_dataset(20, 1, 3).unwrap();
        let hp = Hyperparameters::defaults(data.schema(), None);
        assert!(matches!(
            fit_and_score(&data, &hp, POOL, TARGET),
            Err(MatchingError::Fit(_))
        ));
    }
}
