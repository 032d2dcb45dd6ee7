//! Gaussian naive Bayes classifier

use super::PropensityModel;
use super::design::DesignMatrix;
use super::logistic::{check_rank, sample_weights, sigmoid};
use crate::error::{MatchingError, Result};
use std::f64::consts::PI;

/// Fraction of the largest feature variance added to every variance
const VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone)]
struct ClassParameters {
    log_prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Gaussian naive Bayes over the design columns
///
/// The intercept column carries no information and is skipped. With
/// balanced class weights both priors are 0.5.
#[derive(Debug, Clone, Default)]
pub struct GaussianNaiveBayes {
    class_weight_balanced: bool,
    classes: Option<[ClassParameters; 2]>,
}

impl GaussianNaiveBayes {
    #[must_use]
    pub const fn new(class_weight_balanced: bool) -> Self {
        Self {
            class_weight_balanced,
            classes: None,
        }
    }

    fn class_parameters(
        design: &DesignMatrix,
        label: f64,
        columns: &[usize],
        prior: f64,
        smoothing: f64,
    ) -> ClassParameters {
        let rows: Vec<usize> = (0..design.y.len())
            .filter(|&i| (design.y[i] - label).abs() < 0.5)
            .collect();
        let n = rows.len() as f64;
        let mut means = Vec::with_capacity(columns.len());
        let mut variances = Vec::with_capacity(columns.len());
        for &c in columns {
            let mean = rows.iter().map(|&r| design.x[(r, c)]).sum::<f64>() / n;
            let var = rows
                .iter()
                .map(|&r| (design.x[(r, c)] - mean).powi(2))
                .sum::<f64>()
                / n;
            means.push(mean);
            variances.push(var + smoothing);
        }
        ClassParameters {
            log_prior: prior.ln(),
            means,
            variances,
        }
    }

    fn feature_columns(design: &DesignMatrix) -> Vec<usize> {
        let start = usize::from(design.has_intercept);
        (start..design.x.ncols()).collect()
    }
}

fn log_likelihood(params: &ClassParameters, row: &[f64]) -> f64 {
    params.log_prior
        + row
            .iter()
            .zip(params.means.iter().zip(&params.variances))
            .map(|(x, (mean, var))| -0.5 * ((2.0 * PI * var).ln() + (x - mean).powi(2) / var))
            .sum::<f64>()
}

impl PropensityModel for GaussianNaiveBayes {
    fn fit(&mut self, design: &DesignMatrix) -> Result<()> {
        let columns = Self::feature_columns(design);
        if columns.is_empty() {
            return Err(MatchingError::Fit("Naive Bayes needs at least one feature".to_string()));
        }
        check_rank(&design.x)?;

        let max_var = columns
            .iter()
            .map(|&c| {
                let col = design.x.column(c);
                let mean = col.mean();
                col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64
            })
            .fold(0.0, f64::max);
        let smoothing = VAR_SMOOTHING * max_var.max(f64::EPSILON);

        let n = design.y.len() as f64;
        let positives = design.positives() as f64;
        let (prior_neg, prior_pos) = if self.class_weight_balanced {
            let w = sample_weights(&design.y, true);
            let total: f64 = w.sum();
            let pos: f64 = w
                .iter()
                .zip(design.y.iter())
                .filter(|(_, y)| **y > 0.5)
                .map(|(w, _)| w)
                .sum();
            (1.0 - pos / total, pos / total)
        } else {
            ((n - positives) / n, positives / n)
        };

        self.classes = Some([
            Self::class_parameters(design, 0.0, &columns, prior_neg, smoothing),
            Self::class_parameters(design, 1.0, &columns, prior_pos, smoothing),
        ]);
        Ok(())
    }

    fn predict_proba(&self, design: &DesignMatrix) -> Result<Vec<f64>> {
        let [negative, positive] = self
            .classes
            .as_ref()
            .ok_or_else(|| MatchingError::Fit("Model has not been fit".to_string()))?;
        let columns = Self::feature_columns(design);
        if columns.len() != positive.means.len() {
            return Err(MatchingError::Fit(format!(
                "Model has {} features but design has {}",
                positive.means.len(),
                columns.len()
            )));
        }

        Ok((0..design.x.nrows())
            .map(|r| {
                let row: Vec<f64> = columns.iter().map(|&c| design.x[(r, c)]).collect();
                sigmoid(log_likelihood(positive, &row) - log_likelihood(negative, &row))
            })
            .collect())
    }
}
