//! L2-regularised logistic regression fit by Newton-Raphson (IRLS)

use super::PropensityModel;
use super::design::DesignMatrix;
use crate::error::{MatchingError, Result};
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Newton iterations before giving up on convergence
const MAX_NEWTON_ITER: usize = 100;

/// Convergence threshold on the max-norm of the Newton step
const STEP_TOLERANCE: f64 = 1e-8;

/// Relative singular value threshold for the rank check
const RANK_TOLERANCE: f64 = 1e-10;

/// Regularised logistic regression
///
/// Minimises the (optionally class-weighted) negative log-likelihood plus
/// `||beta||^2 / (2C)`; the intercept is not penalised.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    c: f64,
    class_weight_balanced: bool,
    coefficients: Option<DVector<f64>>,
}

impl LogisticRegression {
    /// Create an unfitted model with inverse regularisation strength `c`
    #[must_use]
    pub const fn new(c: f64, class_weight_balanced: bool) -> Self {
        Self {
            c,
            class_weight_balanced,
            coefficients: None,
        }
    }

    /// Fitted coefficients, if any
    #[must_use]
    pub const fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }
}

/// Per-row weights: 1 or inverse class frequency scaled to n / 2
pub(super) fn sample_weights(y: &DVector<f64>, balanced: bool) -> DVector<f64> {
    if !balanced {
        return DVector::from_element(y.len(), 1.0);
    }
    let n = y.len() as f64;
    let positives = y.iter().filter(|v| **v > 0.5).count() as f64;
    let negatives = n - positives;
    y.map(|v| {
        if v > 0.5 {
            n / (2.0 * positives)
        } else {
            n / (2.0 * negatives)
        }
    })
}

/// Numerically stable logistic function
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fail if the columns of `x` are linearly dependent
pub(super) fn check_rank(x: &DMatrix<f64>) -> Result<()> {
    let gram = x.transpose() * x;
    let max_diag = gram.diagonal().iter().copied().fold(0.0, f64::max);
    if max_diag <= 0.0 {
        return Err(MatchingError::Fit("Design matrix is all zeros".to_string()));
    }
    let rank = gram.rank(max_diag * RANK_TOLERANCE);
    if rank < x.ncols() {
        return Err(MatchingError::Fit(format!(
            "Design matrix is rank deficient (rank {rank} < {} columns)",
            x.ncols()
        )));
    }
    Ok(())
}

impl PropensityModel for LogisticRegression {
    fn fit(&mut self, design: &DesignMatrix) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(MatchingError::Fit(format!(
                "Regularisation parameter C must be positive, got {}",
                self.c
            )));
        }
        check_rank(&design.x)?;

        let x = &design.x;
        let y = &design.y;
        let (n, p) = x.shape();
        let weights = sample_weights(y, self.class_weight_balanced);
        let lambda = 1.0 / self.c;

        let mut penalty = DVector::from_element(p, lambda);
        if design.has_intercept {
            penalty[0] = 0.0;
        }

        let xt = x.transpose();
        let mut beta = DVector::zeros(p);

        for iteration in 0..MAX_NEWTON_ITER {
            let eta = x * &beta;
            let mu = eta.map(sigmoid);

            let residual = DVector::from_fn(n, |i, _| weights[i] * (mu[i] - y[i]));
            let gradient = &xt * residual + penalty.component_mul(&beta);

            let mut weighted_x = x.clone();
            for i in 0..n {
                let w = weights[i] * mu[i] * (1.0 - mu[i]);
                weighted_x.row_mut(i).scale_mut(w);
            }
            let mut hessian = &xt * weighted_x;
            for j in 0..p {
                hessian[(j, j)] += penalty[j];
            }

            let step = hessian
                .cholesky()
                .ok_or_else(|| {
                    MatchingError::Fit("Hessian is not positive definite".to_string())
                })?
                .solve(&gradient);

            beta -= &step;

            if beta.iter().any(|b| !b.is_finite()) {
                return Err(MatchingError::Fit("Newton iteration diverged".to_string()));
            }
            if step.amax() < STEP_TOLERANCE {
                debug!("Logistic regression converged after {} iterations", iteration + 1);
                break;
            }
        }

        self.coefficients = Some(beta);
        Ok(())
    }

    fn predict_proba(&self, design: &DesignMatrix) -> Result<Vec<f64>> {
        let beta = self
            .coefficients
            .as_ref()
            .ok_or_else(|| MatchingError::Fit("Model has not been fit".to_string()))?;
        if beta.len() != design.x.ncols() {
            return Err(MatchingError::Fit(format!(
                "Model has {} coefficients but design has {} columns",
                beta.len(),
                design.x.ncols()
            )));
        }
        Ok((&design.x * beta).iter().map(|z| sigmoid(*z)).collect())
    }
}
