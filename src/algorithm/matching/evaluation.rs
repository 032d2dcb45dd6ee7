//! Evaluation of a single hyperparameter proposal
//!
//! fit -> score -> assign -> balance loss on the matched subset.

use super::assignment::{AssignmentMethod, Constraints};
use crate::algorithm::balance::{BalanceCalculator, BalanceScore};
use crate::algorithm::propensity::{Hyperparameters, fit_and_score};
use crate::data::MatchingData;
use crate::error::{MatchingError, Result};
use log::{debug, warn};

/// Read-only inputs shared by every evaluation of a run
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    /// Private copy of the input data
    pub data: &'a MatchingData,
    /// Calculator with scales from the pre-match data
    pub calculator: &'a BalanceCalculator,
    /// Assignment algorithm
    pub method: AssignmentMethod,
    /// Maximum pool records per target
    pub ratio: usize,
    /// Pool population label
    pub pool: &'a str,
    /// Target population label
    pub target: &'a str,
}

/// A scored match for one proposal
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Row indices of the matched records in the source data, ascending
    pub rows: Vec<usize>,
    /// Balance loss of the matched subset
    pub loss: f64,
    /// Matched target records
    pub matched_targets: usize,
    /// Matched pool records
    pub matched_pool: usize,
    /// Target records left without a pair
    pub unmatched_targets: usize,
}

impl Candidate {
    /// Materialise the matched records
    pub fn materialise(&self, data: &MatchingData) -> Result<MatchingData> {
        data.take(&self.rows)
    }
}

/// Evaluate one proposal
///
/// # Errors
/// Returns `MatchingError::Fit` when the model cannot be fit and
/// `MatchingError::InfeasibleAssignment` when the caliper leaves no pair
/// at all. Unmatched targets in an otherwise successful assignment are
/// logged and tolerated.
pub fn evaluate(context: &EvaluationContext<'_>, hyperparameters: &Hyperparameters) -> Result<Candidate> {
    let scores = fit_and_score(context.data, hyperparameters, context.pool, context.target)?;

    let constraints = Constraints {
        caliper: hyperparameters.caliper,
        ratio: context.ratio,
    };
    let assignment = context
        .method
        .assign(&scores.target_scores, &scores.pool_scores, &constraints);

    if assignment.pairs.is_empty() {
        return Err(MatchingError::InfeasibleAssignment {
            unmatched: scores.target_rows.len(),
            caliper: hyperparameters.caliper.unwrap_or(f64::INFINITY),
        });
    }
    if let Some(infeasible) = assignment.infeasibility(&constraints) {
        warn!("{infeasible}; keeping the partial match");
    }

    let matched_targets = assignment.matched_targets();
    let matched_pool = assignment.matched_pool();

    let mut rows: Vec<usize> = matched_targets
        .iter()
        .map(|&t| scores.target_rows[t])
        .chain(matched_pool.iter().map(|&p| scores.pool_rows[p]))
        .collect();
    rows.sort_unstable();

    let matched = context.data.take(&rows)?;
    let loss = context.calculator.total_loss(&matched)?;

    debug!(
        "Evaluated {hyperparameters}: loss {loss:.4}, {} pairs, cost {:.4}",
        assignment.pairs.len(),
        assignment.total_cost()
    );

    Ok(Candidate {
        rows,
        loss,
        matched_targets: matched_targets.len(),
        matched_pool: matched_pool.len(),
        unmatched_targets: assignment.unmatched_targets.len(),
    })
}
