//! Batch evaluation of proposals
//!
//! Proposals of one batch are independent, so with more than one proposal
//! they are evaluated on the rayon thread pool. Results come back in
//! proposal order, which keeps incumbent updates deterministic.

use super::evaluation::{Candidate, EvaluationContext, evaluate};
use crate::algorithm::propensity::Hyperparameters;
use crate::error::Result;
use log::debug;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Evaluate every proposal, returning results in input order
pub fn evaluate_batch(
    context: &EvaluationContext<'_>,
    proposals: &[Hyperparameters],
) -> Vec<(Result<Candidate>, Duration)> {
    let timed = |hp: &Hyperparameters| {
        let start = Instant::now();
        let result = evaluate(context, hp);
        (result, start.elapsed())
    };

    if proposals.len() > 1 {
        debug!(
            "Evaluating {} proposals on {} threads",
            proposals.len(),
            rayon::current_num_threads()
        );
        proposals.par_iter().map(timed).collect()
    } else {
        proposals.iter().map(timed).collect()
    }
}
