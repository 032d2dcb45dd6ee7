//! Core search loop
//!
//! This module implements the `PropensityScoreMatcher`, which repeatedly
//! proposes hyperparameters, fits a propensity model, assigns matches and
//! keeps the best-balanced match found within the iteration and time
//! budget.

use super::assignment::AssignmentMethod;
use super::evaluation::{Candidate, EvaluationContext};
use super::parallel::evaluate_batch;
use super::search::{HyperparameterGrid, HyperparameterProposer};
use super::types::{IterationRecord, MatchingResult, SearchState, StopReason};
use crate::algorithm::balance::{BalanceCalculator, Objective};
use crate::algorithm::propensity::Hyperparameters;
use crate::config::MatcherConfig;
use crate::data::MatchingData;
use crate::error::{MatchingError, Result};
use crate::utils::logging::{create_search_progress_bar, finish_progress_bar, log_search_outcome};
use log::{debug, info, warn};
use std::time::Instant;

/// Best match so far
struct Incumbent {
    candidate: Candidate,
    hyperparameters: Hyperparameters,
    iteration: usize,
}

/// Propensity score matcher with a bounded hyperparameter search
#[derive(Debug)]
pub struct PropensityScoreMatcher {
    data: MatchingData,
    config: MatcherConfig,
    objective: Objective,
    method: AssignmentMethod,
    calculator: BalanceCalculator,
    state: SearchState,
}

impl PropensityScoreMatcher {
    /// Create a matcher over a private copy of `data`
    ///
    /// # Errors
    /// Returns a configuration error for invalid settings,
    /// `MatchingError::Partition` unless `data` holds exactly the configured
    /// pool and target populations, and `MatchingError::Schema` if no
    /// features are declared.
    pub fn new(data: &MatchingData, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        let objective = config.objective()?;
        let method = config.method()?;

        let data = data.copy()?;
        data.split_by_population(&config.pool_population, &config.target_population)?;
        if data.schema().is_empty() {
            return Err(MatchingError::Schema("No features declared".to_string()));
        }
        if let Some(grid) = &config.hyperparameter_grid {
            grid.validate(data.schema())?;
        }

        let calculator = BalanceCalculator::with_populations(
            objective,
            &data,
            &config.pool_population,
            &config.target_population,
        )?;

        Ok(Self {
            data,
            config,
            objective,
            method,
            calculator,
            state: SearchState::Ready,
        })
    }

    /// Create a matcher from the individual search settings
    pub fn with_settings(
        data: &MatchingData,
        objective: &str,
        hyperparameter_grid: Option<HyperparameterGrid>,
        max_iter: usize,
        time_limit: f64,
        method: &str,
    ) -> Result<Self> {
        let mut config = MatcherConfig::builder()
            .objective(objective)
            .method(method)
            .max_iter(max_iter)
            .time_limit(time_limit)
            .build();
        config.hyperparameter_grid = hyperparameter_grid;
        Self::new(data, config)
    }

    /// Current state of the search
    #[must_use]
    pub const fn state(&self) -> SearchState {
        self.state
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Calculator scoring candidate matches
    #[must_use]
    pub const fn calculator(&self) -> &BalanceCalculator {
        &self.calculator
    }

    /// Run the search and return the best matched records
    ///
    /// The result holds only matched target and pool records with their
    /// population labels unchanged.
    pub fn perform_matching(&mut self) -> Result<MatchingData> {
        self.run().map(|result| result.matched)
    }

    fn transition(&mut self, next: SearchState) {
        debug!("Search state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the search and return the best match with its search record
    ///
    /// # Errors
    /// Returns `MatchingError::SearchExhausted` if no iteration succeeded,
    /// or the first non-recoverable error raised by an iteration.
    pub fn run(&mut self) -> Result<MatchingResult> {
        let start = Instant::now();
        let budget = self.config.time_budget();
        let max_iter = self.config.max_iter;
        self.transition(SearchState::Running);

        info!(
            "Matching {} {} records against {} {} records: objective {}, method {}, max_iter {}, time limit {:.1}s",
            self.data.indices_of(&self.config.target_population).len(),
            self.config.target_population,
            self.data.indices_of(&self.config.pool_population).len(),
            self.config.pool_population,
            self.objective,
            self.method,
            max_iter,
            self.config.time_limit
        );

        let mut proposer = HyperparameterProposer::new(
            self.data.schema(),
            self.config.hyperparameter_grid.clone(),
            self.config.caliper,
            self.config.seed,
        );
        let context = EvaluationContext {
            data: &self.data,
            calculator: &self.calculator,
            method: self.method,
            ratio: self.config.matching_ratio,
            pool: &self.config.pool_population,
            target: &self.config.target_population,
        };
        let pb = create_search_progress_bar(max_iter as u64, self.config.show_progress);

        let mut incumbent: Option<Incumbent> = None;
        let mut history: Vec<IterationRecord> = Vec::with_capacity(max_iter);
        let mut failed = 0;
        let mut stale = 0;
        let mut last_error: Option<MatchingError> = None;

        let stop_reason = loop {
            if history.len() >= max_iter {
                break StopReason::MaxIterations;
            }
            // the first batch always runs
            if !history.is_empty() && start.elapsed() >= budget {
                break StopReason::TimeLimit;
            }

            let batch_size = self.config.parallel_batch.min(max_iter - history.len());
            let best = incumbent.as_ref().map(|i| i.hyperparameters.clone());
            let proposals: Vec<Hyperparameters> = (0..batch_size)
                .map(|_| proposer.propose(best.as_ref()))
                .collect();
            let results = evaluate_batch(&context, &proposals);

            for (hyperparameters, (result, elapsed)) in proposals.into_iter().zip(results) {
                let iteration = history.len();
                let mut record = IterationRecord {
                    iteration,
                    hyperparameters: hyperparameters.clone(),
                    loss: None,
                    error: None,
                    improved: false,
                    matched_targets: 0,
                    matched_pool: 0,
                    elapsed,
                };

                match result {
                    Ok(candidate) => {
                        let improved = incumbent
                            .as_ref()
                            .is_none_or(|best| candidate.loss < best.candidate.loss);
                        record.loss = Some(candidate.loss);
                        record.improved = improved;
                        record.matched_targets = candidate.matched_targets;
                        record.matched_pool = candidate.matched_pool;

                        if improved {
                            debug!("Iteration {iteration}: new best loss {:.4}", candidate.loss);
                            stale = 0;
                            incumbent = Some(Incumbent {
                                candidate,
                                hyperparameters,
                                iteration,
                            });
                        } else {
                            stale += 1;
                        }
                    }
                    Err(error) if error.is_recoverable() => {
                        warn!("Iteration {iteration} failed, trying next proposal: {error}");
                        record.error = Some(error.to_string());
                        failed += 1;
                        stale += 1;
                        last_error = Some(error);
                    }
                    Err(error) => {
                        pb.abandon();
                        debug!("Search state: {} -> {}", self.state, SearchState::Error);
                        self.state = SearchState::Error;
                        return Err(error);
                    }
                }

                history.push(record);
                pb.inc(1);
            }

            if let Some(best) = &incumbent {
                pb.set_message(format!("best loss {:.4}", best.candidate.loss));
                if best.candidate.loss <= self.config.tolerance {
                    break StopReason::Tolerance;
                }
                if self.config.patience.is_some_and(|p| stale >= p) {
                    break StopReason::Patience;
                }
            }
        };

        let elapsed = start.elapsed();
        log_search_outcome(
            history.len(),
            failed,
            incumbent.as_ref().map(|i| i.candidate.loss),
            elapsed,
        );

        let Some(best) = incumbent else {
            pb.abandon();
            self.transition(SearchState::Error);
            return Err(MatchingError::SearchExhausted {
                iterations: history.len(),
                source: last_error.map(Box::new),
            });
        };

        finish_progress_bar(&pb, Some("Search complete"));
        self.transition(stop_reason.state());

        let matched = best.candidate.materialise(&self.data)?;
        info!(
            "Best match from iteration {} ({}): {} records, loss {:.4}, stopped on {:?}",
            best.iteration,
            best.hyperparameters,
            matched.num_rows(),
            best.candidate.loss,
            stop_reason
        );

        let result = MatchingResult {
            matched,
            hyperparameters: best.hyperparameters,
            loss: best.candidate.loss,
            best_iteration: best.iteration,
            stop_reason,
            iterations: history.len(),
            failed_iterations: failed,
            unmatched_targets: best.candidate.unmatched_targets,
            history,
            elapsed,
        };
        self.transition(SearchState::Done);
        Ok(result)
    }
}
