//! Type definitions for the matching search
//!
//! This module contains the state machine, per-iteration records and the
//! final result of a `PropensityScoreMatcher` run.

use crate::algorithm::propensity::Hyperparameters;
use crate::data::MatchingData;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Constructed, not started
    Ready,
    /// Iterating
    Running,
    /// Stopped on tolerance or patience
    Converged,
    /// Stopped on max_iter or time_limit
    BudgetExhausted,
    /// No iteration succeeded or a fatal error occurred
    Error,
    /// Result handed to the caller
    Done,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Converged => "converged",
            Self::BudgetExhausted => "budget exhausted",
            Self::Error => "error",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Why the search loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Loss reached the tolerance
    Tolerance,
    /// Too many consecutive iterations without improvement
    Patience,
    /// Iteration cap reached
    MaxIterations,
    /// Wall-clock budget spent
    TimeLimit,
}

impl StopReason {
    /// Terminal state this reason leads to
    #[must_use]
    pub const fn state(self) -> SearchState {
        match self {
            Self::Tolerance | Self::Patience => SearchState::Converged,
            Self::MaxIterations | Self::TimeLimit => SearchState::BudgetExhausted,
        }
    }
}

/// Outcome of one evaluated proposal
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Zero-based iteration number
    pub iteration: usize,
    /// Proposal evaluated
    pub hyperparameters: Hyperparameters,
    /// Balance loss of the match, if the iteration succeeded
    pub loss: Option<f64>,
    /// Failure message, if the iteration failed
    pub error: Option<String>,
    /// Whether this iteration replaced the incumbent
    pub improved: bool,
    /// Matched target records
    pub matched_targets: usize,
    /// Matched pool records
    pub matched_pool: usize,
    /// Time spent on this iteration
    pub elapsed: Duration,
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Matched target and pool records, labels unchanged
    pub matched: MatchingData,
    /// Hyperparameters of the best match
    pub hyperparameters: Hyperparameters,
    /// Balance loss of the best match
    pub loss: f64,
    /// Iteration that produced the best match
    pub best_iteration: usize,
    /// Why the loop stopped
    pub stop_reason: StopReason,
    /// Iterations attempted
    pub iterations: usize,
    /// Iterations that failed and were skipped
    pub failed_iterations: usize,
    /// Target records left unmatched in the best match
    pub unmatched_targets: usize,
    /// Every evaluated proposal, in order
    pub history: Vec<IterationRecord>,
    /// Total search time
    pub elapsed: Duration,
}

impl MatchingResult {
    /// Number of matched target records
    #[must_use]
    pub fn matched_targets(&self) -> usize {
        self.best_record().map_or(0, |r| r.matched_targets)
    }

    /// Number of matched pool records
    #[must_use]
    pub fn matched_pool(&self) -> usize {
        self.best_record().map_or(0, |r| r.matched_pool)
    }

    fn best_record(&self) -> Option<&IterationRecord> {
        self.history.get(self.best_iteration)
    }
}

impl fmt::Display for MatchingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matching Result:")?;
        writeln!(f, "  Loss: {:.4} (iteration {})", self.loss, self.best_iteration)?;
        writeln!(f, "  Hyperparameters: {}", self.hyperparameters)?;
        writeln!(
            f,
            "  Matched: {} target / {} pool ({} target unmatched)",
            self.matched_targets(),
            self.matched_pool(),
            self.unmatched_targets
        )?;
        writeln!(
            f,
            "  Iterations: {} ({} failed), stopped on {:?} after {:.2?}",
            self.iterations, self.failed_iterations, self.stop_reason, self.elapsed
        )?;
        Ok(())
    }
}
