//! Assignment of pool records to target records by propensity score
//!
//! Both strategies take two score slices and return pairs of positions
//! into those slices. A pool position is used at most once; a target
//! position is used at most `ratio` times. Pairs farther apart than the
//! caliper are never produced, so targets without an eligible pool record
//! stay unmatched.

use super::greedy::GreedyAssignment;
use super::optimal::OptimalAssignment;
use crate::error::{MatchingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assignment algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    /// Nearest available pool record, hardest targets first
    #[default]
    Greedy,
    /// Minimum total distance bipartite assignment
    ///
    /// O(n^2 m); prefer `Greedy` for thousands of targets.
    #[serde(alias = "optimal")]
    LinearSumAssignment,
}

/// Keys accepted by [`AssignmentMethod::from_key`]
pub const ASSIGNMENT_METHODS: [&str; 2] = ["greedy", "linear_sum_assignment"];

impl AssignmentMethod {
    /// Method key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::LinearSumAssignment => "linear_sum_assignment",
        }
    }

    /// Look up a method by key ("optimal" is accepted for the exact solver)
    ///
    /// # Errors
    /// Returns `MatchingError::UnknownMethod` for any other key.
    pub fn from_key(key: &str) -> Result<Self> {
        match key {
            "greedy" => Ok(Self::Greedy),
            "linear_sum_assignment" | "optimal" => Ok(Self::LinearSumAssignment),
            other => Err(MatchingError::UnknownMethod(other.to_string())),
        }
    }

    /// Run the selected strategy
    #[must_use]
    pub fn assign(self, target: &[f64], pool: &[f64], constraints: &Constraints) -> Assignment {
        match self {
            Self::Greedy => GreedyAssignment.assign(target, pool, constraints),
            Self::LinearSumAssignment => OptimalAssignment.assign(target, pool, constraints),
        }
    }
}

impl fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Limits applied to every assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraints {
    /// Maximum score distance of a pair; `None` is unconstrained
    pub caliper: Option<f64>,
    /// Maximum pool records per target
    pub ratio: usize,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            caliper: None,
            ratio: 1,
        }
    }
}

impl Constraints {
    /// Whether a pair at `distance` is allowed
    #[must_use]
    pub fn allows(&self, distance: f64) -> bool {
        self.caliper.is_none_or(|c| distance <= c)
    }
}

/// One (target, pool) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    /// Position in the target score slice
    pub target: usize,
    /// Position in the pool score slice
    pub pool: usize,
    /// Absolute score distance
    pub distance: f64,
}

/// Output of an assignment strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// Pairs, ordered by target position
    pub pairs: Vec<MatchedPair>,
    /// Target positions with no pair, ascending
    pub unmatched_targets: Vec<usize>,
}

impl Assignment {
    /// Build from pairs; targets absent from `pairs` are unmatched
    pub(super) fn from_pairs(mut pairs: Vec<MatchedPair>, n_target: usize) -> Self {
        pairs.sort_by_key(|p| (p.target, p.pool));
        let mut matched = vec![false; n_target];
        for pair in &pairs {
            matched[pair.target] = true;
        }
        let unmatched_targets = (0..n_target).filter(|&t| !matched[t]).collect();
        Self {
            pairs,
            unmatched_targets,
        }
    }

    /// Sum of pair distances
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.pairs.iter().map(|p| p.distance).sum()
    }

    /// Number of distinct matched targets
    #[must_use]
    pub fn matched_targets(&self) -> Vec<usize> {
        let mut targets: Vec<usize> = self.pairs.iter().map(|p| p.target).collect();
        targets.dedup();
        targets
    }

    /// Matched pool positions, ascending
    #[must_use]
    pub fn matched_pool(&self) -> Vec<usize> {
        let mut pool: Vec<usize> = self.pairs.iter().map(|p| p.pool).collect();
        pool.sort_unstable();
        pool
    }

    /// Whether no pool position appears in two pairs
    #[must_use]
    pub fn is_injective(&self) -> bool {
        let pool = self.matched_pool();
        pool.windows(2).all(|w| w[0] != w[1])
    }

    /// Error describing caliper-unmatched targets, if any
    #[must_use]
    pub fn infeasibility(&self, constraints: &Constraints) -> Option<MatchingError> {
        match (self.unmatched_targets.len(), constraints.caliper) {
            (0, _) | (_, None) => None,
            (unmatched, Some(caliper)) => {
                Some(MatchingError::InfeasibleAssignment { unmatched, caliper })
            }
        }
    }
}

/// An algorithm pairing target scores with pool scores
pub trait AssignmentStrategy {
    /// Pair target and pool positions under `constraints`
    fn assign(&self, target: &[f64], pool: &[f64], constraints: &Constraints) -> Assignment;
}
