//! Propensity score matching of a pool population to a target population
//!
//! This module implements:
//!
//! 1. Greedy and optimal assignment of pool records to target records
//! 2. The seeded hyperparameter proposal policy
//! 3. The `PropensityScoreMatcher` search loop with optional parallel batches
//!
//! The matcher supports 1:k matching ratios and an optional caliper on the
//! propensity score distance of matched pairs.

pub mod assignment;
pub mod evaluation;
pub mod greedy;
pub mod matcher;
pub mod optimal;
pub mod parallel;
pub mod search;
pub mod types;

// Re-export key types
pub use assignment::{
    ASSIGNMENT_METHODS, Assignment, AssignmentMethod, AssignmentStrategy, Constraints, MatchedPair,
};
pub use greedy::GreedyAssignment;
pub use matcher::PropensityScoreMatcher;
pub use optimal::OptimalAssignment;
pub use search::{HyperparameterGrid, HyperparameterProposer};
pub use types::{IterationRecord, MatchingResult, SearchState, StopReason};
