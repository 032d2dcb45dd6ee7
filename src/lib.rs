//! Propensity score matching of a pool population to a target population,
//! with covariate balance assessment and a bounded hyperparameter search.

pub mod algorithm;
pub mod config;
pub mod data;
pub mod error;
pub mod session;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{MatcherConfig, MatcherConfigBuilder};
pub use error::{MatchingError, Result};
pub use session::{FeatureLoss, LossComparison, MatchingSession, POSTMATCH_SUFFIX};

// Data
pub use data::sim::generate_toy_dataset;
pub use data::{FeatureKind, FeatureSchema, MatchingData};

// Balance
pub use algorithm::balance::{
    BALANCE_CALCULATORS, BalanceCalculator, BalanceReport, BalanceScore, Objective, objectives,
};

// Matching
pub use algorithm::matching::{
    AssignmentMethod, HyperparameterGrid, MatchingResult, PropensityScoreMatcher, SearchState,
};
pub use algorithm::propensity::{Hyperparameters, ModelFamily, PropensityModel};

// Arrow types
pub use arrow::record_batch::RecordBatch;
