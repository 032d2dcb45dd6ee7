//! Error handling for the matching engine.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;

/// Specialized error type for matching operations
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// Malformed `MatchingData` construction
    #[error("Schema error: {0}")]
    Schema(String),

    /// Two `MatchingData` values with different schemas were combined
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Population split was ambiguous or referenced a missing population
    #[error("Partition error: {0}")]
    Partition(String),

    /// The propensity model could not be fit for a hyperparameter proposal
    #[error("Fit error: {0}")]
    Fit(String),

    /// A caliper left at least one target record without an eligible pool record
    #[error("Infeasible assignment: {unmatched} target record(s) have no pool record within caliper {caliper}")]
    InfeasibleAssignment {
        /// Number of target records left unmatched
        unmatched: usize,
        /// Caliper in effect
        caliper: f64,
    },

    /// Every iteration of the hyperparameter search failed
    #[error("Search exhausted after {iterations} iteration(s) without a successful fit")]
    SearchExhausted {
        /// Number of iterations attempted
        iterations: usize,
        /// The most recent per-iteration failure, if any iteration ran
        #[source]
        source: Option<Box<MatchingError>>,
    },

    /// Objective key not present in the selectable registry
    #[error("Unknown objective '{0}'")]
    UnknownObjective(String),

    /// Assignment method key not recognised
    #[error("Unknown assignment method '{0}'")]
    UnknownMethod(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading or writing JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MatchingError {
    /// Whether the search loop recovers from this error locally
    ///
    /// Fit failures and infeasible assignments are counted and skipped;
    /// everything else aborts the search.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fit(_) | Self::InfeasibleAssignment { .. })
    }
}

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
