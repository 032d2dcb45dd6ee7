//! Configuration for `PropensityScoreMatcher`.

use crate::algorithm::balance::Objective;
use crate::algorithm::matching::AssignmentMethod;
use crate::algorithm::matching::search::HyperparameterGrid;
use crate::data::{POOL, TARGET};
use crate::error::{MatchingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Configuration of a matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Balance objective key (see `objectives()`)
    pub objective: String,
    /// Assignment method key: "greedy" or "linear_sum_assignment"
    pub method: String,
    /// Maximum number of search iterations
    pub max_iter: usize,
    /// Wall-clock budget in seconds, checked between iterations
    pub time_limit: f64,
    /// Seed of the proposal generator
    pub seed: u64,
    /// Maximum score distance of a matched pair
    pub caliper: Option<f64>,
    /// Maximum pool records matched to each target record
    pub matching_ratio: usize,
    /// Candidate hyperparameter values; default search space when absent
    pub hyperparameter_grid: Option<HyperparameterGrid>,
    /// Stop after this many consecutive non-improving iterations
    pub patience: Option<usize>,
    /// Stop once the loss is at or below this value
    pub tolerance: f64,
    /// Proposals evaluated concurrently per batch
    pub parallel_batch: usize,
    /// Draw a progress bar during the search
    pub show_progress: bool,
    /// Label of the pool population
    pub pool_population: String,
    /// Label of the target population
    pub target_population: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            objective: "smd".to_string(),
            method: "greedy".to_string(),
            max_iter: 20,
            time_limit: 60.0,
            seed: 45,
            caliper: None,
            matching_ratio: 1,
            hyperparameter_grid: None,
            patience: None,
            tolerance: 0.0,
            parallel_batch: 1,
            show_progress: true,
            pool_population: POOL.to_string(),
            target_population: TARGET.to_string(),
        }
    }
}

impl MatcherConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing a configuration
    #[must_use]
    pub fn builder() -> MatcherConfigBuilder {
        MatcherConfigBuilder::new()
    }

    /// Read a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved balance objective
    pub fn objective(&self) -> Result<Objective> {
        Objective::from_key(&self.objective)
    }

    /// Resolved assignment method
    pub fn method(&self) -> Result<AssignmentMethod> {
        AssignmentMethod::from_key(&self.method)
    }

    /// Wall-clock budget
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit).unwrap_or(Duration::MAX)
    }

    /// Check value ranges and keys
    ///
    /// # Errors
    /// Returns `MatchingError::InvalidConfig` for out-of-range values,
    /// `MatchingError::UnknownObjective` or `MatchingError::UnknownMethod`
    /// for unknown keys.
    pub fn validate(&self) -> Result<()> {
        self.objective()?;
        self.method()?;

        if self.max_iter == 0 {
            return Err(MatchingError::InvalidConfig("max_iter must be at least 1".to_string()));
        }
        if !(self.time_limit > 0.0 && Duration::try_from_secs_f64(self.time_limit).is_ok()) {
            return Err(MatchingError::InvalidConfig(format!(
                "time_limit must be a positive number of seconds, got {}",
                self.time_limit
            )));
        }
        if let Some(caliper) = self.caliper {
            if !(caliper > 0.0 && caliper.is_finite()) {
                return Err(MatchingError::InvalidConfig(format!(
                    "caliper must be positive, got {caliper}"
                )));
            }
        }
        if self.matching_ratio == 0 {
            return Err(MatchingError::InvalidConfig(
                "matching_ratio must be at least 1".to_string(),
            ));
        }
        if self.parallel_batch == 0 {
            return Err(MatchingError::InvalidConfig(
                "parallel_batch must be at least 1".to_string(),
            ));
        }
        if self.patience == Some(0) {
            return Err(MatchingError::InvalidConfig("patience must be at least 1".to_string()));
        }
        if self.tolerance.is_nan() {
            return Err(MatchingError::InvalidConfig("tolerance must be a number".to_string()));
        }
        if self.pool_population == self.target_population {
            return Err(MatchingError::InvalidConfig(format!(
                "pool and target populations must differ, both are {}",
                self.pool_population
            )));
        }
        Ok(())
    }
}

impl fmt::Display for MatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matcher Configuration:")?;
        writeln!(f, "  Objective: {}", self.objective)?;
        writeln!(f, "  Method: {}", self.method)?;
        writeln!(f, "  Max Iterations: {}", self.max_iter)?;
        writeln!(f, "  Time Limit: {}s", self.time_limit)?;
        writeln!(f, "  Seed: {}", self.seed)?;
        if let Some(caliper) = self.caliper {
            writeln!(f, "  Caliper: {caliper}")?;
        }
        writeln!(f, "  Matching Ratio: 1:{}", self.matching_ratio)?;
        if self.hyperparameter_grid.is_some() {
            writeln!(f, "  Hyperparameter Grid: custom")?;
        }
        if let Some(patience) = self.patience {
            writeln!(f, "  Patience: {patience}")?;
        }
        writeln!(f, "  Tolerance: {}", self.tolerance)?;
        writeln!(f, "  Parallel Batch: {}", self.parallel_batch)?;
        writeln!(
            f,
            "  Populations: {} (pool) / {} (target)",
            self.pool_population, self.target_population
        )?;
        Ok(())
    }
}

/// Builder for constructing a matcher configuration
#[derive(Debug, Clone)]
pub struct MatcherConfigBuilder {
    config: MatcherConfig,
}

impl Default for MatcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatcherConfig::default(),
        }
    }

    /// Set the objective key
    #[must_use]
    pub fn objective(mut self, key: &str) -> Self {
        self.config.objective = key.to_string();
        self
    }

    /// Set the assignment method key
    #[must_use]
    pub fn method(mut self, key: &str) -> Self {
        self.config.method = key.to_string();
        self
    }

    /// Set the iteration cap
    #[must_use]
    pub const fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set the time limit in seconds
    #[must_use]
    pub const fn time_limit(mut self, seconds: f64) -> Self {
        self.config.time_limit = seconds;
        self
    }

    /// Set the random seed
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the caliper
    #[must_use]
    pub const fn caliper(mut self, caliper: f64) -> Self {
        self.config.caliper = Some(caliper);
        self
    }

    /// Set the matching ratio
    #[must_use]
    pub const fn matching_ratio(mut self, ratio: usize) -> Self {
        self.config.matching_ratio = ratio;
        self
    }

    /// Set the hyperparameter grid
    #[must_use]
    pub fn hyperparameter_grid(mut self, grid: HyperparameterGrid) -> Self {
        self.config.hyperparameter_grid = Some(grid);
        self
    }

    /// Set the patience
    #[must_use]
    pub const fn patience(mut self, patience: usize) -> Self {
        self.config.patience = Some(patience);
        self
    }

    /// Set the convergence tolerance
    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the number of proposals evaluated per parallel batch
    #[must_use]
    pub const fn parallel_batch(mut self, batch: usize) -> Self {
        self.config.parallel_batch = batch;
        self
    }

    /// Set whether to show a progress bar
    #[must_use]
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Set the pool and target population labels
    #[must_use]
    pub fn populations(mut self, pool: &str, target: &str) -> Self {
        self.config.pool_population = pool.to_string();
        self.config.target_population = target.to_string();
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> MatcherConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_and_validation() {
        let config = MatcherConfig::builder()
            .objective("smd_max")
            .method("linear_sum_assignment")
            .max_iter(5)
            .caliper(0.2)
            .build();
        assert!(config.validate().is_ok());
        assert_eq!(config.objective().unwrap(), Objective::SmdMax);
        assert!(config.to_string().contains("Caliper: 0.2"));

        assert!(MatcherConfig::builder().max_iter(0).build().validate().is_err());
        assert!(MatcherConfig::builder().caliper(-1.0).build().validate().is_err());
        assert!(MatcherConfig::builder().matching_ratio(0).build().validate().is_err());
        assert!(MatcherConfig::builder().time_limit(f64::INFINITY).build().validate().is_err());
        assert!(matches!(
            MatcherConfig::builder().time_limit(1e20).build().validate(),
            Err(MatchingError::InvalidConfig(_))
        ));
        let huge = MatcherConfig::builder().time_limit(1e20).build();
        assert_eq!(huge.time_budget(), Duration::MAX);
        assert!(matches!(
            MatcherConfig::builder().objective("base").build().validate(),
            Err(MatchingError::UnknownObjective(_))
        ));
        assert!(matches!(
            MatcherConfig::builder().method("random").build().validate(),
            Err(MatchingError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"objective": "ks", "max_iter": 3, "hyperparameter_grid": {{"c": [0.1, 1.0]}}}}"#
        )
        .unwrap();

        let config = MatcherConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.objective, "ks");
        assert_eq!(config.max_iter, 3);
        assert_eq!(config.method, "greedy");
        assert_eq!(config.hyperparameter_grid.unwrap().c, vec![0.1, 1.0]);
    }

    #[test]
    fn test_json_round_trip_preserves_fields() {
        let config = MatcherConfig::builder().patience(4).parallel_batch(2).build();
        let json = serde_json::to_string(&config).unwrap();
        let back: MatcherConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
