//! Per-population summaries of matching data
//!
//! Numeric features are summarised by moments and quantiles, categoric
//! features by level frequency tables. Both are computed separately
//! within each population.

use crate::algorithm::balance::statistics::{calculate_mean, calculate_std_dev, quantile_sorted};
use itertools::Itertools;
use std::fmt;

/// Summary of one numeric feature within one population
///
/// Moments and quantiles are NaN when the population has no
/// non-missing values for the feature.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    /// Feature name
    pub feature: String,
    /// Population label
    pub population: String,
    /// Number of non-missing values
    pub count: usize,
    /// Number of missing values
    pub missing: usize,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// First quartile
    pub q25: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q75: f64,
    /// Maximum
    pub max: f64,
}

impl NumericSummary {
    /// Summarise the values of one feature in one population
    #[must_use]
    pub fn from_values(feature: &str, population: &str, values: &[Option<f64>]) -> Self {
        let mut present: Vec<f64> = values.iter().flatten().copied().collect();
        present.sort_by(f64::total_cmp);

        let mean = calculate_mean(&present);
        let std = if present.is_empty() {
            f64::NAN
        } else {
            calculate_std_dev(&present, mean)
        };

        Self {
            feature: feature.to_string(),
            population: population.to_string(),
            count: present.len(),
            missing: values.len() - present.len(),
            mean,
            std,
            min: present.first().copied().unwrap_or(f64::NAN),
            q25: quantile_sorted(&present, 0.25),
            median: quantile_sorted(&present, 0.5),
            q75: quantile_sorted(&present, 0.75),
            max: present.last().copied().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for NumericSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20} {:<20} n={:<6} mean={:>10.4} sd={:>10.4} min={:>10.4} q25={:>10.4} median={:>10.4} q75={:>10.4} max={:>10.4}",
            self.feature,
            self.population,
            self.count,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max
        )
    }
}

/// Frequency of one level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelFrequency {
    /// Level value
    pub level: String,
    /// Number of records at this level
    pub count: usize,
    /// Share of the population's records at this level
    pub share: f64,
}

/// Level frequency table of one categoric feature within one population
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricSummary {
    /// Feature name
    pub feature: String,
    /// Population label
    pub population: String,
    /// Number of records
    pub total: usize,
    /// Level frequencies sorted by level
    pub levels: Vec<LevelFrequency>,
}

impl CategoricSummary {
    /// Tabulate the values of one feature in one population
    #[must_use]
    pub fn from_values(feature: &str, population: &str, values: &[String]) -> Self {
        let total = values.len();
        let levels = values
            .iter()
            .counts()
            .into_iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(level, count)| LevelFrequency {
                level: level.clone(),
                count,
                share: count as f64 / total as f64,
            })
            .collect();

        Self {
            feature: feature.to_string(),
            population: population.to_string(),
            total,
            levels,
        }
    }

    /// Share of a level (0 if the level never occurs)
    #[must_use]
    pub fn share_of(&self, level: &str) -> f64 {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .map_or(0.0, |l| l.share)
    }
}

impl fmt::Display for CategoricSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20} {:<20} n={:<6}", self.feature, self.population, self.total)?;
        for level in &self.levels {
            write!(f, " {}={:.3}", level.level, level.share)?;
        }
        Ok(())
    }
}
