//! Matching session: the state a front end keeps between runs
//!
//! A session owns the loaded dataset, an untouched pre-match copy, the
//! last matching result and the selected objective. Front ends hold a
//! session value and pass it around explicitly.

use crate::algorithm::balance::{BalanceCalculator, BalanceReport, BalanceScore, Objective};
use crate::algorithm::matching::{MatchingResult, PropensityScoreMatcher};
use crate::config::MatcherConfig;
use crate::data::sim::generate_toy_dataset;
use crate::data::{FeatureSchema, MatchingData, POOL, TARGET};
use crate::error::Result;
use log::info;
use std::fmt;
use std::path::Path;

/// Suffix appended to population labels of matched records
pub const POSTMATCH_SUFFIX: &str = " (postmatch)";

/// Loss of one feature before and after matching
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLoss {
    /// Feature name
    pub feature: String,
    /// Loss on the pre-match data
    pub before: f64,
    /// Loss on the matched data
    pub after: f64,
}

/// Per-feature comparison of a matching run
#[derive(Debug, Clone, PartialEq)]
pub struct LossComparison {
    /// Objective the losses were computed with
    pub objective: Objective,
    /// One row per declared feature, in schema order
    pub features: Vec<FeatureLoss>,
    /// Aggregate loss before matching
    pub total_before: f64,
    /// Aggregate loss after matching
    pub total_after: f64,
}

impl LossComparison {
    /// Features whose loss did not increase
    #[must_use]
    pub fn improved_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.after <= f.before)
            .map(|f| f.feature.as_str())
            .collect()
    }
}

impl fmt::Display for LossComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loss comparison ({}):", self.objective)?;
        writeln!(f, "{:<20} | {:>10} | {:>10}", "Feature", "Pre-match", "Post-match")?;
        writeln!(f, "{:-<20}-|-{:->10}-|-{:->10}", "", "", "")?;
        for row in &self.features {
            writeln!(f, "{:<20} | {:>10.4} | {:>10.4}", row.feature, row.before, row.after)?;
        }
        writeln!(
            f,
            "{:<20} | {:>10.4} | {:>10.4}",
            "TOTAL", self.total_before, self.total_after
        )
    }
}

/// Dataset, pre-match copy and last result of an interactive session
#[derive(Debug)]
pub struct MatchingSession {
    dataset: MatchingData,
    original: MatchingData,
    last_result: Option<MatchingResult>,
    objective: Objective,
    pool: String,
    target: String,
}

impl MatchingSession {
    /// Start a session on `data`
    pub fn new(data: MatchingData) -> Result<Self> {
        let original = data.copy()?;
        Ok(Self {
            dataset: data,
            original,
            last_result: None,
            objective: Objective::Smd,
            pool: POOL.to_string(),
            target: TARGET.to_string(),
        })
    }

    /// Start a session on a generated toy dataset
    pub fn with_toy_dataset(n_pool: usize, n_target: usize, seed: u64) -> Result<Self> {
        Self::new(generate_toy_dataset(n_pool, n_target, seed)?)
    }

    /// Start a session on a CSV or Parquet file
    pub fn from_path(path: &Path, population_col: &str, schema: FeatureSchema) -> Result<Self> {
        Self::new(MatchingData::from_path(path, population_col, schema)?)
    }

    /// Dataset for display: the original records plus, after a run, the
    /// matched records with suffixed population labels
    #[must_use]
    pub const fn dataset(&self) -> &MatchingData {
        &self.dataset
    }

    /// Pre-match records
    #[must_use]
    pub const fn original(&self) -> &MatchingData {
        &self.original
    }

    /// Result of the last successful run
    #[must_use]
    pub const fn last_result(&self) -> Option<&MatchingResult> {
        self.last_result.as_ref()
    }

    /// Objective of the last run
    #[must_use]
    pub const fn objective(&self) -> Objective {
        self.objective
    }

    /// Match the pre-match records and update the displayed dataset
    ///
    /// Earlier match results are replaced, not accumulated.
    pub fn run_match(&mut self, config: &MatcherConfig) -> Result<LossComparison> {
        let mut matcher = PropensityScoreMatcher::new(&self.original, config.clone())?;
        let result = matcher.run()?;
        let calculator = matcher.calculator();

        let comparison = compare_losses(calculator, &self.original, &result.matched)?;

        let mut dataset = self.original.copy()?;
        dataset.append(&result.matched.relabel_populations(POSTMATCH_SUFFIX)?)?;

        info!(
            "Session updated: {} records displayed, {} loss {:.4} -> {:.4}",
            dataset.num_rows(),
            comparison.objective,
            comparison.total_before,
            comparison.total_after
        );

        self.dataset = dataset;
        self.objective = comparison.objective;
        self.pool.clone_from(&config.pool_population);
        self.target.clone_from(&config.target_population);
        self.last_result = Some(result);
        Ok(comparison)
    }

    /// Balance reports of the pre-match data and, after a run, the match
    ///
    /// Uses the population labels of the last run ("pool" and "target"
    /// before any run).
    pub fn balance_reports(&self) -> Result<(BalanceReport, Option<BalanceReport>)> {
        let calculator = BalanceCalculator::with_populations(
            self.objective,
            &self.original,
            &self.pool,
            &self.target,
        )?;
        let before = calculator.report(&self.original)?;
        let after = self
            .last_result
            .as_ref()
            .map(|result| calculator.report(&result.matched))
            .transpose()?;
        Ok((before, after))
    }

    /// Drop the last result and show the original records again
    pub fn reset(&mut self) -> Result<()> {
        self.dataset = self.original.copy()?;
        self.last_result = None;
        Ok(())
    }
}

fn compare_losses(
    calculator: &BalanceCalculator,
    before: &MatchingData,
    after: &MatchingData,
) -> Result<LossComparison> {
    let pre = calculator.per_feature_losses(before, false)?;
    let post = calculator.per_feature_losses(after, false)?;
    let features = pre
        .into_iter()
        .zip(post)
        .map(|((feature, before), (_, after))| FeatureLoss {
            feature,
            before,
            after,
        })
        .collect();

    Ok(LossComparison {
        objective: calculator.objective(),
        features,
        total_before: calculator.total_loss(before)?,
        total_after: calculator.total_loss(after)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MatcherConfig {
        MatcherConfig::builder().max_iter(3).show_progress(false).build()
    }

    #[test]
    fn test_run_match_appends_relabelled_records() {
        let mut session = MatchingSession::with_toy_dataset(80, 20, 1).unwrap();
        let comparison = session.run_match(&config()).unwrap();

        let counts = session.dataset().counts();
        assert_eq!(counts["pool"], 80);
        assert_eq!(counts["target"], 20);
        assert_eq!(counts["target (postmatch)"], 20);
        assert_eq!(counts["pool (postmatch)"], 20);
        assert_eq!(comparison.features.len(), 8);
        assert!(comparison.total_after <= comparison.total_before);
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_rerun_replaces_previous_match() {
        let mut session = MatchingSession::with_toy_dataset(60, 15, 2).unwrap();
        session.run_match(&config()).unwrap();
        session.run_match(&config()).unwrap();
        assert_eq!(session.dataset().num_rows(), 75 + 30);

        session.reset().unwrap();
        assert_eq!(session.dataset(), session.original());
        assert!(session.last_result().is_none());
    }

    #[test]
    fn test_balance_reports() {
        let mut session = MatchingSession::with_toy_dataset(60, 15, 3).unwrap();
        let (_, after) = session.balance_reports().unwrap();
        assert!(after.is_none());

        session.run_match(&config()).unwrap();
        let (before, after) = session.balance_reports().unwrap();
        assert_eq!(before.objective, "smd");
        assert!(after.is_some());
    }
}
