//! Covariate balance between a target and a pool population
//!
//! A balance calculator turns a `MatchingData` into per-feature imbalance
//! statistics and a single scalar loss. The statistic is chosen by an
//! [`Objective`] looked up by key in [`BALANCE_CALCULATORS`]. The "base"
//! entry stands for the shared [`BalanceScore`] contract and cannot be
//! selected as an objective.
//!
//! Calculators are built from a reference dataset (normally the data
//! before matching) and standardise differences with the spread observed
//! there, so losses of different candidate matches are comparable.

pub mod report;
pub mod statistics;

use crate::data::extraction::MISSING_LEVEL;
use crate::data::{FeatureKind, MatchingData, POOL, TARGET};
use crate::error::{MatchingError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use statistics::{
    SATURATED_IMBALANCE, calculate_mean, calculate_std_dev, ks_statistic, level_shares,
    pooled_std, proportion_std, standardized_difference, total_variation,
};
use std::fmt;

pub use report::{BalanceMetric, BalanceReport, BalanceSummary};

/// Levels rarer than this pooled share are merged when debinning
pub const RARE_LEVEL_SHARE: f64 = 0.05;

/// Level that absorbs rare levels when debinning
pub const OTHER_LEVEL: &str = "<other>";

/// Balance statistic selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Common contract; not a usable statistic
    Base,
    /// Mean absolute standardized mean difference
    Smd,
    /// Maximum absolute standardized mean difference
    SmdMax,
    /// Mean squared standardized mean difference
    SmdSquared,
    /// Mean Kolmogorov-Smirnov / total variation distance
    Ks,
}

/// Registry of balance calculators by key, including "base"
pub const BALANCE_CALCULATORS: [(&str, Objective); 5] = [
    ("base", Objective::Base),
    ("smd", Objective::Smd),
    ("smd_max", Objective::SmdMax),
    ("smd_squared", Objective::SmdSquared),
    ("ks", Objective::Ks),
];

/// Keys of the objectives a user may select
#[must_use]
pub fn objectives() -> Vec<&'static str> {
    BALANCE_CALCULATORS
        .iter()
        .filter(|(_, objective)| objective.is_selectable())
        .map(|(key, _)| *key)
        .collect()
}

impl Objective {
    /// Registry key
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Smd => "smd",
            Self::SmdMax => "smd_max",
            Self::SmdSquared => "smd_squared",
            Self::Ks => "ks",
        }
    }

    /// Human-readable description of the statistic
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Base => "Abstract balance calculator contract; not selectable",
            Self::Smd => {
                "Mean over features of the absolute standardized mean difference; \
                 categoric features use the largest per-level proportion difference"
            }
            Self::SmdMax => "Largest absolute standardized mean difference over all features",
            Self::SmdSquared => "Mean over features of the squared standardized mean difference",
            Self::Ks => {
                "Mean over features of the two-sample Kolmogorov-Smirnov statistic \
                 (numeric) or total variation distance (categoric)"
            }
        }
    }

    /// Whether the objective may be chosen by a user
    #[must_use]
    pub const fn is_selectable(self) -> bool {
        !matches!(self, Self::Base)
    }

    /// Look up a selectable objective by key
    ///
    /// # Errors
    /// Returns `MatchingError::UnknownObjective` for unknown keys and for "base".
    pub fn from_key(key: &str) -> Result<Self> {
        BALANCE_CALCULATORS
            .iter()
            .find(|(k, objective)| *k == key && objective.is_selectable())
            .map(|(_, objective)| *objective)
            .ok_or_else(|| MatchingError::UnknownObjective(key.to_string()))
    }

    const fn uses_smd(self) -> bool {
        matches!(self, Self::Smd | Self::SmdMax | Self::SmdSquared)
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Contract shared by all balance calculators
pub trait BalanceScore {
    /// Objective implemented by this calculator
    fn objective(&self) -> Objective;

    /// Imbalance of one feature between target and pool
    fn score(&self, data: &MatchingData, feature: &str) -> Result<f64>;

    /// Imbalance of every declared feature, in schema order
    fn per_feature_losses(&self, data: &MatchingData, debin: bool) -> Result<Vec<(String, f64)>>;

    /// Aggregate loss used to rank candidate matches
    fn total_loss(&self, data: &MatchingData) -> Result<f64>;

    /// Description of the statistic
    fn description(&self) -> &'static str {
        self.objective().description()
    }
}

/// Balance calculator for a selectable objective
#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    objective: Objective,
    pool: String,
    target: String,
    numeric_scales: FxHashMap<String, f64>,
    level_scales: FxHashMap<(String, String), f64>,
    feature_weights: FxHashMap<String, f64>,
}

impl BalanceCalculator {
    /// Create a calculator with standardisation taken from `reference`
    ///
    /// Uses the conventional "pool" and "target" population labels.
    pub fn new(objective: Objective, reference: &MatchingData) -> Result<Self> {
        Self::with_populations(objective, reference, POOL, TARGET)
    }

    /// Create a calculator for custom population labels
    ///
    /// # Errors
    /// Returns `MatchingError::UnknownObjective` for the base objective and
    /// `MatchingError::Partition` if either population is absent from
    /// `reference`.
    pub fn with_populations(
        objective: Objective,
        reference: &MatchingData,
        pool: &str,
        target: &str,
    ) -> Result<Self> {
        if !objective.is_selectable() {
            return Err(MatchingError::UnknownObjective(objective.key().to_string()));
        }

        let pool_idx = population_indices(reference, pool)?;
        let target_idx = population_indices(reference, target)?;

        let mut numeric_scales = FxHashMap::default();
        let mut level_scales = FxHashMap::default();

        for (feature, kind) in reference.schema().iter() {
            match kind {
                FeatureKind::Numeric => {
                    let column = reference.numeric_column(feature)?;
                    let t = select_present(&column, &target_idx);
                    let p = select_present(&column, &pool_idx);
                    let t_std = calculate_std_dev(&t, calculate_mean(&t));
                    let p_std = calculate_std_dev(&p, calculate_mean(&p));
                    numeric_scales.insert(feature.to_string(), pooled_std(t_std, p_std));
                }
                FeatureKind::Categoric => {
                    let column = reference.categoric_values(feature)?;
                    let t_shares = level_shares(&select(&column, &target_idx));
                    let p_shares = level_shares(&select(&column, &pool_idx));
                    for level in t_shares.keys().chain(p_shares.keys()) {
                        let t = t_shares.get(level).copied().unwrap_or(0.0);
                        let p = p_shares.get(level).copied().unwrap_or(0.0);
                        level_scales.insert(
                            (feature.to_string(), level.clone()),
                            pooled_std(proportion_std(t), proportion_std(p)),
                        );
                    }
                }
            }
        }

        Ok(Self {
            objective,
            pool: pool.to_string(),
            target: target.to_string(),
            numeric_scales,
            level_scales,
            feature_weights: FxHashMap::default(),
        })
    }

    /// Create a calculator from an objective key
    pub fn from_key(key: &str, reference: &MatchingData) -> Result<Self> {
        Self::new(Objective::from_key(key)?, reference)
    }

    /// Weight features in the aggregate loss (unlisted features weigh 1)
    #[must_use]
    pub fn with_feature_weights(mut self, weights: FxHashMap<String, f64>) -> Self {
        self.feature_weights = weights;
        self
    }

    /// Label of the pool population
    #[must_use]
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Label of the target population
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Numeric standardisation scale captured from the reference data
    #[must_use]
    pub fn numeric_scale(&self, feature: &str) -> Option<f64> {
        self.numeric_scales.get(feature).copied()
    }

    fn score_feature(&self, data: &MatchingData, feature: &str, debin: bool) -> Result<f64> {
        let kind = data.schema().kind_of(feature).ok_or_else(|| {
            MatchingError::Schema(format!("Feature {feature} is not declared"))
        })?;
        let target_idx = population_indices(data, &self.target)?;
        let pool_idx = population_indices(data, &self.pool)?;

        let statistic = match kind {
            FeatureKind::Numeric => {
                let column = data.numeric_column(feature)?;
                let t = select_present(&column, &target_idx);
                let p = select_present(&column, &pool_idx);
                self.numeric_statistic(feature, &t, &p)
            }
            FeatureKind::Categoric => {
                let column = data.categoric_values(feature)?;
                let mut t = select(&column, &target_idx);
                let mut p = select(&column, &pool_idx);
                if debin {
                    collapse_rare_levels(&mut t, &mut p);
                }
                self.categoric_statistic(feature, &t, &p)
            }
        };

        Ok(match self.objective {
            Objective::SmdSquared => statistic * statistic,
            _ => statistic,
        })
    }

    fn numeric_statistic(&self, feature: &str, target: &[f64], pool: &[f64]) -> f64 {
        if target.is_empty() || pool.is_empty() {
            return 0.0;
        }
        if !self.objective.uses_smd() {
            return ks_statistic(target, pool);
        }

        let t_mean = calculate_mean(target);
        let p_mean = calculate_mean(pool);
        let scale = match self.numeric_scales.get(feature) {
            Some(&s) if s > f64::EPSILON => s,
            _ => pooled_std(
                calculate_std_dev(target, t_mean),
                calculate_std_dev(pool, p_mean),
            ),
        };
        standardized_difference(t_mean, p_mean, scale)
    }

    fn categoric_statistic(&self, feature: &str, target: &[String], pool: &[String]) -> f64 {
        if target.is_empty() || pool.is_empty() {
            return 0.0;
        }
        let t_shares = level_shares(target);
        let p_shares = level_shares(pool);
        if !self.objective.uses_smd() {
            return total_variation(&t_shares, &p_shares);
        }

        let mut worst: f64 = 0.0;
        for level in t_shares.keys().chain(p_shares.keys()) {
            let t = t_shares.get(level).copied().unwrap_or(0.0);
            let p = p_shares.get(level).copied().unwrap_or(0.0);
            let scale = match self.level_scales.get(&(feature.to_string(), level.clone())) {
                Some(&s) if s > f64::EPSILON => s,
                _ => pooled_std(proportion_std(t), proportion_std(p)),
            };
            worst = worst.max(standardized_difference(t, p, scale));
        }
        worst.min(SATURATED_IMBALANCE)
    }

    fn weight_of(&self, feature: &str) -> f64 {
        self.feature_weights.get(feature).copied().unwrap_or(1.0)
    }

    /// Detailed per-feature report for display or export
    pub fn report(&self, data: &MatchingData) -> Result<BalanceReport> {
        report::build_report(self, data)
    }
}

impl BalanceScore for BalanceCalculator {
    fn objective(&self) -> Objective {
        self.objective
    }

    fn score(&self, data: &MatchingData, feature: &str) -> Result<f64> {
        self.score_feature(data, feature, false)
    }

    fn per_feature_losses(&self, data: &MatchingData, debin: bool) -> Result<Vec<(String, f64)>> {
        data.schema()
            .names()
            .into_iter()
            .map(|feature| Ok((feature.to_string(), self.score_feature(data, feature, debin)?)))
            .collect()
    }

    fn total_loss(&self, data: &MatchingData) -> Result<f64> {
        let losses = self.per_feature_losses(data, false)?;
        if losses.is_empty() {
            return Ok(0.0);
        }

        let loss = match self.objective {
            Objective::SmdMax => losses
                .iter()
                .map(|(f, l)| self.weight_of(f) * l)
                .fold(0.0, f64::max),
            _ => {
                let total_weight: f64 = losses.iter().map(|(f, _)| self.weight_of(f)).sum();
                if total_weight <= 0.0 {
                    0.0
                } else {
                    losses
                        .iter()
                        .map(|(f, l)| self.weight_of(f) * l)
                        .sum::<f64>()
                        / total_weight
                }
            }
        };
        Ok(loss)
    }
}

/// Row indices of a population, failing if it is absent
fn population_indices(data: &MatchingData, population: &str) -> Result<Vec<usize>> {
    let indices = data.indices_of(population);
    if indices.is_empty() {
        return Err(MatchingError::Partition(format!(
            "Population {population} not present (have {:?})",
            data.populations()
        )));
    }
    Ok(indices)
}

fn select_present(column: &[Option<f64>], indices: &[usize]) -> Vec<f64> {
    indices.iter().filter_map(|&i| column[i]).collect()
}

fn select(column: &[String], indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&i| column[i].clone()).collect()
}

/// Merge levels whose pooled share is below [`RARE_LEVEL_SHARE`]
fn collapse_rare_levels(target: &mut [String], pool: &mut [String]) {
    let total = (target.len() + pool.len()) as f64;
    if total == 0.0 {
        return;
    }
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for level in target.iter().chain(pool.iter()) {
        *counts.entry(level.clone()).or_insert(0) += 1;
    }
    let rare: Vec<String> = counts
        .into_iter()
        .filter(|(level, count)| {
            level != MISSING_LEVEL && (*count as f64) / total < RARE_LEVEL_SHARE
        })
        .map(|(level, _)| level)
        .collect();
    if rare.is_empty() {
        return;
    }
    for level in target.iter_mut().chain(pool.iter_mut()) {
        if rare.contains(level) {
            *level = OTHER_LEVEL.to_string();
        }
    }
}
