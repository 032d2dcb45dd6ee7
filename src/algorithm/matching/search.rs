//! Hyperparameter search space and the seeded proposal policy
//!
//! Iteration 0 evaluates the defaults. Every later proposal is, with equal
//! probability, either a fresh draw from the search space or a small
//! perturbation of the incumbent. All randomness comes from one `StdRng`,
//! so a fixed seed gives a fixed proposal sequence for a fixed sequence
//! of incumbents.

use crate::algorithm::propensity::hyperparameters::DEFAULT_C;
use crate::algorithm::propensity::{Hyperparameters, ModelFamily};
use crate::data::FeatureSchema;
use crate::error::{MatchingError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bounds of the default log-uniform range for C
pub const DEFAULT_C_RANGE: (f64, f64) = (1e-3, 1e2);

/// Probability of keeping each feature in a random draw
pub const FEATURE_KEEP_PROBABILITY: f64 = 0.75;

/// Probability of balanced class weights in a random draw
pub const BALANCED_PROBABILITY: f64 = 0.5;

/// Probability that a proposal perturbs the incumbent
pub const PERTURB_PROBABILITY: f64 = 0.5;

/// Half-width, in decades, of a C perturbation
const C_PERTURB_DECADES: f64 = 0.5;

/// Candidate values per search dimension
///
/// An empty list falls back to the default space for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperparameterGrid {
    /// Inverse regularisation strengths
    pub c: Vec<f64>,
    /// Class weighting choices
    pub class_weight_balanced: Vec<bool>,
    /// Intercept choices
    pub fit_intercept: Vec<bool>,
    /// Feature subsets
    pub features: Vec<Vec<String>>,
    /// Caliper values
    pub caliper: Vec<f64>,
    /// Model families
    pub model: Vec<ModelFamily>,
}

impl HyperparameterGrid {
    /// Check grid values against a feature schema
    ///
    /// # Errors
    /// Returns `MatchingError::InvalidConfig` for non-positive C or caliper
    /// values, empty feature subsets, or features not in `schema`.
    pub fn validate(&self, schema: &FeatureSchema) -> Result<()> {
        if let Some(c) = self.c.iter().find(|c| !(**c > 0.0 && c.is_finite())) {
            return Err(MatchingError::InvalidConfig(format!(
                "Grid value C = {c} must be positive"
            )));
        }
        if let Some(c) = self.caliper.iter().find(|c| !(**c > 0.0 && c.is_finite())) {
            return Err(MatchingError::InvalidConfig(format!(
                "Grid caliper {c} must be positive"
            )));
        }
        for subset in &self.features {
            if subset.is_empty() {
                return Err(MatchingError::InvalidConfig(
                    "Grid feature subsets must not be empty".to_string(),
                ));
            }
            if let Some(unknown) = subset.iter().find(|f| schema.kind_of(f).is_none()) {
                return Err(MatchingError::InvalidConfig(format!(
                    "Grid feature {unknown} is not a declared feature"
                )));
            }
        }
        Ok(())
    }
}

/// Seeded generator of hyperparameter proposals
#[derive(Debug, Clone)]
pub struct HyperparameterProposer {
    rng: StdRng,
    grid: HyperparameterGrid,
    features: Vec<String>,
    caliper: Option<f64>,
    proposed: usize,
}

impl HyperparameterProposer {
    /// Create a proposer over the features of `schema`
    ///
    /// `caliper` is used when the grid lists no caliper values.
    #[must_use]
    pub fn new(
        schema: &FeatureSchema,
        grid: Option<HyperparameterGrid>,
        caliper: Option<f64>,
        seed: u64,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            grid: grid.unwrap_or_default(),
            features: schema.names().into_iter().map(str::to_string).collect(),
            caliper,
            proposed: 0,
        }
    }

    /// Number of proposals made so far
    #[must_use]
    pub const fn proposed(&self) -> usize {
        self.proposed
    }

    /// Next proposal given the current incumbent
    pub fn propose(&mut self, incumbent: Option<&Hyperparameters>) -> Hyperparameters {
        let proposal = if self.proposed == 0 {
            self.defaults()
        } else {
            match incumbent {
                Some(best) if self.rng.random_bool(PERTURB_PROBABILITY) => self.perturb(best),
                _ => self.random_draw(),
            }
        };
        self.proposed += 1;
        proposal
    }

    /// Iteration-0 hyperparameters
    fn defaults(&self) -> Hyperparameters {
        Hyperparameters {
            c: DEFAULT_C,
            class_weight_balanced: false,
            fit_intercept: true,
            features: self.features.clone(),
            caliper: self.grid.caliper.first().copied().or(self.caliper),
            model: self.grid.model.first().copied().unwrap_or_default(),
        }
    }

    fn random_draw(&mut self) -> Hyperparameters {
        let c = match self.grid.c.choose(&mut self.rng) {
            Some(c) => *c,
            None => {
                let (lo, hi) = (DEFAULT_C_RANGE.0.log10(), DEFAULT_C_RANGE.1.log10());
                10f64
                    .powf(self.rng.random_range(lo..hi))
                    .clamp(DEFAULT_C_RANGE.0, DEFAULT_C_RANGE.1)
            }
        };
        let class_weight_balanced = match self.grid.class_weight_balanced.choose(&mut self.rng) {
            Some(b) => *b,
            None => self.rng.random_bool(BALANCED_PROBABILITY),
        };
        let fit_intercept = self
            .grid
            .fit_intercept
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(true);
        let features = match self.grid.features.choose(&mut self.rng) {
            Some(subset) => self.in_schema_order(subset),
            None => self.random_subset(),
        };
        let caliper = match self.grid.caliper.choose(&mut self.rng) {
            Some(c) => Some(*c),
            None => self.caliper,
        };
        let model = self.grid.model.choose(&mut self.rng).copied().unwrap_or_default();

        Hyperparameters {
            c,
            class_weight_balanced,
            fit_intercept,
            features,
            caliper,
            model,
        }
    }

    fn perturb(&mut self, incumbent: &Hyperparameters) -> Hyperparameters {
        let mut hp = incumbent.clone();

        hp.c = if self.grid.c.is_empty() {
            let factor = 10f64.powf(self.rng.random_range(-C_PERTURB_DECADES..C_PERTURB_DECADES));
            (hp.c * factor).clamp(DEFAULT_C_RANGE.0, DEFAULT_C_RANGE.1)
        } else {
            self.neighbouring_c(hp.c)
        };

        if self.grid.features.is_empty() {
            if let Some(feature) = self.features.choose(&mut self.rng).cloned() {
                let mut kept: Vec<String> = hp.features.clone();
                if let Some(pos) = kept.iter().position(|f| *f == feature) {
                    if kept.len() > 1 {
                        kept.remove(pos);
                    }
                } else {
                    kept.push(feature);
                }
                hp.features = self.in_schema_order(&kept);
            }
        } else if let Some(subset) = self.grid.features.choose(&mut self.rng) {
            hp.features = self.in_schema_order(subset);
        }

        hp
    }

    /// Move C to an adjacent value of the sorted grid
    fn neighbouring_c(&mut self, c: f64) -> f64 {
        let mut values = self.grid.c.clone();
        values.sort_by(f64::total_cmp);
        let current = values
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - c).abs().total_cmp(&(*b - c).abs()))
            .map_or(0, |(i, _)| i);
        let next = if self.rng.random_bool(0.5) {
            (current + 1).min(values.len() - 1)
        } else {
            current.saturating_sub(1)
        };
        values[next]
    }

    /// Keep each feature with [`FEATURE_KEEP_PROBABILITY`], at least one
    fn random_subset(&mut self) -> Vec<String> {
        let mut kept: Vec<String> = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            if self.rng.random_bool(FEATURE_KEEP_PROBABILITY) {
                kept.push(feature.clone());
            }
        }
        if kept.is_empty() && !self.features.is_empty() {
            let i = self.rng.random_range(0..self.features.len());
            kept.push(self.features[i].clone());
        }
        kept
    }

    fn in_schema_order(&self, subset: &[String]) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| subset.contains(f))
            .cloned()
            .collect()
    }
}
