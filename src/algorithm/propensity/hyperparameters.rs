//! Hyperparameters of one propensity fit + assignment

use super::{GaussianNaiveBayes, LogisticRegression, ModelFamily, PropensityModel};
use crate::data::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default inverse regularisation strength
pub const DEFAULT_C: f64 = 1.0;

/// One point of the search space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Weight classes inversely to their frequency
    pub class_weight_balanced: bool,
    /// Add an unpenalised intercept column
    pub fit_intercept: bool,
    /// Covariates fed to the model, in schema order
    pub features: Vec<String>,
    /// Maximum score distance of a matched pair
    pub caliper: Option<f64>,
    /// Classifier family
    pub model: ModelFamily,
}

impl Hyperparameters {
    /// Defaults for the first search iteration: every feature, C = 1
    #[must_use]
    pub fn defaults(schema: &FeatureSchema, caliper: Option<f64>) -> Self {
        Self {
            c: DEFAULT_C,
            class_weight_balanced: false,
            fit_intercept: true,
            features: schema.names().into_iter().map(str::to_string).collect(),
            caliper,
            model: ModelFamily::default(),
        }
    }

    /// Unfitted model configured by these hyperparameters
    #[must_use]
    pub fn build_model(&self) -> Box<dyn PropensityModel + Send> {
        match self.model {
            ModelFamily::Logistic => {
                Box::new(LogisticRegression::new(self.c, self.class_weight_balanced))
            }
            ModelFamily::NaiveBayes => Box::new(GaussianNaiveBayes::new(self.class_weight_balanced)),
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model={} C={:.4} balanced={} intercept={} caliper={} features=[{}]",
            self.model,
            self.c,
            self.class_weight_balanced,
            self.fit_intercept,
            self.caliper
                .map_or_else(|| "none".to_string(), |c| format!("{c:.4}")),
            self.features.join(", ")
        )
    }
}
