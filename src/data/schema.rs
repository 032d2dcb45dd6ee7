//! Feature schema for matching data
//!
//! Every covariate that takes part in matching is declared here with a
//! kind tag. Numeric features are compared through summary moments,
//! categoric features through level frequencies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag for a declared feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Continuous or integer valued covariate
    Numeric,
    /// Covariate with a finite set of levels
    Categoric,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categoric => write!(f, "categoric"),
        }
    }
}

/// Ordered mapping from feature name to kind
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<(String, FeatureKind)>,
}

impl FeatureSchema {
    /// Create an empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from separate numeric and categoric name lists
    #[must_use]
    pub fn from_lists(numeric: &[&str], categoric: &[&str]) -> Self {
        let mut schema = Self::new();
        for name in numeric {
            schema = schema.with_numeric(name);
        }
        for name in categoric {
            schema = schema.with_categoric(name);
        }
        schema
    }

    /// Declare a numeric feature
    #[must_use]
    pub fn with_numeric(self, name: &str) -> Self {
        self.with_feature(name, FeatureKind::Numeric)
    }

    /// Declare a categoric feature
    #[must_use]
    pub fn with_categoric(self, name: &str) -> Self {
        self.with_feature(name, FeatureKind::Categoric)
    }

    /// Declare a feature; redeclaring a name replaces its kind
    #[must_use]
    pub fn with_feature(mut self, name: &str, kind: FeatureKind) -> Self {
        if let Some(entry) = self.features.iter_mut().find(|(n, _)| n == name) {
            entry.1 = kind;
        } else {
            self.features.push((name.to_string(), kind));
        }
        self
    }

    /// Kind of a feature, if declared
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    /// All declared features in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureKind)> {
        self.features.iter().map(|(n, k)| (n.as_str(), *k))
    }

    /// Names of the numeric features
    #[must_use]
    pub fn numeric(&self) -> Vec<&str> {
        self.names_of(FeatureKind::Numeric)
    }

    /// Names of the categoric features
    #[must_use]
    pub fn categoric(&self) -> Vec<&str> {
        self.names_of(FeatureKind::Categoric)
    }

    /// All feature names in declaration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of declared features
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no features are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn names_of(&self, kind: FeatureKind) -> Vec<&str> {
        self.features
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(n, _)| n.as_str())
            .collect()
    }
}
