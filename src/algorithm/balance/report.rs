//! Balance reports for display and export

use super::statistics::{
    calculate_mean, calculate_std_dev, pooled_std, proportion_std, standardized_difference,
};
use super::{BalanceCalculator, BalanceScore};
use crate::data::{FeatureKind, MatchingData};
use crate::error::Result;
use itertools::Itertools;
use log::info;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Standardized difference above which a covariate counts as imbalanced
pub const IMBALANCE_THRESHOLD: f64 = 0.1;

/// Balance of a single covariate (or categoric level)
#[derive(Debug, Clone)]
pub struct BalanceMetric {
    /// Covariate name; categoric levels are reported as `feature=level`
    pub name: String,

    /// Signed standardized difference (target minus pool)
    pub standardized_difference: f64,

    /// Mean (or proportion) for the target population
    pub target_mean: f64,

    /// Mean (or proportion) for the pool population
    pub pool_mean: f64,

    /// Standard deviation for the target population
    pub target_std: f64,

    /// Standard deviation for the pool population
    pub pool_std: f64,

    /// Whether the covariate is categorical
    pub categorical: bool,
}

/// Summary statistics for a balance report
#[derive(Debug, Clone)]
pub struct BalanceSummary {
    /// Number of metrics with |standardized difference| above the threshold
    pub imbalanced_covariates: usize,

    /// Maximum absolute standardized difference
    pub max_standardized_difference: f64,

    /// Mean absolute standardized difference
    pub mean_absolute_standardized_difference: f64,

    /// Total number of metrics
    pub total_covariates: usize,

    /// Aggregate loss of the calculator's objective
    pub loss: f64,
}

/// Report on balance between target and pool
#[derive(Debug, Clone)]
pub struct BalanceReport {
    /// Key of the objective the loss was computed with
    pub objective: String,

    /// Balance metrics for each covariate
    pub metrics: Vec<BalanceMetric>,

    /// Per-feature losses of the objective, in schema order
    pub feature_losses: Vec<(String, f64)>,

    /// Summary statistics
    pub summary: BalanceSummary,
}

impl BalanceReport {
    /// Metrics sorted by absolute standardized difference (descending)
    #[must_use]
    pub fn sorted_metrics(&self) -> Vec<&BalanceMetric> {
        self.metrics
            .iter()
            .sorted_by(|a, b| {
                b.standardized_difference
                    .abs()
                    .total_cmp(&a.standardized_difference.abs())
            })
            .collect()
    }

    /// Write the report to a CSV file
    pub fn write_to_csv(&self, file_path: &Path) -> Result<()> {
        let mut file = File::create(file_path)?;

        writeln!(
            file,
            "Covariate,Type,Target Mean,Pool Mean,Target SD,Pool SD,Std Diff"
        )?;

        for metric in self.sorted_metrics() {
            writeln!(
                file,
                "{},{},{:.6},{:.6},{:.6},{:.6},{:.6}",
                escape_csv(&metric.name),
                covariate_type(metric),
                metric.target_mean,
                metric.pool_mean,
                metric.target_std,
                metric.pool_std,
                metric.standardized_difference
            )?;
        }

        writeln!(file)?;
        writeln!(file, "Summary Statistics,,,,,,")?;
        writeln!(file, "Objective,{},,,,,", self.objective)?;
        writeln!(file, "Loss,{:.6},,,,,", self.summary.loss)?;
        writeln!(file, "Total covariates,{},,,,,", self.summary.total_covariates)?;
        writeln!(
            file,
            "Imbalanced covariates (std diff > {IMBALANCE_THRESHOLD}),{},,,,,",
            self.summary.imbalanced_covariates
        )?;
        writeln!(
            file,
            "Maximum standardized difference,{:.6},,,,,",
            self.summary.max_standardized_difference
        )?;
        writeln!(
            file,
            "Mean absolute standardized difference,{:.6},,,,,",
            self.summary.mean_absolute_standardized_difference
        )?;

        Ok(())
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Balance Summary ({}):\n\
             - Loss: {:.4}\n\
             - Total covariates: {}\n\
             - Imbalanced covariates (std diff > {}): {} ({:.1}%)\n\
             - Maximum standardized difference: {:.4}\n\
             - Mean absolute standardized difference: {:.4}\n",
            self.objective,
            self.summary.loss,
            self.summary.total_covariates,
            IMBALANCE_THRESHOLD,
            self.summary.imbalanced_covariates,
            if self.summary.total_covariates > 0 {
                100.0 * self.summary.imbalanced_covariates as f64
                    / self.summary.total_covariates as f64
            } else {
                0.0
            },
            self.summary.max_standardized_difference,
            self.summary.mean_absolute_standardized_difference
        )?;

        writeln!(
            f,
            "Covariate                      | Type        | Target Mean | Pool Mean | Target SD | Pool SD  | Std Diff\n\
             -------------------------------|-------------|-------------|-----------|-----------|----------|----------"
        )?;

        for metric in self.sorted_metrics() {
            writeln!(
                f,
                "{:<30} | {:<11} | {:>11.4} | {:>9.4} | {:>9.4} | {:>8.4} | {:>8.4}",
                truncate_string(&metric.name, 30),
                covariate_type(metric),
                metric.target_mean,
                metric.pool_mean,
                metric.target_std,
                metric.pool_std,
                metric.standardized_difference
            )?;
        }

        Ok(())
    }
}

/// Build a report for `data` using the calculator's populations and scales
pub(super) fn build_report(calculator: &BalanceCalculator, data: &MatchingData) -> Result<BalanceReport> {
    let target = data.population(calculator.target())?;
    let pool = data.population(calculator.pool())?;
    let mut metrics = Vec::new();

    for (feature, kind) in data.schema().iter() {
        match kind {
            FeatureKind::Numeric => {
                let t = target.numeric_values(feature)?;
                let p = pool.numeric_values(feature)?;
                let (t_mean, p_mean) = (calculate_mean(&t), calculate_mean(&p));
                let (t_std, p_std) = (calculate_std_dev(&t, t_mean), calculate_std_dev(&p, p_mean));
                let scale = calculator
                    .numeric_scale(feature)
                    .filter(|s| *s > f64::EPSILON)
                    .unwrap_or_else(|| pooled_std(t_std, p_std));
                metrics.push(BalanceMetric {
                    name: feature.to_string(),
                    standardized_difference: signed(t_mean, p_mean, scale),
                    target_mean: t_mean,
                    pool_mean: p_mean,
                    target_std: t_std,
                    pool_std: p_std,
                    categorical: false,
                });
            }
            FeatureKind::Categoric => {
                let t = target.categoric_values(feature)?;
                let p = pool.categoric_values(feature)?;
                let levels = t.iter().chain(p.iter()).unique().sorted().collect_vec();
                for level in levels {
                    let t_share = share(&t, level);
                    let p_share = share(&p, level);
                    let (t_std, p_std) = (proportion_std(t_share), proportion_std(p_share));
                    metrics.push(BalanceMetric {
                        name: format!("{feature}={level}"),
                        standardized_difference: signed(t_share, p_share, pooled_std(t_std, p_std)),
                        target_mean: t_share,
                        pool_mean: p_share,
                        target_std: t_std,
                        pool_std: p_std,
                        categorical: true,
                    });
                }
            }
        }
    }

    let feature_losses = calculator.per_feature_losses(data, false)?;
    let loss = calculator.total_loss(data)?;
    let summary = calculate_summary_statistics(&metrics, loss);

    info!(
        "Balance assessment complete: {} of {} covariates are imbalanced (stdiff > {}), {} loss {:.4}",
        summary.imbalanced_covariates,
        summary.total_covariates,
        IMBALANCE_THRESHOLD,
        calculator.objective(),
        loss
    );

    Ok(BalanceReport {
        objective: calculator.objective().key().to_string(),
        metrics,
        feature_losses,
        summary,
    })
}

fn signed(mean1: f64, mean2: f64, scale: f64) -> f64 {
    let magnitude = standardized_difference(mean1, mean2, scale);
    if mean1 < mean2 { -magnitude } else { magnitude }
}

fn share(values: &[String], level: &str) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| *v == level).count() as f64 / values.len() as f64
}

/// Calculate summary statistics for a set of balance metrics
fn calculate_summary_statistics(metrics: &[BalanceMetric], loss: f64) -> BalanceSummary {
    let mut imbalanced = 0;
    let mut max_std_diff: f64 = 0.0;
    let mut sum_abs_std_diff = 0.0;

    for metric in metrics {
        let abs_std_diff = metric.standardized_difference.abs();

        if abs_std_diff > IMBALANCE_THRESHOLD {
            imbalanced += 1;
        }

        max_std_diff = max_std_diff.max(abs_std_diff);
        sum_abs_std_diff += abs_std_diff;
    }

    let mean_abs_std_diff = if metrics.is_empty() {
        0.0
    } else {
        sum_abs_std_diff / metrics.len() as f64
    };

    BalanceSummary {
        imbalanced_covariates: imbalanced,
        max_standardized_difference: max_std_diff,
        mean_absolute_standardized_difference: mean_abs_std_diff,
        total_covariates: metrics.len(),
        loss,
    }
}

const fn covariate_type(metric: &BalanceMetric) -> &'static str {
    if metric.categorical {
        "Categorical"
    } else {
        "Continuous"
    }
}

/// Truncate a string to a maximum length
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    }
}

/// Escape a string for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
