//! Summary statistics and two-sample imbalance statistics

use rustc_hash::FxHashMap;

/// Imbalance reported when neither population has spread but their means differ
pub const SATURATED_IMBALANCE: f64 = 1.0e3;

/// Calculate the mean of a slice of values (NaN when empty)
#[must_use]
pub fn calculate_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let sum: f64 = values.iter().sum();
    sum / values.len() as f64
}

/// Calculate the sample standard deviation of a slice of values
#[must_use]
pub fn calculate_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }

    let variance =
        values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Linear-interpolated quantile of already sorted values
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            (sorted[upper] - sorted[lower]).mul_add(frac, sorted[lower])
        }
    }
}

/// Pooled standard deviation of two groups
#[must_use]
pub fn pooled_std(std1: f64, std2: f64) -> f64 {
    (std2.mul_add(std2, std1.powi(2)) / 2.0).sqrt()
}

/// Absolute standardized difference between two means on a given scale
///
/// A zero (or non-finite) scale saturates: 0 when the means agree,
/// [`SATURATED_IMBALANCE`] otherwise.
#[must_use]
pub fn standardized_difference(mean1: f64, mean2: f64, scale: f64) -> f64 {
    let diff = (mean1 - mean2).abs();
    if !diff.is_finite() {
        return 0.0;
    }
    if scale > f64::EPSILON && scale.is_finite() {
        diff / scale
    } else if diff <= f64::EPSILON {
        0.0
    } else {
        SATURATED_IMBALANCE
    }
}

/// Standard deviation of a Bernoulli proportion
#[must_use]
pub fn proportion_std(p: f64) -> f64 {
    (p * (1.0 - p)).max(0.0).sqrt()
}

/// Two-sample Kolmogorov-Smirnov statistic: max |ECDF1 - ECDF2|
#[must_use]
pub fn ks_statistic(values1: &[f64], values2: &[f64]) -> f64 {
    if values1.is_empty() || values2.is_empty() {
        return 0.0;
    }

    let mut a = values1.to_vec();
    let mut b = values2.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut max_gap: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        max_gap = max_gap.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    max_gap
}

/// Level shares of a categoric sample
#[must_use]
pub fn level_shares(values: &[String]) -> FxHashMap<String, f64> {
    let mut counts: FxHashMap<String, f64> = FxHashMap::default();
    for value in values {
        *counts.entry(value.clone()).or_insert(0.0) += 1.0;
    }
    let total = values.len() as f64;
    if total > 0.0 {
        for count in counts.values_mut() {
            *count /= total;
        }
    }
    counts
}

/// Total variation distance between two level-share tables
#[must_use]
pub fn total_variation(shares1: &FxHashMap<String, f64>, shares2: &FxHashMap<String, f64>) -> f64 {
    let mut sum = 0.0;
    for (level, p1) in shares1 {
        sum += (p1 - shares2.get(level).copied().unwrap_or(0.0)).abs();
    }
    for (level, p2) in shares2 {
        if !shares1.contains_key(level) {
            sum += p2;
        }
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mean = calculate_mean(&values);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((calculate_std_dev(&values, mean) - 2.138_089_935_299_395).abs() < 1e-9);
        assert!(calculate_mean(&[]).is_nan());
        assert_eq!(calculate_std_dev(&[1.0], 1.0), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 4.0);
        assert!((quantile_sorted(&sorted, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_difference_saturates() {
        assert_eq!(standardized_difference(1.0, 1.0, 0.0), 0.0);
        assert_eq!(standardized_difference(1.0, 2.0, 0.0), SATURATED_IMBALANCE);
        assert!((standardized_difference(1.0, 2.0, 2.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ks_statistic() {
        assert_eq!(ks_statistic(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(ks_statistic(&[1.0, 2.0], &[3.0, 4.0]), 1.0);
        assert!((ks_statistic(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_total_variation() {
        let a = level_shares(&["x".to_string(), "y".to_string()]);
        let b = level_shares(&["x".to_string(), "z".to_string()]);
        assert!((total_variation(&a, &b) - 0.5).abs() < 1e-12);
        assert_eq!(total_variation(&a, &a), 0.0);
    }
}
