//! Tests for balance calculators

use crate::utils::{duplicated_populations, fixture_data};
use popmatch::{
    BALANCE_CALCULATORS, BalanceCalculator, BalanceScore, MatchingError, Objective, objectives,
};
use tempfile::tempdir;

#[test]
fn test_identical_populations_score_zero() {
    let data = duplicated_populations();
    for key in objectives() {
        let calculator = BalanceCalculator::from_key(key, &data).unwrap();
        let total = calculator.total_loss(&data).unwrap();
        assert!(total.abs() < 1e-12, "{key} gave {total}");
        for (feature, loss) in calculator.per_feature_losses(&data, false).unwrap() {
            assert!(loss.abs() < 1e-12, "{key} gave {loss} for {feature}");
        }
    }
}

#[test]
fn test_base_is_registered_but_not_selectable() {
    assert!(BALANCE_CALCULATORS.iter().any(|(key, _)| *key == "base"));
    assert!(!objectives().contains(&"base"));

    let data = duplicated_populations();
    assert!(matches!(
        BalanceCalculator::from_key("base", &data),
        Err(MatchingError::UnknownObjective(_))
    ));
    assert!(matches!(
        BalanceCalculator::new(Objective::Base, &data),
        Err(MatchingError::UnknownObjective(_))
    ));
    assert!(matches!(
        Objective::from_key("nope"),
        Err(MatchingError::UnknownObjective(_))
    ));
}

#[test]
fn test_shifted_feature_scores_positive() {
    let data = fixture_data(
        &[1.0, 2.0, 3.0, 6.0, 7.0, 8.0],
        &["red", "red", "blue", "red", "red", "blue"],
        &["pool", "pool", "pool", "target", "target", "target"],
    );
    for key in objectives() {
        let calculator = BalanceCalculator::from_key(key, &data).unwrap();
        let x = calculator.score(&data, "x").unwrap();
        let color = calculator.score(&data, "color").unwrap();
        assert!(x > 0.0, "{key}");
        assert!(color.abs() < 1e-12, "{key}");
    }
}

#[test]
fn test_smd_max_is_largest_feature_loss() {
    let data = fixture_data(
        &[1.0, 2.0, 3.0, 2.0, 3.0, 4.0],
        &["red", "blue", "blue", "red", "red", "red"],
        &["pool", "pool", "pool", "target", "target", "target"],
    );
    let smd_max = BalanceCalculator::new(Objective::SmdMax, &data).unwrap();
    let losses = smd_max.per_feature_losses(&data, false).unwrap();
    let largest = losses.iter().map(|(_, l)| *l).fold(0.0, f64::max);
    assert!((smd_max.total_loss(&data).unwrap() - largest).abs() < 1e-12);
}

#[test]
fn test_report_writes_csv() {
    let data = duplicated_populations();
    let report = BalanceCalculator::new(Objective::Smd, &data)
        .unwrap()
        .report(&data)
        .unwrap();
    assert_eq!(report.summary.imbalanced_covariates, 0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("balance.csv");
    report.write_to_csv(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.lines().count() > 1);
    assert!(content.contains('x'));
}
