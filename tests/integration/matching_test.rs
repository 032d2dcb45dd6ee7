//! End-to-end tests of the propensity score matcher

use crate::utils::{duplicated_populations, quiet_config};
use popmatch::algorithm::matching::StopReason;
use popmatch::{
    BalanceCalculator, BalanceScore, HyperparameterGrid, MatcherConfig, MatchingError, Objective,
    PropensityScoreMatcher, SearchState, generate_toy_dataset,
};

#[test]
fn test_toy_dataset_matching_improves_numeric_balance() {
    let data = generate_toy_dataset(200, 50, 7).unwrap();
    let mut matcher = PropensityScoreMatcher::with_settings(&data, "smd", None, 5, 60.0, "greedy")
        .unwrap();
    let matched = matcher.perform_matching().unwrap();

    assert_eq!(matched.counts()["target"], 50);
    assert_eq!(matched.counts()["pool"], 50);
    assert_eq!(matcher.state(), SearchState::Done);

    let calculator = BalanceCalculator::new(Objective::Smd, &data).unwrap();
    let before = calculator.per_feature_losses(&data, false).unwrap();
    let after = calculator.per_feature_losses(&matched, false).unwrap();
    let numeric = data.schema().numeric();
    let not_worse = before
        .iter()
        .zip(&after)
        .filter(|((feature, _), _)| numeric.contains(&feature.as_str()))
        .filter(|((_, pre), (_, post))| post <= pre)
        .count();
    assert!(not_worse as f64 >= 0.9 * numeric.len() as f64);
}

#[test]
fn test_same_seed_gives_same_match() {
    let data = generate_toy_dataset(120, 30, 11).unwrap();
    let config = MatcherConfig::builder()
        .max_iter(6)
        .seed(99)
        .show_progress(false)
        .build();

    let first = PropensityScoreMatcher::new(&data, config.clone())
        .unwrap()
        .run()
        .unwrap();
    let second = PropensityScoreMatcher::new(&data, config)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(first.hyperparameters, second.hyperparameters);
    assert_eq!(first.best_iteration, second.best_iteration);
    assert_eq!(first.matched, second.matched);
}

#[test]
fn test_matched_records_come_from_input() {
    let data = generate_toy_dataset(80, 20, 5).unwrap();
    let result = PropensityScoreMatcher::new(&data, quiet_config(3))
        .unwrap()
        .run()
        .unwrap();

    let ids = data.numeric_values("patient_id").unwrap();
    let matched_ids = result.matched.numeric_values("patient_id").unwrap();
    assert!(matched_ids.iter().all(|id| ids.contains(id)));

    let mut unique = matched_ids.clone();
    unique.sort_by(f64::total_cmp);
    unique.dedup();
    assert_eq!(unique.len(), matched_ids.len());
    assert_eq!(result.iterations, result.history.len());
}

#[test]
fn test_matching_ratio_two() {
    let data = generate_toy_dataset(100, 20, 9).unwrap();
    let config = MatcherConfig::builder()
        .max_iter(2)
        .matching_ratio(2)
        .method("linear_sum_assignment")
        .show_progress(false)
        .build();
    let matched = PropensityScoreMatcher::new(&data, config)
        .unwrap()
        .perform_matching()
        .unwrap();

    assert_eq!(matched.counts()["target"], 20);
    assert_eq!(matched.counts()["pool"], 40);
}

#[test]
fn test_identical_populations_match_perfectly() {
    let data = duplicated_populations();
    let result = PropensityScoreMatcher::new(&data, quiet_config(2))
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(result.matched_targets(), 5);
    assert!(result.loss.abs() < 1e-9);
}

#[test]
fn test_zero_tolerance_stops_on_perfect_match() {
    let data = duplicated_populations();
    let config = MatcherConfig::builder()
        .max_iter(10)
        .tolerance(1e-9)
        .show_progress(false)
        .build();
    let result = PropensityScoreMatcher::new(&data, config)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(result.stop_reason, StopReason::Tolerance);
    assert_eq!(result.iterations, 1);
}

#[test]
fn test_base_objective_is_rejected() {
    let data = generate_toy_dataset(20, 10, 1).unwrap();
    let result = PropensityScoreMatcher::with_settings(&data, "base", None, 1, 10.0, "greedy");
    assert!(matches!(result, Err(MatchingError::UnknownObjective(_))));
}

#[test]
fn test_unknown_method_is_rejected() {
    let data = generate_toy_dataset(20, 10, 1).unwrap();
    let result = PropensityScoreMatcher::with_settings(&data, "smd", None, 1, 10.0, "random");
    assert!(matches!(result, Err(MatchingError::UnknownMethod(_))));
}

#[test]
fn test_grid_restricts_features() {
    let data = generate_toy_dataset(80, 20, 4).unwrap();
    let grid = HyperparameterGrid {
        features: vec![vec!["age".to_string(), "height".to_string()]],
        ..HyperparameterGrid::default()
    };
    let config = MatcherConfig::builder()
        .max_iter(4)
        .hyperparameter_grid(grid)
        .show_progress(false)
        .build();
    let result = PropensityScoreMatcher::new(&data, config)
        .unwrap()
        .run()
        .unwrap();

    for record in &result.history {
        assert!(
            record
                .hyperparameters
                .features
                .iter()
                .all(|f| f == "age" || f == "height")
        );
    }
}
