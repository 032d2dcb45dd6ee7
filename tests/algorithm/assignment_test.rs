//! Tests for greedy and optimal assignment

use popmatch::algorithm::matching::{
    AssignmentMethod, AssignmentStrategy, Constraints, GreedyAssignment, OptimalAssignment,
};
use proptest::prelude::*;

const METHODS: [AssignmentMethod; 2] = [
    AssignmentMethod::Greedy,
    AssignmentMethod::LinearSumAssignment,
];

fn scores(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, 1..max_len)
}

/// Target and pool score vectors with at least as many pool records
fn target_and_pool() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    scores(12).prop_flat_map(|target| {
        let n = target.len();
        (Just(target), prop::collection::vec(0.0f64..1.0, n..n + 12))
    })
}

#[test]
fn test_coincident_scores_cost_nothing() {
    let target = [0.2, 0.5, 0.5, 0.9];
    let pool = [0.9, 0.5, 0.1, 0.2, 0.5];
    for method in METHODS {
        let assignment = method.assign(&target, &pool, &Constraints::default());
        assert_eq!(assignment.pairs.len(), 4, "{method}");
        assert!(assignment.total_cost().abs() < 1e-12, "{method}");
        assert!(assignment.unmatched_targets.is_empty(), "{method}");
    }
}

#[test]
fn test_caliper_leaves_distant_targets_unmatched() {
    let target = [0.1, 0.8];
    let pool = [0.12, 0.3];
    let constraints = Constraints {
        caliper: Some(0.05),
        ratio: 1,
    };
    for method in METHODS {
        let assignment = method.assign(&target, &pool, &constraints);
        assert_eq!(assignment.pairs.len(), 1, "{method}");
        assert_eq!(assignment.pairs[0].pool, 0, "{method}");
        assert_eq!(assignment.unmatched_targets, vec![1], "{method}");
        assert!(assignment.infeasibility(&constraints).is_some(), "{method}");
    }
}

#[test]
fn test_optimal_improves_on_greedy() {
    // Greedy gives 0.54 to the higher target, leaving 0.67 for 0.5
    let target = [0.6, 0.5];
    let pool = [0.54, 0.3, 0.67];
    let greedy = GreedyAssignment.assign(&target, &pool, &Constraints::default());
    let optimal = OptimalAssignment.assign(&target, &pool, &Constraints::default());

    assert!((greedy.total_cost() - 0.23).abs() < 1e-9);
    assert_eq!(greedy.pairs[0].pool, 0);
    assert_eq!(greedy.pairs[1].pool, 2);
    assert!((optimal.total_cost() - 0.11).abs() < 1e-9);
    assert_eq!(optimal.matched_pool(), vec![0, 2]);
}

#[test]
fn test_method_keys() {
    assert_eq!(
        AssignmentMethod::from_key("optimal").unwrap(),
        AssignmentMethod::LinearSumAssignment
    );
    assert_eq!(
        AssignmentMethod::from_key("greedy").unwrap(),
        AssignmentMethod::Greedy
    );
    assert!(AssignmentMethod::from_key("hungarian").is_err());
}

proptest! {
    #[test]
    fn test_optimal_total_cost_not_above_greedy((target, pool) in target_and_pool()) {
        let constraints = Constraints::default();
        let greedy = GreedyAssignment.assign(&target, &pool, &constraints);
        let optimal = OptimalAssignment.assign(&target, &pool, &constraints);

        prop_assert_eq!(greedy.pairs.len(), target.len());
        prop_assert_eq!(optimal.pairs.len(), target.len());
        prop_assert!(optimal.total_cost() <= greedy.total_cost() + 1e-9);
    }

    #[test]
    fn test_assignments_are_injective(
        target in scores(10),
        pool in scores(25),
        ratio in 1usize..4,
        caliper in prop::option::of(0.01f64..0.5),
    ) {
        let constraints = Constraints { caliper, ratio };
        for method in METHODS {
            let assignment = method.assign(&target, &pool, &constraints);
            prop_assert!(assignment.is_injective());
            prop_assert!(assignment.pairs.len() <= pool.len());

            let mut per_target = vec![0usize; target.len()];
            for pair in &assignment.pairs {
                per_target[pair.target] += 1;
                prop_assert!(constraints.allows(pair.distance));
                prop_assert!((pair.distance - (target[pair.target] - pool[pair.pool]).abs()).abs() < 1e-12);
            }
            prop_assert!(per_target.iter().all(|&n| n <= ratio));
            for t in &assignment.unmatched_targets {
                prop_assert_eq!(per_target[*t], 0);
            }
        }
    }
}
