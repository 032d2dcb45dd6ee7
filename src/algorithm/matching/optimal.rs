//! Minimum-cost bipartite assignment (Hungarian / shortest augmenting path)
//!
//! Costs are absolute score distances. Pairs beyond the caliper get a
//! prohibitive cost so that the solver first maximises the number of
//! feasible pairs and then minimises their total distance; such pairs
//! are dropped from the result. With `ratio > 1` every target is
//! replicated `ratio` times before solving.
//!
//! The solver runs in O(n^2 m) time for n replicated targets and m pool
//! records and evaluates costs on the fly instead of storing the n x m
//! matrix. With thousands of targets against tens of thousands of pool
//! records one iteration takes minutes; use greedy assignment there.

use super::assignment::{Assignment, AssignmentStrategy, Constraints, MatchedPair};
use log::{debug, warn};

/// Cost-matrix size above which a slow solve is reported
pub const LARGE_PROBLEM_CELLS: usize = 10_000_000;

/// Exact linear sum assignment
///
/// Quadratic in the smaller side and linear in the larger one; see
/// [`LARGE_PROBLEM_CELLS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalAssignment;

impl AssignmentStrategy for OptimalAssignment {
    fn assign(&self, target: &[f64], pool: &[f64], constraints: &Constraints) -> Assignment {
        let ratio = constraints.ratio.max(1);
        let rows = target.len() * ratio;
        let cols = pool.len();
        if rows == 0 || cols == 0 {
            return Assignment::from_pairs(Vec::new(), target.len());
        }
        if rows.saturating_mul(cols) > LARGE_PROBLEM_CELLS {
            warn!(
                "Optimal assignment over a {rows} x {cols} cost matrix; greedy assignment is much faster at this size"
            );
        }

        // One infeasible pair outweighs any sum of feasible distances
        let max_distance = target
            .iter()
            .chain(pool)
            .fold(0.0_f64, |acc, s| acc.max(s.abs()))
            * 2.0;
        let infeasible = (rows.min(cols) as f64 + 1.0) * (max_distance + 1.0);

        let cost = |row: usize, col: usize| {
            let distance = (target[row / ratio] - pool[col]).abs();
            if constraints.allows(distance) {
                distance
            } else {
                infeasible
            }
        };

        let row_to_col: Vec<Option<usize>> = if rows <= cols {
            solve(rows, cols, cost)
        } else {
            let col_to_row = solve(cols, rows, |c, r| cost(r, c));
            let mut row_to_col = vec![None; rows];
            for (col, row) in col_to_row.into_iter().enumerate() {
                if let Some(row) = row {
                    row_to_col[row] = Some(col);
                }
            }
            row_to_col
        };

        let pairs: Vec<MatchedPair> = row_to_col
            .into_iter()
            .enumerate()
            .filter_map(|(row, col)| {
                let col = col?;
                let t = row / ratio;
                let distance = (target[t] - pool[col]).abs();
                constraints.allows(distance).then_some(MatchedPair {
                    target: t,
                    pool: col,
                    distance,
                })
            })
            .collect();

        debug!(
            "Optimal assignment: {} pairs over {} x {} cost matrix",
            pairs.len(),
            rows,
            cols
        );

        Assignment::from_pairs(pairs, target.len())
    }
}

/// Solve a rectangular assignment problem with `n <= m`
///
/// Every row receives a distinct column; returns the column of each row.
fn solve(n: usize, m: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<Option<usize>> {
    // 1-based potentials and matching; column 0 is a virtual sink
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    let mut owner = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_slack[j] {
                    min_slack[j] = reduced;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![None; n];
    for (j, &i) in owner.iter().enumerate().skip(1) {
        if i != 0 {
            row_to_col[i - 1] = Some(j - 1);
        }
    }
    row_to_col
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::matching::greedy::GreedyAssignment;

    fn assign(target: &[f64], pool: &[f64], caliper: Option<f64>, ratio: usize) -> Assignment {
        OptimalAssignment.assign(target, pool, &Constraints { caliper, ratio })
    }

    #[test]
    fn test_solve_square() {
        let costs = [[4.0, 1.0, 3.0], [2.0, 0.0, 5.0], [3.0, 2.0, 2.0]];
        let result = solve(3, 3, |i, j| costs[i][j]);
        assert_eq!(result, vec![Some(1), Some(0), Some(2)]);
    }

    #[test]
    fn test_larger_unbalanced_problem() {
        // deterministic scores spread over [0, 1)
        let target: Vec<f64> = (0..120).map(|i| (i * 37 % 120) as f64 / 120.0).collect();
        let pool: Vec<f64> = (0..900).map(|i| (i * 61 % 900) as f64 / 900.0).collect();
        let constraints = Constraints { caliper: None, ratio: 2 };

        let optimal = OptimalAssignment.assign(&target, &pool, &constraints);
        let greedy = GreedyAssignment.assign(&target, &pool, &constraints);

        assert_eq!(optimal.pairs.len(), 240);
        assert!(optimal.is_injective());
        assert!(optimal.unmatched_targets.is_empty());
        assert!(optimal.total_cost() <= greedy.total_cost() + 1e-9);
    }

    #[test]
    fn test_beats_greedy_on_crossing_case() {
        // Greedy gives 0.5 the record at 0.45, leaving 0.4 with 0.55
        let target = [0.5, 0.4];
        let pool = [0.45, 0.9, 0.55];
        let greedy = GreedyAssignment.assign(&target, &pool, &Constraints::default());
        let optimal = assign(&target, &pool, None, 1);
        assert!(optimal.total_cost() <= greedy.total_cost() + 1e-12);
        assert_eq!(optimal.pairs.len(), 2);
    }

    #[test]
    fn test_more_targets_than_pool() {
        let assignment = assign(&[0.1, 0.5, 0.9], &[0.52], None, 1);
        assert_eq!(assignment.pairs.len(), 1);
        assert_eq!(assignment.pairs[0].target, 1);
        assert_eq!(assignment.unmatched_targets, vec![0, 2]);
    }

    #[test]
    fn test_caliper_maximises_feasible_pairs() {
        let assignment = assign(&[0.3, 0.25], &[0.32, 0.6], Some(0.1), 1);
        assert_eq!(assignment.pairs.len(), 1);
        assert_eq!(assignment.unmatched_targets.len(), 1);

        // 0.3 would rather take 0.32, but then 0.25 has nothing in range
        let assignment = assign(&[0.3, 0.25], &[0.32, 0.36], Some(0.1), 1);
        assert_eq!(assignment.pairs.len(), 2);
        assert!(assignment.pairs.iter().all(|p| p.distance <= 0.1));
    }

    #[test]
    fn test_ratio_replicates_targets() {
        let assignment = assign(&[0.2, 0.8], &[0.21, 0.79, 0.19, 0.81, 0.5], None, 2);
        assert_eq!(assignment.pairs.len(), 4);
        assert!(assignment.is_injective());
        assert!(assignment.total_cost() < 0.05);
    }

    #[test]
    fn test_coincident_scores_cost_nothing() {
        let scores = [0.6, 0.2, 0.2, 0.9];
        let assignment = assign(&scores, &scores, None, 1);
        assert_eq!(assignment.pairs.len(), 4);
        assert_eq!(assignment.total_cost(), 0.0);
    }
}
