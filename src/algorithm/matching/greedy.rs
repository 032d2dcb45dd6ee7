//! Greedy nearest-neighbour assignment
//!
//! Targets are visited in descending score order (the records that look
//! most unlike the pool go first, while the pool is still full). Each
//! target takes the nearest available pool record by absolute distance;
//! equal distances go to the smaller pool position.

use super::assignment::{Assignment, AssignmentStrategy, Constraints, MatchedPair};
use std::collections::BTreeSet;

/// Pool scores sorted for nearest-neighbour lookup
///
/// Positions are ordered by (score, original position); `available`
/// holds the sorted ranks that have not been used yet.
#[derive(Debug)]
struct PoolIndex {
    scores: Vec<f64>,
    positions: Vec<usize>,
    available: BTreeSet<usize>,
}

impl PoolIndex {
    fn new(pool: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..pool.len()).collect();
        order.sort_by(|&a, &b| pool[a].total_cmp(&pool[b]).then(a.cmp(&b)));

        Self {
            scores: order.iter().map(|&i| pool[i]).collect(),
            positions: order,
            available: (0..pool.len()).collect(),
        }
    }

    /// First rank with score >= `score`
    fn lower_bound(&self, score: f64) -> usize {
        self.scores.partition_point(|s| s.total_cmp(&score).is_lt())
    }

    /// Nearest available rank to `score` and its distance
    fn nearest(&self, score: f64) -> Option<(usize, f64)> {
        let split = self.lower_bound(score);

        let above = self
            .available
            .range(split..)
            .next()
            .map(|&rank| (rank, self.scores[rank] - score));

        // The closest lower score may be shared by several ranks; take the
        // first available one so the smallest position wins.
        let below = self.available.range(..split).next_back().and_then(|&rank| {
            let first_equal = self.lower_bound(self.scores[rank]);
            self.available
                .range(first_equal..)
                .next()
                .map(|&r| (r, score - self.scores[r]))
        });

        match (below, above) {
            (Some(b), Some(a)) => {
                let pick_below = b.1 < a.1
                    || (b.1 == a.1 && self.positions[b.0] < self.positions[a.0]);
                Some(if pick_below { b } else { a })
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }

    fn take(&mut self, rank: usize) -> usize {
        self.available.remove(&rank);
        self.positions[rank]
    }

    fn is_exhausted(&self) -> bool {
        self.available.is_empty()
    }
}

/// Target positions in descending score order, ties by position
pub(super) fn priority_order(target: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..target.len()).collect();
    order.sort_by(|&a, &b| target[b].total_cmp(&target[a]).then(a.cmp(&b)));
    order
}

/// Greedy nearest-neighbour strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAssignment;

impl AssignmentStrategy for GreedyAssignment {
    fn assign(&self, target: &[f64], pool: &[f64], constraints: &Constraints) -> Assignment {
        let mut index = PoolIndex::new(pool);
        let mut pairs = Vec::with_capacity(target.len().min(pool.len()) * constraints.ratio);

        'targets: for t in priority_order(target) {
            for _ in 0..constraints.ratio {
                if index.is_exhausted() {
                    break 'targets;
                }
                match index.nearest(target[t]) {
                    Some((rank, distance)) if constraints.allows(distance) => {
                        let pool_position = index.take(rank);
                        pairs.push(MatchedPair {
                            target: t,
                            pool: pool_position,
                            distance,
                        });
                    }
                    _ => break,
                }
            }
        }

        Assignment::from_pairs(pairs, target.len())
    }
}
