//! Contiguous subgraph partitioning.
//!
//! Total latency is additive over subgraphs, so the best partition of the first
//! `e` ops is the best partition of some shorter prefix plus one trailing group.
//! This is a shortest path over prefix lengths with edges of at most
//! `max_group_size` ops.

use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    config::PlannerConfig,
    cost::estimate_latency,
    granularity::{Granularity, select_granularity},
    graph::{OpId, Problem},
};

/// Best granularity for `group` and the latency it achieves
pub fn score_group(
    problem: &Problem,
    group: &[OpId],
    config: &PlannerConfig,
) -> (Granularity, f64) {
    let granularity = select_granularity(problem, group, config);
    let latency = estimate_latency(problem, group, granularity, config);
    (granularity, latency)
}

/// Ops `start..end` as a group
pub fn contiguous(start: OpId, end: OpId) -> Vec<OpId> {
    (start..end).collect()
}

/// One op per group
pub fn singletons(problem: &Problem) -> Vec<Vec<OpId>> {
    (0..problem.num_ops()).map(|op| vec![op]).collect()
}

/// Split the op sequence into contiguous groups minimizing total estimated latency.
///
/// Ties keep the first candidate found, i.e. the smallest trailing group.
#[tracing::instrument(skip_all, fields(ops = problem.num_ops(), max_group_size = config.max_group_size))]
pub fn partition(problem: &Problem, config: &PlannerConfig) -> Vec<Vec<OpId>> {
    let n = problem.num_ops();
    let mut best = vec![f64::INFINITY; n + 1];
    let mut prev: Vec<Option<OpId>> = vec![None; n + 1];
    best[0] = 0.0;

    for end in 1..=n {
        for size in 1..=config.max_group_size.min(end) {
            let start = end - size;
            let group = contiguous(start, end);
            let (granularity, latency) = score_group(problem, &group, config);
            let total = best[start] + latency;
            trace!(start, end, %granularity, latency, total, "scored group");
            if total < best[end] {
                best[end] = total;
                prev[end] = Some(start);
            }
        }
    }

    if prev[n].is_none() {
        debug!("no partition found, falling back to singleton groups");
        return singletons(problem);
    }

    let mut groups = vec![];
    let mut end = n;
    while let Some(start) = prev[end] {
        groups.push(contiguous(start, end));
        end = start;
    }
    groups.reverse();
    debug!(
        groups = groups.len(),
        total_latency = best[n],
        sizes = ?groups.iter().map(Vec::len).collect_vec(),
        "partitioned ops"
    );
    groups
}

/// Sum of scored latencies over `groups`
pub fn total_latency(problem: &Problem, groups: &[Vec<OpId>], config: &PlannerConfig) -> f64 {
    groups
        .iter()
        .map(|group| score_group(problem, group, config).1)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OpKind;

    /// A chain of generic ops where every intermediate is read by the next op only
    fn chain(n: usize, capacity: f64, bandwidth: f64, cost: f64) -> Problem {
        let mut b = Problem::builder(capacity, bandwidth, (8, 8));
        let mut prev = b.tensor(8, 8);
        for _ in 0..n {
            let next = b.tensor(8, 8);
            b.op(OpKind::Generic, [prev], [next], cost);
            prev = next;
        }
        b.build().unwrap()
    }

    #[test]
    fn covers_every_op_once() {
        let p = chain(7, 1e6, 1.0, 0.1);
        let groups = partition(&p, &PlannerConfig::default());
        assert_eq!(groups.concat(), (0..7).collect_vec());
        assert!(groups.iter().all(|g| !g.is_empty() && g.len() <= 4));
    }

    #[test]
    fn fuses_memory_bound_chain() {
        // memory bound: fusing removes intermediate traffic
        let p = chain(4, 1e6, 1.0, 0.0);
        let groups = partition(&p, &PlannerConfig::default());
        assert_eq!(groups, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn respects_max_group_size() {
        let p = chain(5, 1e6, 1.0, 0.0);
        let groups = partition(&p, &PlannerConfig::default().max_group_size(2));
        assert!(groups.iter().all(|g| g.len() <= 2));
        assert_eq!(groups.concat(), (0..5).collect_vec());
    }

    #[test]
    fn compute_bound_ties_prefer_small_groups() {
        // compute bound and a single step per group: every partition costs the same
        let p = chain(3, 1e6, 1e9, 1.0);
        let groups = partition(&p, &PlannerConfig::default());
        assert_eq!(groups, singletons(&p));
    }

    #[test]
    fn zero_window_falls_back_to_singletons() {
        let p = chain(3, 1e6, 1.0, 1.0);
        let groups = partition(&p, &PlannerConfig::default().max_group_size(0));
        assert_eq!(groups, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn never_worse_than_singletons() {
        let p = chain(6, 300.0, 2.0, 0.5);
        let config = PlannerConfig::default();
        let groups = partition(&p, &config);
        assert!(
            total_latency(&p, &groups, &config) <= total_latency(&p, &singletons(&p), &config)
        );
    }
}
