//! Roofline latency model for a tiled subgraph.
//!
//! A subgraph runs as a sequence of identical steps, one per output tile and
//! reduction chunk. Each step is bound by whichever of compute and slow memory
//! traffic takes longer.

use crate::{
    config::PlannerConfig,
    granularity::Granularity,
    graph::{OpId, Problem, Tensor},
    memory::boundary,
};

fn ceil_div(a: u64, b: u64) -> u64 {
    a.div_ceil(b.max(1))
}

/// Per-step costs of a subgraph at a given granularity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyBreakdown {
    pub steps: u64,
    pub compute_per_step: f64,
    pub memory_per_step: f64,
}

impl LatencyBreakdown {
    pub fn step_latency(&self) -> f64 {
        self.compute_per_step.max(self.memory_per_step)
    }

    pub fn total(&self) -> f64 {
        self.steps as f64 * self.step_latency()
    }

    pub fn memory_bound(&self) -> bool {
        self.memory_per_step > self.compute_per_step
    }
}

/// Elements of `tensor` touched by one `granularity` tile
pub fn tile_elements(tensor: &Tensor, granularity: Granularity) -> u64 {
    let w = granularity.width.max(1).min(tensor.width);
    let h = granularity.height.max(1).min(tensor.height);
    w.saturating_mul(h).max(1)
}

/// Number of reduction chunks the widest matmul in `group` needs at `split`
pub fn reduction_steps(problem: &Problem, group: &[OpId], split: u64) -> u64 {
    group
        .iter()
        .filter_map(|&op| problem.op(op).matmul_lhs())
        .map(|lhs| ceil_div(problem.tensor(lhs).width, split))
        .fold(1, u64::max)
}

pub fn latency_breakdown(
    problem: &Problem,
    group: &[OpId],
    granularity: Granularity,
    config: &PlannerConfig,
) -> LatencyBreakdown {
    let Some(&last) = group.last() else {
        return LatencyBreakdown {
            steps: 0,
            compute_per_step: 0.0,
            memory_per_step: 0.0,
        };
    };

    let (tiles_w, tiles_h) = match problem.op(last).outputs.first() {
        Some(&out) => {
            let out = problem.tensor(out);
            (
                ceil_div(out.width, granularity.width),
                ceil_div(out.height, granularity.height),
            )
        }
        None => (1, 1),
    };
    let steps = tiles_w
        .saturating_mul(tiles_h)
        .saturating_mul(reduction_steps(problem, group, granularity.split))
        .max(1);

    let compute_per_step = group.iter().map(|&op| problem.op(op).base_cost).sum::<f64>();

    let boundary = boundary(problem, group);
    let elements = boundary
        .inputs
        .iter()
        .chain(boundary.outputs.iter())
        .map(|&t| tile_elements(problem.tensor(t), granularity))
        .fold(0u64, u64::saturating_add);
    let mut memory_per_step = elements.max(1) as f64 / problem.slow_memory_bandwidth;
    if granularity.split > 1 {
        memory_per_step *= config.split_discount;
    }

    LatencyBreakdown {
        steps,
        compute_per_step,
        memory_per_step,
    }
}

/// Estimated wall time of `group` at `granularity`
pub fn estimate_latency(
    problem: &Problem,
    group: &[OpId],
    granularity: Granularity,
    config: &PlannerConfig,
) -> f64 {
    latency_breakdown(problem, group, granularity, config).total()
}
