use std::fmt::Display;

use tracing::trace;

use crate::{
    config::PlannerConfig,
    graph::{OpId, Problem, TensorId},
    memory::fits,
};

/// How a subgraph's computation is chunked: a `width` x `height` output tile,
/// with the reduction dimension of matmuls consumed `split` elements at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Granularity {
    pub width: u64,
    pub height: u64,
    pub split: u64,
}

impl Granularity {
    pub const UNIT: Granularity = Granularity::new(1, 1, 1);

    pub const fn new(width: u64, height: u64, split: u64) -> Self {
        Self {
            width,
            height,
            split,
        }
    }

    pub fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }

    pub fn to_array(self) -> [u64; 3] {
        [self.width, self.height, self.split]
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.width, self.height, self.split)
    }
}

/// Powers of two from the largest one `<= max` down to 1
pub fn descending_powers_of_two(max: u64) -> Vec<u64> {
    if max <= 1 {
        return vec![1];
    }
    let top = 1u64 << (63 - max.leading_zeros());
    std::iter::successors(Some(top), |v| (*v > 1).then_some(v / 2)).collect()
}

/// The largest first output among the ops of `group`. Earlier ops win ties.
pub fn representative_output(problem: &Problem, group: &[OpId]) -> Option<TensorId> {
    group
        .iter()
        .filter_map(|&op| problem.op(op).outputs.first().copied())
        .fold(None, |best: Option<TensorId>, t| match best {
            Some(b) if problem.tensor(t).area() <= problem.tensor(b).area() => Some(b),
            _ => Some(t),
        })
}

/// Reduction split for `group`: the widest matmul lhs, capped at `cap`. 1 without matmuls.
pub fn reduction_split(problem: &Problem, group: &[OpId], cap: u64) -> u64 {
    group
        .iter()
        .filter_map(|&op| problem.op(op).matmul_lhs())
        .map(|lhs| problem.tensor(lhs).width.min(cap))
        .fold(1, u64::max)
}

/// Pick the largest-area power-of-two tile for `group` that still fits in fast memory.
///
/// Tiles are bounded by the native granularity and by the group's largest output.
/// Falls back to [`Granularity::UNIT`] when no tile larger than 1x1 fits.
pub fn select_granularity(
    problem: &Problem,
    group: &[OpId],
    config: &PlannerConfig,
) -> Granularity {
    if group.is_empty() {
        return Granularity::UNIT;
    }
    let (native_w, native_h) = problem.native_granularity;
    let (max_w, max_h) = match representative_output(problem, group) {
        Some(t) => {
            let t = problem.tensor(t);
            (native_w.min(t.width), native_h.min(t.height))
        }
        None => (native_w, native_h),
    };
    let split = reduction_split(problem, group, config.reduction_cap);
    let heights = descending_powers_of_two(max_h.max(1));

    let mut best = Granularity::UNIT;
    for width in descending_powers_of_two(max_w.max(1)) {
        for &height in &heights {
            let candidate = Granularity::new(width, height, split);
            if candidate.area() > best.area() && fits(problem, group, candidate) {
                best = candidate;
            }
        }
    }
    trace!(?group, %best, "selected granularity");
    best
}
