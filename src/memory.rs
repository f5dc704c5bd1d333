//! Fast memory accounting for a group of operations.
//!
//! Only tensors crossing the edge of a group occupy fast memory. Tensors both
//! produced and consumed inside the group stay in registers between fused ops.

use rustc_hash::FxHashSet;

use crate::{
    granularity::Granularity,
    graph::{OpId, OpKind, Problem, TensorId},
};

/// Tensors crossing the edge of a group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundary {
    /// Inputs not produced by any op in the group
    pub inputs: FxHashSet<TensorId>,
    /// Outputs not consumed by any op in the group
    pub outputs: FxHashSet<TensorId>,
}

/// Every tensor some op in `group` writes
pub fn produced_within(problem: &Problem, group: &[OpId]) -> FxHashSet<TensorId> {
    group
        .iter()
        .flat_map(|&op| problem.op(op).outputs.iter().copied())
        .collect()
}

fn consumed_within(problem: &Problem, group: &[OpId]) -> FxHashSet<TensorId> {
    group
        .iter()
        .flat_map(|&op| problem.op(op).inputs.iter().copied())
        .collect()
}

pub fn boundary(problem: &Problem, group: &[OpId]) -> Boundary {
    let produced = produced_within(problem, group);
    let consumed = consumed_within(problem, group);
    Boundary {
        inputs: consumed
            .iter()
            .filter(|t| !produced.contains(*t))
            .copied()
            .collect(),
        outputs: produced
            .iter()
            .filter(|t| !consumed.contains(*t))
            .copied()
            .collect(),
    }
}

/// Elements of fast memory needed to run one tile of `group` at `granularity`.
///
/// Matmul operands are counted as `height * k` (lhs) and `width * k` (rhs) panels;
/// inputs of any other op take a full `width * height` tile each. The output side
/// holds one tile per output of the last op.
pub fn working_set_elements(problem: &Problem, group: &[OpId], granularity: Granularity) -> u64 {
    let Some(&last) = group.last() else {
        return 0;
    };
    let Granularity {
        width,
        height,
        split,
    } = granularity;
    let split = split.max(1);
    let tile = width.saturating_mul(height);
    let internal = produced_within(problem, group);

    let mut boundary_in = 0u64;
    for op in group.iter().map(|&op| problem.op(op)) {
        match op.kind {
            OpKind::MatMul => {
                let panel = |slot: usize, extent: u64| {
                    op.inputs
                        .get(slot)
                        .filter(|t| !internal.contains(*t))
                        .map_or(0, |_| extent.saturating_mul(split))
                };
                boundary_in = boundary_in
                    .saturating_add(panel(0, height))
                    .saturating_add(panel(1, width));
            }
            OpKind::Generic => {
                let external = op.inputs.iter().filter(|t| !internal.contains(*t)).count();
                boundary_in = boundary_in.saturating_add(tile.saturating_mul(external as u64));
            }
        }
    }

    let outputs = problem.op(last).outputs.len().max(1) as u64;
    boundary_in.saturating_add(tile.saturating_mul(outputs))
}

/// Whether `group` fits in fast memory at `granularity`
pub fn fits(problem: &Problem, group: &[OpId], granularity: Granularity) -> bool {
    working_set_elements(problem, group, granularity) as f64 <= problem.fast_memory_capacity
}
