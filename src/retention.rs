use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::graph::{OpId, Problem, TensorId};

/// Tensors group `index` produces that group `index + 1` reads, in production order.
///
/// Only the immediately following group is considered; a tensor read two or
/// more groups later is not retained.
pub fn retained_tensors(problem: &Problem, groups: &[Vec<OpId>], index: usize) -> Vec<TensorId> {
    let (Some(current), Some(next)) = (groups.get(index), groups.get(index + 1)) else {
        return vec![];
    };
    let next_inputs = next
        .iter()
        .flat_map(|&op| problem.op(op).inputs.iter().copied())
        .collect::<FxHashSet<_>>();
    current
        .iter()
        .flat_map(|&op| problem.op(op).outputs.iter().copied())
        .filter(|t| next_inputs.contains(t))
        .unique()
        .collect()
}
