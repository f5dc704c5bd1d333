//! Structural and physical checks for a finished solution.

use thiserror::Error;

use crate::{
    granularity::Granularity,
    graph::{OpId, Problem},
    io::Solution,
    memory::working_set_elements,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("solution has no subgraphs")]
    Empty,
    #[error(
        "solution parallel list length mismatch ({subgraphs} subgraphs, {granularities} granularities, {retained} retain lists, {traversal_orders} traversal orders, {latencies} latencies)"
    )]
    LengthMismatch {
        subgraphs: usize,
        granularities: usize,
        retained: usize,
        traversal_orders: usize,
        latencies: usize,
    },
    #[error("subgraph {0} has no ops")]
    EmptySubgraph(usize),
    #[error("subgraph {subgraph} has invalid granularity {granularity:?}")]
    InvalidGranularity {
        subgraph: usize,
        granularity: [i64; 3],
    },
    #[error("subgraph {subgraph} has invalid latency {latency}")]
    InvalidLatency { subgraph: usize, latency: f64 },
    #[error("subgraph {subgraph} references invalid op index {op}")]
    OpOutOfRange { subgraph: usize, op: i64 },
    #[error(
        "subgraph {subgraph} violates fast memory capacity ({required} elements needed, {capacity} available)"
    )]
    MemoryExceeded {
        subgraph: usize,
        required: u64,
        capacity: f64,
    },
    #[error("subgraph {subgraph} retains invalid tensor {tensor}")]
    RetainedOutOfRange { subgraph: usize, tensor: i64 },
    #[error("operation {op} must be scheduled exactly once (found {count})")]
    Coverage { op: OpId, count: usize },
}

/// Check `solution` against `problem` without modifying either.
///
/// Every op must appear in exactly one subgraph and every subgraph must fit in
/// fast memory at its granularity.
pub fn validate_solution(problem: &Problem, solution: &Solution) -> Result<(), PlanError> {
    let n = solution.subgraphs.len();
    if n == 0 {
        return Err(PlanError::Empty);
    }
    if solution.granularities.len() != n
        || solution.tensors_to_retain.len() != n
        || solution.traversal_orders.len() != n
        || solution.subgraph_latencies.len() != n
    {
        return Err(PlanError::LengthMismatch {
            subgraphs: n,
            granularities: solution.granularities.len(),
            retained: solution.tensors_to_retain.len(),
            traversal_orders: solution.traversal_orders.len(),
            latencies: solution.subgraph_latencies.len(),
        });
    }

    let in_range = |i: i64, len: usize| usize::try_from(i).ok().filter(|i| *i < len);
    let mut covered = vec![0usize; problem.num_ops()];
    for (subgraph, ops) in solution.subgraphs.iter().enumerate() {
        if ops.is_empty() {
            return Err(PlanError::EmptySubgraph(subgraph));
        }
        let granularity = solution.granularities[subgraph];
        if granularity.iter().any(|v| *v <= 0) {
            return Err(PlanError::InvalidGranularity {
                subgraph,
                granularity,
            });
        }
        let latency = solution.subgraph_latencies[subgraph];
        if !(latency >= 0.0) {
            return Err(PlanError::InvalidLatency { subgraph, latency });
        }

        let ops = ops
            .iter()
            .map(|&op| {
                in_range(op, problem.num_ops()).ok_or(PlanError::OpOutOfRange { subgraph, op })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for &op in &ops {
            covered[op] += 1;
        }

        let [width, height, split] = granularity.map(|v| v as u64);
        let required = working_set_elements(problem, &ops, Granularity::new(width, height, split));
        if required as f64 > problem.fast_memory_capacity {
            return Err(PlanError::MemoryExceeded {
                subgraph,
                required,
                capacity: problem.fast_memory_capacity,
            });
        }

        if let Some(&tensor) = solution.tensors_to_retain[subgraph]
            .iter()
            .find(|&&t| in_range(t, problem.num_tensors()).is_none())
        {
            return Err(PlanError::RetainedOutOfRange { subgraph, tensor });
        }
    }

    if let Some((op, &count)) = covered.iter().enumerate().find(|(_, c)| **c != 1) {
        return Err(PlanError::Coverage { op, count });
    }
    Ok(())
}
