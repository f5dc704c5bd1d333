//! JSON interchange records for problems and solutions.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    graph::{OpKind, Operation, Problem, ProblemError, Tensor, TensorId},
    plan::Plan,
};

/// A problem as it appears on disk. Integers are signed so malformed values
/// reach validation instead of failing in the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFile {
    pub widths: Vec<i64>,
    pub heights: Vec<i64>,
    pub inputs: Vec<Vec<i64>>,
    pub outputs: Vec<Vec<i64>>,
    pub base_costs: Vec<f64>,
    pub op_types: Vec<String>,
    pub fast_memory_capacity: f64,
    pub slow_memory_bandwidth: f64,
    pub native_granularity: [i64; 2],
}

impl TryFrom<ProblemFile> for Problem {
    type Error = ProblemError;

    fn try_from(file: ProblemFile) -> Result<Self, Self::Error> {
        let n = file.op_types.len();
        if n == 0 {
            return Err(ProblemError::NoOperations);
        }
        if file.inputs.len() != n || file.outputs.len() != n || file.base_costs.len() != n {
            return Err(ProblemError::OpArrayMismatch {
                op_types: n,
                inputs: file.inputs.len(),
                outputs: file.outputs.len(),
                base_costs: file.base_costs.len(),
            });
        }
        if file.widths.len() != file.heights.len() {
            return Err(ProblemError::TensorArrayMismatch {
                widths: file.widths.len(),
                heights: file.heights.len(),
            });
        }
        if !(file.slow_memory_bandwidth > 0.0) {
            return Err(ProblemError::Bandwidth(file.slow_memory_bandwidth));
        }
        if !(file.fast_memory_capacity > 0.0) {
            return Err(ProblemError::Capacity(file.fast_memory_capacity));
        }
        let [native_w, native_h] = file.native_granularity;
        if native_w <= 0 || native_h <= 0 {
            return Err(ProblemError::NativeGranularity {
                width: native_w,
                height: native_h,
            });
        }

        let tensors = file
            .widths
            .iter()
            .zip(&file.heights)
            .enumerate()
            .map(|(tensor, (&width, &height))| {
                if width <= 0 || height <= 0 {
                    return Err(ProblemError::TensorShape {
                        tensor,
                        width,
                        height,
                    });
                }
                Ok(Tensor::new(width as u64, height as u64))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let in_range = |t: i64| {
            usize::try_from(t)
                .ok()
                .filter(|t| *t < tensors.len())
        };
        let mut ops = Vec::with_capacity(n);
        for (op, (((kind, inputs), outputs), &base_cost)) in file
            .op_types
            .iter()
            .zip(&file.inputs)
            .zip(&file.outputs)
            .zip(&file.base_costs)
            .enumerate()
        {
            let inputs = inputs
                .iter()
                .map(|&t| in_range(t).ok_or(ProblemError::InputOutOfRange { op, tensor: t }))
                .collect::<Result<Vec<TensorId>, _>>()?;
            let outputs = outputs
                .iter()
                .map(|&t| in_range(t).ok_or(ProblemError::OutputOutOfRange { op, tensor: t }))
                .collect::<Result<Vec<TensorId>, _>>()?;
            ops.push(Operation {
                kind: OpKind::parse(kind),
                inputs,
                outputs,
                base_cost,
            });
        }

        Problem::new(
            tensors,
            ops,
            file.fast_memory_capacity,
            file.slow_memory_bandwidth,
            (native_w as u64, native_h as u64),
        )
    }
}

/// A plan as it appears on disk: parallel per-subgraph lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub subgraphs: Vec<Vec<i64>>,
    pub granularities: Vec<[i64; 3]>,
    pub tensors_to_retain: Vec<Vec<i64>>,
    pub traversal_orders: Vec<Option<Vec<i64>>>,
    pub subgraph_latencies: Vec<f64>,
}

fn ids(v: &[usize]) -> Vec<i64> {
    v.iter().map(|&i| i as i64).collect()
}

impl From<&Plan> for Solution {
    fn from(plan: &Plan) -> Self {
        Self {
            subgraphs: plan.subgraphs.iter().map(|s| ids(&s.ops)).collect(),
            granularities: plan
                .subgraphs
                .iter()
                .map(|s| s.granularity.to_array().map(|v| v as i64))
                .collect(),
            tensors_to_retain: plan.subgraphs.iter().map(|s| ids(&s.retained)).collect(),
            traversal_orders: vec![None; plan.subgraphs.len()],
            subgraph_latencies: plan.subgraphs.iter().map(|s| s.latency).collect(),
        }
    }
}

pub fn read_problem_file(path: impl AsRef<Path>) -> Result<ProblemFile> {
    let path = path.as_ref();
    let json =
        std::fs::read_to_string(path).with_context(|| format!("read input {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parse input JSON {}", path.display()))
}

/// Read and validate a problem
pub fn read_problem(path: impl AsRef<Path>) -> Result<Problem> {
    Ok(Problem::try_from(read_problem_file(path)?)?)
}

pub fn read_solution(path: impl AsRef<Path>) -> Result<Solution> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read solution {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parse solution JSON {}", path.display()))
}

/// Write a solution as pretty JSON with a trailing newline
pub fn write_solution(path: impl AsRef<Path>, solution: &Solution) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(solution).context("marshal solution")?;
    json.push('\n');
    std::fs::write(path, json).with_context(|| format!("write solution {}", path.display()))
}
