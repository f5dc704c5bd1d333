use std::fmt::Display;

use itertools::Itertools;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use thiserror::Error;

pub type TensorId = usize;
pub type OpId = usize;

/// Dataflow view of a problem: one node per operation (node index == op index),
/// one edge per tensor flowing from its producer to a consumer.
pub type DataflowGraph = StableGraph<OpId, TensorId>;

/// Operation kinds the cost model distinguishes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OpKind {
    /// Two-operand matrix multiply. The first input is the left-hand side,
    /// whose width is the reduction extent.
    MatMul,
    /// Elementwise or any other op
    #[default]
    Generic,
}

impl OpKind {
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("matmul") {
            OpKind::MatMul
        } else {
            OpKind::Generic
        }
    }

    pub fn is_matmul(&self) -> bool {
        matches!(self, OpKind::MatMul)
    }
}

impl Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A 2D element grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tensor {
    pub width: u64,
    pub height: u64,
}

impl Tensor {
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub kind: OpKind,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
    /// Time for one full (untiled) evaluation
    pub base_cost: f64,
}

impl Operation {
    /// Left-hand operand of a matmul. `None` for every other kind.
    pub fn matmul_lhs(&self) -> Option<TensorId> {
        match self.kind {
            OpKind::MatMul => self.inputs.first().copied(),
            OpKind::Generic => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("problem has no operations")]
    NoOperations,
    #[error(
        "inputs/outputs/base_costs/op_types length mismatch ({op_types} op types, {inputs} inputs, {outputs} outputs, {base_costs} base costs)"
    )]
    OpArrayMismatch {
        op_types: usize,
        inputs: usize,
        outputs: usize,
        base_costs: usize,
    },
    #[error("widths/heights length mismatch ({widths} widths, {heights} heights)")]
    TensorArrayMismatch { widths: usize, heights: usize },
    #[error("slow_memory_bandwidth must be > 0 (got {0})")]
    Bandwidth(f64),
    #[error("fast_memory_capacity must be > 0 (got {0})")]
    Capacity(f64),
    #[error("native_granularity entries must be > 0 (got [{width}, {height}])")]
    NativeGranularity { width: i64, height: i64 },
    #[error("tensor {tensor} has non-positive shape {width}x{height}")]
    TensorShape {
        tensor: TensorId,
        width: i64,
        height: i64,
    },
    #[error("op {op} has invalid base cost {cost}")]
    BaseCost { op: OpId, cost: f64 },
    #[error("op {op} input tensor index out of range: {tensor}")]
    InputOutOfRange { op: OpId, tensor: i64 },
    #[error("op {op} output tensor index out of range: {tensor}")]
    OutputOutOfRange { op: OpId, tensor: i64 },
}

/// An immutable scheduling problem: tensors, operations in execution order and
/// the two-level memory hierarchy they run on.
#[derive(Clone, Debug)]
pub struct Problem {
    tensors: Vec<Tensor>,
    ops: Vec<Operation>,
    producers: Vec<Vec<OpId>>,
    consumers: Vec<Vec<OpId>>,
    /// Fast memory size in elements
    pub fast_memory_capacity: f64,
    /// Slow memory bandwidth in elements per unit time
    pub slow_memory_bandwidth: f64,
    /// Largest (width, height) tile the hardware addresses natively
    pub native_granularity: (u64, u64),
}

impl Problem {
    /// Build a problem, rejecting malformed input before any planning happens.
    pub fn new(
        tensors: Vec<Tensor>,
        ops: Vec<Operation>,
        fast_memory_capacity: f64,
        slow_memory_bandwidth: f64,
        native_granularity: (u64, u64),
    ) -> Result<Self, ProblemError> {
        if ops.is_empty() {
            return Err(ProblemError::NoOperations);
        }
        if !(slow_memory_bandwidth > 0.0) {
            return Err(ProblemError::Bandwidth(slow_memory_bandwidth));
        }
        if !(fast_memory_capacity > 0.0) {
            return Err(ProblemError::Capacity(fast_memory_capacity));
        }
        if native_granularity.0 == 0 || native_granularity.1 == 0 {
            return Err(ProblemError::NativeGranularity {
                width: native_granularity.0 as i64,
                height: native_granularity.1 as i64,
            });
        }
        if let Some((tensor, t)) = tensors
            .iter()
            .find_position(|t| t.width == 0 || t.height == 0)
        {
            return Err(ProblemError::TensorShape {
                tensor,
                width: t.width as i64,
                height: t.height as i64,
            });
        }

        let mut producers = vec![vec![]; tensors.len()];
        let mut consumers = vec![vec![]; tensors.len()];
        for (id, op) in ops.iter().enumerate() {
            if !op.base_cost.is_finite() || op.base_cost < 0.0 {
                return Err(ProblemError::BaseCost {
                    op: id,
                    cost: op.base_cost,
                });
            }
            for &t in op.inputs.iter().unique() {
                let Some(c) = consumers.get_mut(t) else {
                    return Err(ProblemError::InputOutOfRange {
                        op: id,
                        tensor: t as i64,
                    });
                };
                c.push(id);
            }
            for &t in op.outputs.iter().unique() {
                let Some(p) = producers.get_mut(t) else {
                    return Err(ProblemError::OutputOutOfRange {
                        op: id,
                        tensor: t as i64,
                    });
                };
                p.push(id);
            }
        }

        Ok(Self {
            tensors,
            ops,
            producers,
            consumers,
            fast_memory_capacity,
            slow_memory_bandwidth,
            native_granularity,
        })
    }

    pub fn builder(
        fast_memory_capacity: f64,
        slow_memory_bandwidth: f64,
        native_granularity: (u64, u64),
    ) -> ProblemBuilder {
        ProblemBuilder::new(
            fast_memory_capacity,
            slow_memory_bandwidth,
            native_granularity,
        )
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.tensors
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn tensor(&self, id: TensorId) -> &Tensor {
        &self.tensors[id]
    }

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id]
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    /// Operations listing `tensor` among their outputs, in execution order
    pub fn producers(&self, tensor: TensorId) -> &[OpId] {
        &self.producers[tensor]
    }

    /// Operations listing `tensor` among their inputs, in execution order
    pub fn consumers(&self, tensor: TensorId) -> &[OpId] {
        &self.consumers[tensor]
    }

    /// Build the op-level dataflow graph
    pub fn dataflow(&self) -> DataflowGraph {
        let mut graph = StableGraph::with_capacity(self.ops.len(), self.tensors.len());
        let nodes = (0..self.ops.len())
            .map(|op| graph.add_node(op))
            .collect::<Vec<NodeIndex>>();
        for (op, operation) in self.ops.iter().enumerate() {
            for &t in operation.outputs.iter().unique() {
                for &consumer in self.consumers(t).iter().filter(|c| **c != op) {
                    graph.add_edge(nodes[op], nodes[consumer], t);
                }
            }
        }
        graph
    }
}

/// Incrementally assemble a [`Problem`]
///
/// ```rust
/// # use tileplan::prelude::*;
/// let mut b = Problem::builder(1000.0, 10.0, (4, 4));
/// let x = b.tensor(4, 4);
/// let y = b.tensor(4, 4);
/// b.op(OpKind::Generic, [x], [y], 1.0);
/// let problem = b.build().unwrap();
/// assert_eq!(problem.num_ops(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    tensors: Vec<Tensor>,
    ops: Vec<Operation>,
    fast_memory_capacity: f64,
    slow_memory_bandwidth: f64,
    native_granularity: (u64, u64),
}

impl ProblemBuilder {
    pub fn new(
        fast_memory_capacity: f64,
        slow_memory_bandwidth: f64,
        native_granularity: (u64, u64),
    ) -> Self {
        Self {
            tensors: vec![],
            ops: vec![],
            fast_memory_capacity,
            slow_memory_bandwidth,
            native_granularity,
        }
    }

    /// Add a tensor and get back its index
    pub fn tensor(&mut self, width: u64, height: u64) -> TensorId {
        self.tensors.push(Tensor::new(width, height));
        self.tensors.len() - 1
    }

    /// Append an operation to the execution order and get back its index
    pub fn op(
        &mut self,
        kind: OpKind,
        inputs: impl IntoIterator<Item = TensorId>,
        outputs: impl IntoIterator<Item = TensorId>,
        base_cost: f64,
    ) -> OpId {
        self.ops.push(Operation {
            kind,
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
            base_cost,
        });
        self.ops.len() - 1
    }

    pub fn build(self) -> Result<Problem, ProblemError> {
        Problem::new(
            self.tensors,
            self.ops,
            self.fast_memory_capacity,
            self.slow_memory_bandwidth,
            self.native_granularity,
        )
    }
}
