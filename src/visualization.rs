use std::fmt::Display;

use anyhow::Result;
use petgraph::{dot::Dot, stable_graph::StableGraph};

use crate::{graph::Problem, plan::Plan};

pub trait ToDot {
    fn to_dot(&self) -> Result<String>;
}

/// Implements `ToDot` for [`DataflowGraph`](crate::graph::DataflowGraph) and [`PlanGraph`]
impl<N, E> ToDot for StableGraph<N, E>
where
    N: Display,
    E: Display,
{
    fn to_dot(&self) -> Result<String> {
        Ok(Dot::with_config(self, &[]).to_string())
    }
}

/// Dataflow graph with human readable labels: nodes are `op{i} {kind} [g{subgraph}]`,
/// edges carry the tensor they move.
pub type PlanGraph = StableGraph<String, String>;

impl Plan {
    pub fn graph(&self, problem: &Problem) -> PlanGraph {
        problem.dataflow().map(
            |_, &op| {
                let subgraph = self
                    .subgraph_of(op)
                    .map(|s| format!(" [g{s}]"))
                    .unwrap_or_default();
                format!("op{op} {}{subgraph}", problem.op(op).kind)
            },
            |_, &tensor| format!("t{tensor}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::OpKind, plan::Planner};

    #[test]
    fn plan_dot_labels() {
        let mut b = Problem::builder(1e6, 1e9, (8, 8));
        let (x, w, y, z) = (b.tensor(8, 8), b.tensor(8, 8), b.tensor(8, 8), b.tensor(8, 8));
        b.op(OpKind::MatMul, [x, w], [y], 1.0);
        b.op(OpKind::Generic, [y], [z], 1.0);
        let p = b.build().unwrap();
        let plan = Planner::new(&p).plan();

        let dot = plan.graph(&p).to_dot().unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("op0 MatMul [g0]"));
        assert!(dot.contains("op1 Generic [g1]"));
        assert!(dot.contains("t2"));
    }
}
