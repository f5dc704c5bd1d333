use tracing::{debug, info};

use crate::{
    config::PlannerConfig,
    granularity::Granularity,
    graph::{OpId, Problem, TensorId},
    io::Solution,
    partition::{partition, score_group},
    retention::retained_tensors,
    validate::{PlanError, validate_solution},
};

/// A scheduled group of consecutive operations
#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub ops: Vec<OpId>,
    pub granularity: Granularity,
    /// Outputs kept in fast memory for the next subgraph
    pub retained: Vec<TensorId>,
    pub latency: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub subgraphs: Vec<Subgraph>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.subgraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subgraphs.is_empty()
    }

    pub fn total_latency(&self) -> f64 {
        self.subgraphs.iter().map(|s| s.latency).sum()
    }

    /// Index of the subgraph scheduling `op`
    pub fn subgraph_of(&self, op: OpId) -> Option<usize> {
        self.subgraphs.iter().position(|s| s.ops.contains(&op))
    }

    pub fn to_solution(&self) -> Solution {
        Solution::from(self)
    }

    pub fn validate(&self, problem: &Problem) -> Result<(), PlanError> {
        validate_solution(problem, &self.to_solution())
    }
}

/// Computes execution plans for a problem
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    problem: &'a Problem,
    config: PlannerConfig,
}

impl<'a> Planner<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Self {
            problem,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Partition the ops, then size, cost and link every subgraph
    #[tracing::instrument(skip_all)]
    pub fn plan(&self) -> Plan {
        let groups = partition(self.problem, &self.config);
        let subgraphs = groups
            .iter()
            .enumerate()
            .map(|(i, ops)| {
                let (granularity, latency) = score_group(self.problem, ops, &self.config);
                let retained = retained_tensors(self.problem, &groups, i);
                debug!(
                    subgraph = i,
                    ?ops,
                    %granularity,
                    latency,
                    ?retained,
                    "planned subgraph"
                );
                Subgraph {
                    ops: ops.clone(),
                    granularity,
                    retained,
                    latency,
                }
            })
            .collect::<Vec<_>>();
        let plan = Plan { subgraphs };
        info!(
            subgraphs = plan.len(),
            total_latency = plan.total_latency(),
            "plan ready"
        );
        plan
    }

    /// Plan and validate. Any validation failure aborts; nothing is repaired.
    pub fn solve(&self) -> Result<Plan, PlanError> {
        let plan = self.plan();
        plan.validate(self.problem)?;
        Ok(plan)
    }
}
