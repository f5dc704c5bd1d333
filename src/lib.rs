pub mod config;
pub mod cost;
pub mod granularity;
pub mod graph;
pub mod io;
pub mod memory;
pub mod partition;
pub mod plan;
pub mod retention;
pub mod validate;
pub mod visualization;

#[cfg(test)]
pub mod tests;

pub mod prelude {
    pub use crate::config::PlannerConfig;
    pub use crate::granularity::Granularity;
    pub use crate::graph::*;
    pub use crate::io::{ProblemFile, Solution};
    pub use crate::plan::{Plan, Planner, Subgraph};
    pub use crate::validate::{PlanError, validate_solution};
    pub use crate::visualization::ToDot;
    pub use anyhow;
    pub use petgraph;
    pub use rustc_hash::{FxHashMap, FxHashSet};
    pub use tracing;
}
