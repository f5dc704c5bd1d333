//! tileplan - subgraph and tile granularity planner
//!
//! # Commands
//!
//! - `solve` - Plan a problem and write the solution
//! - `check` - Validate an existing solution against its problem

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tileplan::{
    io::{read_problem, read_solution, write_solution},
    prelude::*,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tileplan")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Tracing filter directives
    #[arg(long, global = true, env = "TILEPLAN_LOG", default_value = tileplan_tracing::DEFAULT_FILTER)]
    log: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a problem and write the solution
    ///
    /// Example:
    ///   tileplan solve problem.json solution.json
    Solve {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Planner config (JSON). Flags override its values
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Largest number of consecutive ops fused into one subgraph
        #[arg(long)]
        max_group_size: Option<usize>,

        /// Also write the planned dataflow graph in Graphviz format
        #[arg(long, value_name = "PATH")]
        dot: Option<PathBuf>,
    },
    /// Validate an existing solution against its problem
    Check {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "SOLUTION")]
        solution: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut trace = tileplan_tracing::subscriber().env_filter(&cli.log);
    if let Some(path) = &cli.log_file {
        trace = trace.log_file(path);
    }
    let _session = match trace.init() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: tracing setup: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Solve {
            input,
            output,
            config,
            max_group_size,
            dot,
        } => {
            let mut planner_config = match config {
                Some(path) => PlannerConfig::load(path)?,
                None => PlannerConfig::default(),
            };
            if let Some(max_group_size) = max_group_size {
                planner_config = planner_config.max_group_size(max_group_size);
            }

            let problem = read_problem(&input)?;
            info!(
                ops = problem.num_ops(),
                tensors = problem.num_tensors(),
                "loaded {}",
                input.display()
            );
            let plan = Planner::new(&problem)
                .with_config(planner_config)
                .solve()
                .context("invalid plan")?;
            write_solution(&output, &plan.to_solution())?;
            if let Some(path) = dot {
                let graph = plan.graph(&problem).to_dot()?;
                std::fs::write(&path, graph)
                    .with_context(|| format!("write graph {}", path.display()))?;
            }
            info!("wrote {}", output.display());
        }
        Commands::Check { input, solution } => {
            let problem = read_problem(&input)?;
            let solution = read_solution(&solution)?;
            validate_solution(&problem, &solution).context("invalid solution")?;
            println!(
                "ok: {} subgraphs, total latency {}",
                solution.subgraphs.len(),
                solution.subgraph_latencies.iter().sum::<f64>()
            );
        }
    }
    Ok(())
}
