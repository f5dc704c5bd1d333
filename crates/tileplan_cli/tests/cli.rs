use std::{path::Path, process::Command};

use serde_json::{Value, json};

fn tileplan() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tileplan"))
}

fn write_problem(dir: &Path, capacity: f64) -> std::path::PathBuf {
    let path = dir.join("problem.json");
    let problem = json!({
        "widths": [4, 4, 4],
        "heights": [4, 4, 4],
        "inputs": [[0, 1]],
        "outputs": [[2]],
        "base_costs": [1.0],
        "op_types": ["MatMul"],
        "fast_memory_capacity": capacity,
        "slow_memory_bandwidth": 10,
        "native_granularity": [4, 4]
    });
    std::fs::write(&path, problem.to_string()).unwrap();
    path
}

#[test]
fn solve_then_check() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_problem(dir.path(), 1000.0);
    let output = dir.path().join("solution.json");
    let dot = dir.path().join("plan.dot");

    let status = tileplan()
        .arg("solve")
        .arg(&input)
        .arg(&output)
        .arg("--dot")
        .arg(&dot)
        .status()
        .unwrap();
    assert!(status.success());

    let solution: Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(solution["subgraphs"], json!([[0]]));
    assert_eq!(solution["granularities"], json!([[4, 4, 4]]));
    assert_eq!(solution["tensors_to_retain"], json!([[]]));
    assert_eq!(solution["traversal_orders"], json!([null]));
    let latency = solution["subgraph_latencies"][0].as_f64().unwrap();
    assert!((latency - 4.32).abs() < 1e-9);
    assert!(std::fs::read_to_string(&dot).unwrap().contains("op0 MatMul [g0]"));

    let out = tileplan().arg("check").arg(&input).arg(&output).output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("ok: 1 subgraphs"));
}

#[test]
fn infeasible_capacity_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_problem(dir.path(), 1.0);
    let output = dir.path().join("solution.json");

    let out = tileplan().arg("solve").arg(&input).arg(&output).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("violates fast memory capacity"));
    assert!(!output.exists());
}

#[test]
fn malformed_problem_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("problem.json");
    std::fs::write(
        &input,
        json!({
            "widths": [4],
            "heights": [4],
            "inputs": [[0]],
            "outputs": [[5]],
            "base_costs": [1.0],
            "op_types": ["Add"],
            "fast_memory_capacity": 100,
            "slow_memory_bandwidth": 10,
            "native_granularity": [4, 4]
        })
        .to_string(),
    )
    .unwrap();

    let out = tileplan()
        .arg("solve")
        .arg(&input)
        .arg(dir.path().join("solution.json"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("op 0 output tensor index out of range: 5")
    );
}

#[test]
fn check_rejects_partial_cover() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_problem(dir.path(), 1000.0);
    let solution = dir.path().join("solution.json");
    std::fs::write(
        &solution,
        json!({
            "subgraphs": [[0], [0]],
            "granularities": [[1, 1, 1], [1, 1, 1]],
            "tensors_to_retain": [[], []],
            "traversal_orders": [null, null],
            "subgraph_latencies": [1.0, 1.0]
        })
        .to_string(),
    )
    .unwrap();

    let out = tileplan().arg("check").arg(&input).arg(&solution).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("operation 0 must be scheduled exactly once"));
}
