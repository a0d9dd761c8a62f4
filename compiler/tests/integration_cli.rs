// Integration tests for the `nmc` binary.
//
// Locks exit codes, the `--emit` targets and `--stop-after` parsing.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn nmc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nmc"))
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run_nmc(args: &[&str]) -> Output {
    Command::new(nmc_binary())
        .args(args)
        .env("NMC_LOG", "warn")
        .output()
        .expect("failed to run nmc")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "nmc failed\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("non-UTF8 output")
}

#[test]
fn emit_elements_is_json_records() {
    let path = fixture("value_output.json");
    let out = stdout_of(&run_nmc(&[path.to_str().unwrap()]));
    let records: serde_json::Value = serde_json::from_str(&out).expect("valid JSON");
    let records = records.as_array().expect("array of records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], "VALUE");
    assert_eq!(records[0]["param_values"][0], "0.5");
    assert_eq!(records[1]["id"], "OUTPUT");
    assert_eq!(records[1]["inputs"][0], records[0]["outputs"][0]);
}

#[test]
fn emit_dot_renders_graph() {
    let path = fixture("texture_merge.json");
    let out = stdout_of(&run_nmc(&["--emit", "dot", path.to_str().unwrap()]));
    assert!(out.starts_with("digraph nmc {"));
    assert!(out.contains("TEXTURE_COLOR2"));
}

#[test]
fn emit_graph_after_build_keeps_dead_nodes() {
    let path = fixture("material.json");
    let out = stdout_of(&run_nmc(&[
        "--emit",
        "graph",
        "--stop-after",
        "build",
        path.to_str().unwrap(),
    ]));
    assert!(out.starts_with("Graph (4 nodes, 2 edges)"), "got:\n{out}");
    assert!(out.contains("'Unused'"));
}

#[test]
fn emit_summary_lists_every_pass() {
    let path = fixture("vertex_color.json");
    let out = stdout_of(&run_nmc(&["--emit", "summary", path.to_str().unwrap()]));
    for pass in [
        "build",
        "complete-edges",
        "prune",
        "rewrite",
        "fix-links",
        "merge",
        "optimize-channels",
        "validate",
    ] {
        assert!(out.contains(pass), "summary missing {pass}:\n{out}");
    }
    assert!(out.contains("result: 3 nodes"));
}

#[test]
fn output_flag_writes_file() {
    let path = fixture("value_output.json");
    let target = std::env::temp_dir().join(format!("nmc_cli_{}.json", std::process::id()));
    let out = run_nmc(&[path.to_str().unwrap(), "-o", target.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    let written = std::fs::read_to_string(&target).expect("output written");
    assert!(written.contains("\"VALUE\""));
    let _ = std::fs::remove_file(&target);
}

#[test]
fn compile_error_exits_with_one() {
    let path = fixture("unknown_math.json");
    let out = run_nmc(&[path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Unsupported MATH operation: HYPOT"), "stderr: {stderr}");
}

#[test]
fn missing_input_exits_with_two() {
    let out = run_nmc(&["/nonexistent/tree.json"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unknown_pass_is_rejected() {
    let path = fixture("value_output.json");
    let out = run_nmc(&["--stop-after", "codegen", path.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown pass 'codegen'"), "stderr: {stderr}");
}
