//! Runs the `lox-memory` binary end to end.

use std::path::Path;
use std::process::{Command, Output};

fn run_cli(
    config: Option<&Path>,
    args: &[&str],
) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lox-memory"));
    if let Some(path) = config {
        command.arg("--config").arg(path);
    }
    command.args(args).output().expect("Failed to run lox-memory")
}

fn write_config(
    dir: &Path,
    content: &str,
) -> std::path::PathBuf {
    let path = dir.join("memory.ron");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_exhausted_heap_aborts_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "(heap_limit: Some(100), on_failure: Abort)");

    let output = run_cli(Some(&config), &["grow", "50"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "expected abort, got {:?}", output.status);
    assert!(
        stderr.contains("unrecoverable allocation failure"),
        "stderr: {}",
        stderr
    );
    assert!(stderr.contains("requested 128 bytes"), "stderr: {}", stderr);
}

#[test]
fn test_exhausted_heap_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "(heap_limit: Some(100), on_failure: Report)");

    let output = run_cli(Some(&config), &["grow", "50", "--json"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["appended"], 8);
    assert_eq!(report["capacity"], 8);
}

#[test]
fn test_grow_without_config() {
    let output = run_cli(None, &["grow", "9"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0 -> 8 -> 16"), "stdout: {}", stdout);
    assert!(stdout.contains("reallocations: 2"), "stdout: {}", stdout);
}

#[test]
fn test_policy_uses_configured_floor() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "(growth: (min_capacity: 4))");

    let output = run_cli(Some(&config), &["policy", "0", "3"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0 -> 4 -> 8 -> 16");
}

#[test]
fn test_config_write_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_config(dir.path(), "(heap_limit: Some(4096), on_failure: Report)");
    let target = dir.path().join("out").join("written.ron");

    let output = run_cli(Some(&source), &["config", "--write", target.to_str().unwrap()]);
    assert!(output.status.success());

    let written = lox_memory::util::config::load_config(&target).unwrap();
    assert_eq!(written.heap_limit, Some(4096));

    let printed = run_cli(Some(&target), &["config"]);
    let json: serde_json::Value = serde_json::from_slice(&printed.stdout).unwrap();
    assert_eq!(json["on_failure"], "Report");
}
