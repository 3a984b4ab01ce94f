//! Integration tests for the querytune CLI
//!
//! These tests run the querytune binary against profiles and metrics files
//! written to temporary directories. No test reaches the network.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

const QUERY_TEXT: &str = "SELECT o.id, c.name FROM orders o JOIN customers c ON o.cid = c.id";

/// Get a Command for querytune with an isolated config directory
fn querytune(config_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("querytune");
    cmd.env("QUERYTUNE_CONFIG_DIR", config_dir)
        .env_remove("QUERYTUNE_CONFIG")
        .env_remove("QUERYTUNE_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// A query-summary profile that spills to disk
fn write_summary_profile(dir: &Path) -> PathBuf {
    let profile = serde_json::json!({
        "query": {
            "id": "01ef2345-abcd-1234-9876-0123456789ab",
            "status": "FINISHED",
            "queryText": QUERY_TEXT,
            "metrics": {
                "executionTimeMs": 125000,
                "readBytes": 53687091200u64,
                "readCacheBytes": 5368709120u64,
                "rowsReadCount": 1500000000u64,
                "spillToDiskBytes": 16106127360u64,
                "networkSentBytes": 1073741824u64
            }
        },
        "planMetadatas": []
    });
    write_file(dir, "profile.json", &profile.to_string())
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn setup() -> (TempDir, TempDir) {
    (tempdir().unwrap(), tempdir().unwrap())
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_flag() {
    let (config_dir, _) = setup();
    querytune(config_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: querytune"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("optimize"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_command_prints_version() {
    let (config_dir, _) = setup();
    querytune(config_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "querytune ",
            env!("CARGO_PKG_VERSION")
        )));
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn test_compare_json() {
    let (config_dir, work) = setup();
    let original = write_file(
        work.path(),
        "original.json",
        r#"{"total_size_bytes": 1000000, "row_count": 1000}"#,
    );
    let optimized = write_file(
        work.path(),
        "optimized.json",
        r#"{"total_size_bytes": 800000, "row_count": 900}"#,
    );

    let output = querytune(config_dir.path())
        .args(["--format", "json", "compare"])
        .arg(&original)
        .arg(&optimized)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["recommendation"], "use_optimized");
    assert_eq!(json["improvement_level"], "SIGNIFICANT");
    assert_eq!(json["is_improved"], true);
    assert_eq!(json["original_total_size"], 1000000);
    assert_eq!(json["optimized_row_count"], 900);
    let ratio = json["comprehensive_cost_ratio"].as_f64().unwrap();
    assert!((ratio - 0.84).abs() < 1e-9);
}

#[test]
fn test_compare_degraded_human() {
    let (config_dir, work) = setup();
    let original = write_file(
        work.path(),
        "original.json",
        r#"{"total_size_bytes": 1000, "row_count": 100}"#,
    );
    let optimized = write_file(
        work.path(),
        "optimized.json",
        r#"{"total_size_bytes": 1500, "row_count": 150}"#,
    );

    querytune(config_dir.path())
        .arg("compare")
        .arg(&original)
        .arg(&optimized)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Performance Comparison"))
        .stdout(predicate::str::contains("**Improvement Level**: DEGRADED"))
        .stdout(predicate::str::contains("Use original query"));
}

#[test]
fn test_compare_missing_file_json_envelope() {
    let (config_dir, work) = setup();
    let original = write_file(work.path(), "original.json", "{}");

    querytune(config_dir.path())
        .args(["--format", "json", "compare"])
        .arg(&original)
        .arg(work.path().join("missing.json"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains(r#""type":"not_found""#))
        .stderr(predicate::str::contains(r#""code":3"#));
}

#[test]
fn test_compare_invalid_json_is_data_error() {
    let (config_dir, work) = setup();
    let original = write_file(work.path(), "original.json", "{}");
    let broken = write_file(work.path(), "broken.json", "{not json");

    querytune(config_dir.path())
        .arg("compare")
        .arg(&original)
        .arg(&broken)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid metrics file"));
}

// ============================================================================
// analyze
// ============================================================================

#[test]
fn test_analyze_human_report() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    querytune(config_dir.path())
        .arg("analyze")
        .arg(&profile)
        .assert()
        .success()
        .stdout(predicate::str::contains("# SQL Optimization Report"))
        .stdout(predicate::str::contains("## Bottleneck Analysis"))
        .stdout(predicate::str::contains("Memory Spill"))
        .stdout(predicate::str::contains("No node metrics found"))
        .stdout(predicate::str::contains("## Optimization Results").not());
}

#[test]
fn test_analyze_json() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    let output = querytune(config_dir.path())
        .args(["analyze", "--format", "json"])
        .arg(&profile)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["format"], "query_summary");
    assert_eq!(json["query_id"], "01ef2345-abcd-1234-9876-0123456789ab");
    assert_eq!(json["metrics"]["row_count"], 1500000000u64);
    let bottlenecks = json["bottlenecks"].as_array().unwrap();
    assert!(bottlenecks.iter().any(|b| b["name"] == "Memory Spill"));
}

#[test]
fn test_analyze_unknown_profile_format() {
    let (config_dir, work) = setup();
    let profile = write_file(work.path(), "profile.json", r#"{"foo": 1}"#);

    querytune(config_dir.path())
        .args(["--format", "json", "analyze"])
        .arg(&profile)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid_profile"));
}

// ============================================================================
// optimize
// ============================================================================

#[test]
fn test_optimize_without_credentials_falls_back_to_original() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    let output = querytune(config_dir.path())
        .env_remove("OPENAI_API_KEY")
        .args(["--format", "json", "optimize", "--provider", "openai"])
        .args(["--max-attempts", "2"])
        .arg(&profile)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);

    let json = stdout_json(&output);
    let result = &json["result"];
    assert_eq!(json["provider"], "openai");
    assert_eq!(result["optimization_success"], false);
    assert_eq!(result["best_optimized_query"], QUERY_TEXT);
    assert_eq!(result["best_attempt_number"], 0);

    let attempts = result["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["trial_type"], "initial");
    assert_eq!(attempts[1]["trial_type"], "error_correction");
    assert!(attempts[0]["error_info"]
        .as_str()
        .unwrap()
        .contains("OPENAI_API_KEY"));
}

#[test]
fn test_optimize_saves_artifacts() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());
    let query = write_file(work.path(), "query.sql", "SELECT * FROM orders\n");
    let out_dir = work.path().join("reports");

    querytune(config_dir.path())
        .env_remove("OPENAI_API_KEY")
        .args(["optimize", "--max-attempts", "1", "--query"])
        .arg(&query)
        .arg("--output-dir")
        .arg(&out_dir)
        .arg(&profile)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Optimization Results"))
        .stdout(predicate::str::contains("SELECT * FROM orders"))
        .stdout(predicate::str::contains("Saved report:"));

    let names: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("original_query_01ef2345_")));
    assert!(names.iter().any(|n| n.ends_with(".md")));
    assert!(!names.iter().any(|n| n.starts_with("optimized_query_")));
}

#[test]
fn test_optimize_zero_attempts_is_usage_error() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    querytune(config_dir.path())
        .args(["optimize", "--max-attempts", "0"])
        .arg(&profile)
        .assert()
        .code(2);
}

#[test]
fn test_optimize_missing_profile() {
    let (config_dir, work) = setup();

    querytune(config_dir.path())
        .args(["--format", "json", "optimize"])
        .arg(work.path().join("nope.json"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains(r#""type":"not_found""#));
}

#[test]
fn test_optimize_azure_without_endpoint_fails_fast() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    querytune(config_dir.path())
        .args(["--format", "json", "optimize", "--provider", "azure_openai"])
        .arg(&profile)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("generation_error"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    let (config_dir, _) = setup();

    querytune(config_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_optimization_attempts = 3"))
        .stdout(predicate::str::contains("provider = \"openai\""));
}

#[test]
fn test_config_init_then_load() {
    let (config_dir, _) = setup();

    querytune(config_dir.path())
        .args(["config", "--init"])
        .assert()
        .success();
    assert!(config_dir.path().join("config.toml").exists());

    querytune(config_dir.path())
        .args(["config", "--init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    let output = querytune(config_dir.path())
        .args(["config", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["exists"], true);
    assert_eq!(json["config"]["max_optimization_attempts"], 3);
}

#[test]
fn test_invalid_config_file_is_usage_error() {
    let (config_dir, work) = setup();
    let config = write_file(work.path(), "bad.toml", "max_optimization_attempts = 0\n");

    querytune(config_dir.path())
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_optimization_attempts"));
}

// ============================================================================
// Usage errors
// ============================================================================

#[test]
fn test_unknown_provider_json_envelope() {
    let (config_dir, work) = setup();
    let profile = write_summary_profile(work.path());

    querytune(config_dir.path())
        .args(["--format", "json", "optimize", "--provider", "cohere"])
        .arg(&profile)
        .assert()
        .code(2)
        .stderr(predicate::str::contains(r#""type":"usage_error""#));
}
