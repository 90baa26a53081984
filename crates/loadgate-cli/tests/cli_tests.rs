//! Integration tests for the `loadgate` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn loadgate(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("loadgate"));
    cmd.current_dir(cwd);
    cmd
}

fn read_value(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path).expect("failed to read output file");
    serde_json::from_str(&content).expect("output should be valid JSON")
}

fn capture_baseline(dir: &Path) -> PathBuf {
    let out = dir.join("baseline.json");
    loadgate(dir)
        .arg("baseline")
        .arg("--input")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--name")
        .arg("main")
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    out
}

#[test]
fn summarize_derives_statistics() {
    let tmp = tempdir().expect("failed to create temp dir");
    let out = tmp.path().join("nested").join("run.json");

    loadgate(tmp.path())
        .arg("summarize")
        .arg("--input")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let run = read_value(&out);
    assert_eq!(run["schema"], "loadgate.run.v1");
    let stats = &run["results"]["production"]["scenarios"]["cold_cache"]["statistics"];
    assert_eq!(stats["timing.total"]["count"], 5);
    assert_eq!(stats["timing.total"]["mean"], 100.0);
    assert_eq!(stats["size.transferred"]["stddev"], 0.0);
}

#[test]
fn compare_reports_regression_and_writes_markdown() {
    let tmp = tempdir().expect("failed to create temp dir");
    let out = tmp.path().join("compare.json");
    let md = tmp.path().join("compare.md");

    loadgate(tmp.path())
        .arg("compare")
        .arg("--baseline")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--current")
        .arg(fixtures_dir().join("current_slow.json"))
        .arg("--out")
        .arg(&out)
        .arg("--md")
        .arg(&md)
        .assert()
        .success();

    let report = read_value(&out);
    assert_eq!(report["schema"], "loadgate.compare.v1");
    assert_eq!(report["summary"]["overall_impact"], "negative");
    assert_eq!(
        report["summary"]["regressions"][0],
        "production/cold_cache/timing.total: +50.00%"
    );
    let result = &report["scenarios"]["production"]["cold_cache"]["timing.total"];
    assert_eq!(result["interpretation"]["classification"], "regression");

    let markdown = fs::read_to_string(&md).expect("markdown should be written");
    assert!(markdown.starts_with("❌ loadgate: regressions detected"));
}

#[test]
fn compare_polarity_override_flips_the_verdict() {
    let tmp = tempdir().expect("failed to create temp dir");
    let out = tmp.path().join("compare.json");

    loadgate(tmp.path())
        .arg("compare")
        .arg("--baseline")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--current")
        .arg(fixtures_dir().join("current_slow.json"))
        .arg("--polarity")
        .arg("timing=higher")
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let report = read_value(&out);
    assert_eq!(report["summary"]["overall_impact"], "positive");
    assert_eq!(report["summary"]["regressions"].as_array().map(Vec::len), Some(0));
}

#[test]
fn compare_rejects_bad_polarity() {
    let tmp = tempdir().expect("failed to create temp dir");

    loadgate(tmp.path())
        .arg("compare")
        .arg("--baseline")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--current")
        .arg(fixtures_dir().join("current_slow.json"))
        .arg("--polarity")
        .arg("timing=sideways")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid polarity"));
}

#[test]
fn missing_results_mapping_is_a_tool_error() {
    let tmp = tempdir().expect("failed to create temp dir");

    loadgate(tmp.path())
        .arg("summarize")
        .arg("--input")
        .arg(fixtures_dir().join("no_results.json"))
        .arg("--out")
        .arg(tmp.path().join("out.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("results"));
}

#[test]
fn validate_strict_exit_codes() {
    let tmp = tempdir().expect("failed to create temp dir");
    let out = tmp.path().join("validation.json");

    loadgate(tmp.path())
        .arg("validate")
        .arg("--input")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--out")
        .arg(&out)
        .arg("--strict")
        .assert()
        .success();
    assert_eq!(read_value(&out)["passed"], true);

    loadgate(tmp.path())
        .arg("validate")
        .arg("--input")
        .arg(fixtures_dir().join("too_few.json"))
        .arg("--out")
        .arg(&out)
        .arg("--strict")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("validation failed"));
    assert_eq!(read_value(&out)["passed"], false);

    loadgate(tmp.path())
        .arg("validate")
        .arg("--input")
        .arg(fixtures_dir().join("too_few.json"))
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
}

#[test]
fn baseline_rejects_blank_name() {
    let tmp = tempdir().expect("failed to create temp dir");

    loadgate(tmp.path())
        .arg("baseline")
        .arg("--input")
        .arg(fixtures_dir().join("baseline_run.json"))
        .arg("--name")
        .arg("  ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must not be empty"));
}

#[test]
fn check_passes_unchanged_run() {
    let tmp = tempdir().expect("failed to create temp dir");
    let baseline = capture_baseline(tmp.path());
    assert_eq!(read_value(&baseline)["schema"], "loadgate.baseline.v1");

    let out_dir = tmp.path().join("artifacts");
    loadgate(tmp.path())
        .arg("check")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(fixtures_dir().join("current_same.json"))
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--strict")
        .assert()
        .success();

    let gate = read_value(&out_dir.join("gate.json"));
    assert_eq!(gate["passed"], true);
    assert_eq!(gate["score"], 100);
    assert!(out_dir.join("validation.json").exists());
    let summary = fs::read_to_string(out_dir.join("summary.md")).expect("summary.md");
    assert!(summary.starts_with("✅ loadgate: pass"));
}

#[test]
fn check_fails_regression_in_strict_mode() {
    let tmp = tempdir().expect("failed to create temp dir");
    let baseline = capture_baseline(tmp.path());
    let out_dir = tmp.path().join("artifacts");

    loadgate(tmp.path())
        .arg("check")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(fixtures_dir().join("current_slow.json"))
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--strict")
        .arg("--annotations")
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "::error::loadgate production/cold_cache timing.total: +50.00%",
        ))
        .stderr(predicate::str::contains(
            "regression: production/cold_cache/timing.total +50.00%",
        ));

    let gate = read_value(&out_dir.join("gate.json"));
    assert_eq!(gate["passed"], false);
    assert_eq!(gate["score"], 85);
}

#[test]
fn check_honours_config_file_threshold() {
    let tmp = tempdir().expect("failed to create temp dir");
    let baseline = capture_baseline(tmp.path());
    fs::write(
        tmp.path().join("loadgate.toml"),
        "[analysis]\nregression_threshold = 0.60\n",
    )
    .expect("write config");

    let out_dir = tmp.path().join("artifacts");
    loadgate(tmp.path())
        .arg("check")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(fixtures_dir().join("current_slow.json"))
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--strict")
        .assert()
        .success();

    let gate = read_value(&out_dir.join("gate.json"));
    assert_eq!(gate["regressions"].as_array().map(Vec::len), Some(0));
    assert_eq!(gate["changes"].as_array().map(Vec::len), Some(1));
}

#[test]
fn explicit_config_that_is_missing_is_an_error() {
    let tmp = tempdir().expect("failed to create temp dir");

    loadgate(tmp.path())
        .arg("--config")
        .arg("does-not-exist.toml")
        .arg("validate")
        .arg("--input")
        .arg(fixtures_dir().join("baseline_run.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does-not-exist.toml"));
}
