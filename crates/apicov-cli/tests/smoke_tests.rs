//! Smoke tests for the apicov CLI
//!
//! These tests run the binary end to end against files in a temp directory.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the apicov binary
fn apicov() -> Command {
    let mut cmd = Command::cargo_bin("apicov").expect("apicov binary should exist");
    cmd.env_remove("RUST_LOG").arg("--color").arg("never");
    cmd
}

const OPENAPI_YAML: &str = r"
openapi: 3.0.0
paths:
  /pets:
    get:
      responses:
        200: { description: ok }
  /pets/{id}:
    get:
      responses:
        200: { description: ok }
        404: { description: missing }
    delete:
      responses:
        204: { description: gone }
";

const ASYNCAPI: &str = r#"{
  "asyncapi": "2.6.0",
  "channels": {
    "pets": {
      "publish": {
        "message": {"payload": {"properties": {"eventName": {"enum": ["PetAdded", "PetSold"]}}}}
      }
    }
  }
}"#;

const HAR: &str = r#"{"log": {"version": "1.2", "entries": [
  {"request": {"method": "GET", "url": "https://api.example.com/pets?limit=5"}, "response": {"status": 200}},
  {"request": {"method": "GET", "url": "https://api.example.com/pets/7"}, "response": {"status": 404}},
  {"request": {"method": "GET", "url": "https://api.example.com/pets/7"}, "response": {"status": 404}},
  {"request": {"method": "GET", "url": "https://api.example.com/owners"}, "response": {"status": 200}},
  {"request": {"method": "GET", "url": "https://cdn.example.com/logo.png"}, "response": {"status": 200}}
]}}"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("openapi.yaml"), OPENAPI_YAML).unwrap();
    fs::write(dir.path().join("asyncapi.json"), ASYNCAPI).unwrap();
    fs::create_dir(dir.path().join("hars")).unwrap();
    fs::write(dir.path().join("hars/run1.har"), HAR).unwrap();
    fs::write(
        dir.path().join("events.jsonl"),
        "{\"channel\": \"pets\", \"verb\": \"publish\", \"discriminator\": \"PetAdded\"}\n",
    )
    .unwrap();
    dir
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    apicov()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    apicov()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compute"))
        .stdout(predicate::str::contains("merge"))
        .stdout(predicate::str::contains("hosts"));
}

#[test]
fn test_no_args_fails() {
    apicov().assert().failure();
}

#[test]
fn test_compute_requires_contract_or_config() {
    apicov()
        .arg("compute")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config or --contract"));
}

// ============================================================================
// Compute
// ============================================================================

#[test]
fn test_compute_single_rest_source() {
    let dir = project();
    apicov()
        .current_dir(dir.path())
        .args([
            "compute",
            "--contract",
            "openapi.yaml",
            "--har-dir",
            "hars",
            "--host",
            "https://api.example.com",
            "--status-discriminator",
            "--output-dir",
            "out",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coverage Report"))
        .stdout(predicate::str::contains("Total: 50% (2/4)"));

    let json = read_json(&dir.path().join("out/api-coverage.json"));
    assert_eq!(json["total"], 4);
    assert_eq!(json["totalCovered"], 2);
    assert_eq!(json["skipped"][0]["reason"], "PathNotFound");
    assert_eq!(json["skipped"][0]["path"], "/owners");

    let md = fs::read_to_string(dir.path().join("out/api-coverage.md")).unwrap();
    assert!(md.contains("### /pets/{id}"));
    assert!(md.contains("https://progress-bar.xyz/50/?color=f0ad4e"));
}

#[test]
fn test_compute_fail_under() {
    let dir = project();
    apicov()
        .current_dir(dir.path())
        .args([
            "compute",
            "--contract",
            "openapi.yaml",
            "--har-dir",
            "hars",
            "--host",
            "https://api.example.com",
            "--status-discriminator",
            "--fail-under",
            "75",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("below the required 75%"));

    // reports are still written
    assert!(dir.path().join("api-coverage.json").exists());
}

#[test]
fn test_compute_from_config() {
    let dir = project();
    fs::write(
        dir.path().join("apicov.yaml"),
        r"
suite_name: Pets
output_dir: reports
output_name: pets
sources:
  - label: rest
    contract: { kind: openapi, path: openapi.yaml }
    traffic: { har_dir: hars }
    include_hosts:
      - host: https://api.example.com
  - label: events
    contract: { kind: asyncapi, path: asyncapi.json }
    traffic: { events_log: events.jsonl }
",
    )
    .unwrap();

    apicov()
        .args(["compute", "--config"])
        .arg(dir.path().join("apicov.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("rest: 67% (2/3)"))
        .stdout(predicate::str::contains("events: 50% (1/2)"));

    let json = read_json(&dir.path().join("reports/pets.json"));
    assert_eq!(json["total"], 5);
    assert_eq!(json["totalCovered"], 3);
    assert_eq!(json["sources"][1]["label"], "events");
    let md = fs::read_to_string(dir.path().join("reports/pets.md")).unwrap();
    assert!(md.starts_with("# Pets"));
    assert!(md.contains("### EVENT|pets"));
}

#[test]
fn test_compute_json_format() {
    let dir = project();
    let output = apicov()
        .current_dir(dir.path())
        .args([
            "compute",
            "--contract",
            "asyncapi.json",
            "--contract-kind",
            "asyncapi",
            "--events-log",
            "events.jsonl",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["totalCovered"], 1);
}

#[test]
fn test_compute_missing_contract() {
    let dir = project();
    apicov()
        .current_dir(dir.path())
        .args(["compute", "--contract", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_reports() {
    let dir = project();
    apicov()
        .current_dir(dir.path())
        .args([
            "compute",
            "--contract",
            "openapi.yaml",
            "--har-dir",
            "hars",
            "--host",
            "https://api.example.com",
            "--output-name",
            "rest",
        ])
        .assert()
        .success();
    apicov()
        .current_dir(dir.path())
        .args([
            "compute",
            "--contract",
            "asyncapi.json",
            "--contract-kind",
            "asyncapi",
            "--events-log",
            "events.jsonl",
            "--label",
            "events",
            "--output-name",
            "events",
        ])
        .assert()
        .success();

    apicov()
        .current_dir(dir.path())
        .args(["merge", "rest.json", "events.json", "-o", "all.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 60% (3/5)"));

    let json = read_json(&dir.path().join("all.json"));
    assert_eq!(json["sources"].as_array().unwrap().len(), 2);
    assert_eq!(json["total"], 5);
}

// ============================================================================
// Hosts
// ============================================================================

#[test]
fn test_hosts_reports_shadowed_rule() {
    apicov()
        .args([
            "hosts",
            "--host",
            "https://api.example.com",
            "--host",
            "https://api.example.com/v2=/v2alpha1",
            "--url",
            "https://api.example.com/v2/x",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://api.example.com/v2/x -> /v2/x"))
        .stderr(predicate::str::contains("shadowed"));
}

#[test]
fn test_hosts_strict_fails_on_overlap() {
    apicov()
        .args([
            "hosts",
            "--strict",
            "--host",
            "https://api.example.com",
            "--host",
            "https://api.example.com/v2",
        ])
        .assert()
        .failure();
}

#[test]
fn test_hosts_clean_table() {
    apicov()
        .args([
            "hosts",
            "--strict",
            "--host",
            "https://api.example.com/v2=/v2alpha1",
            "--host",
            "https://api.example.com",
            "--url",
            "https://api.example.com/v2/x",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("-> /v2alpha1/x"))
        .stderr(predicate::str::contains("shadowed").not());
}
