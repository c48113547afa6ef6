//! CLI end-to-end tests.
//!
//! These tests spawn the actual `docphrase` binary in a temporary directory
//! and validate stdout and exit codes.
//!
//! Exit code expectations:
//! - 0: Success, no findings
//! - 1: `check` found something
//! - 2: Invalid arguments or configuration
//! - 3: Missing or malformed input

use std::path::Path;
use std::process::Command;

use serde_json::{json, Value};
use tempfile::TempDir;

const SOURCE: &str = "class Probe {\n    /// <summary>Checks whether the file exists.</summary>\n    bool Exists();\n}\n";

/// Run docphrase in `dir` and return (stdout, stderr, exit_code).
fn run_docphrase(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_docphrase"))
        .args(args)
        .current_dir(dir)
        .env_remove("DOCPHRASE_DISABLE")
        .env_remove("DOCPHRASE_MAX_FIX_PASSES")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute docphrase");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn snapshot(source: &str) -> Value {
    let start = source.find("///").unwrap();
    let end = source.find("</summary>").unwrap() + "</summary>".len();
    json!({
        "files": [{
            "path": "Probe.cs",
            "source": source,
            "entities": [{
                "kind": "method",
                "name": "Exists",
                "type": "bool",
                "containing_type": "Probe",
                "comment": { "start": start, "end": end }
            }]
        }]
    })
}

fn write_snapshot(dir: &TempDir, name: &str, source: &str) {
    std::fs::write(dir.path().join(name), snapshot(source).to_string()).unwrap();
}

// ============================================================================
// Check
// ============================================================================

#[test]
fn check_reports_findings_with_exit_1() {
    let dir = TempDir::new().unwrap();
    write_snapshot(&dir, "probe.json", SOURCE);

    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["check", "probe.json"]);
    assert_eq!(exit_code, 1, "stdout: {}", stdout);

    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["schema_version"], "1");
    assert_eq!(json["files_checked"], 1);
    let findings = json["findings"].as_array().unwrap();
    let first = findings.iter().find(|f| f["rule_id"] == "DP0001").unwrap();
    assert_eq!(first["location"]["line"], 2);
    assert_eq!(first["entity"], "method Probe.Exists");
}

#[test]
fn check_walks_directories() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    write_snapshot(&dir, "a.json", SOURCE);
    write_snapshot(&dir, "nested/b.json", SOURCE);
    std::fs::write(dir.path().join("notes.txt"), "not a snapshot").unwrap();

    let (stdout, _stderr, _exit_code) = run_docphrase(dir.path(), &["check", "."]);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["files_checked"], 2);
    assert_eq!(json["entities_checked"], 2);
}

#[test]
fn clean_snapshot_exits_0() {
    let dir = TempDir::new().unwrap();
    let clean = SOURCE.replace("Checks whether", "Determines whether");
    write_snapshot(&dir, "probe.json", &clean);

    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["check", "probe.json"]);
    assert_eq!(exit_code, 0, "stdout: {}", stdout);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["findings"].as_array().unwrap().is_empty());
}

#[test]
fn disabled_rules_are_not_reported() {
    let dir = TempDir::new().unwrap();
    write_snapshot(&dir, "probe.json", SOURCE);

    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["--disable", "DP000*", "check", "probe.json"]);
    assert_eq!(exit_code, 0, "stdout: {}", stdout);
}

#[test]
fn project_config_disables_rules() {
    let dir = TempDir::new().unwrap();
    write_snapshot(&dir, "probe.json", SOURCE);
    std::fs::write(dir.path().join(".docphrase.json"), r#"{"disable": ["DP0001"]}"#).unwrap();

    let (stdout, _stderr, _exit_code) = run_docphrase(dir.path(), &["check", "probe.json"]);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["findings"].as_array().unwrap().iter().all(|f| f["rule_id"] != "DP0001"));
}

// ============================================================================
// Fix
// ============================================================================

#[test]
fn fix_writes_updated_snapshot() {
    let dir = TempDir::new().unwrap();
    write_snapshot(&dir, "probe.json", SOURCE);

    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["fix", "probe.json", "--write", "fixed.json"]);
    assert_eq!(exit_code, 0, "stdout: {}", stdout);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["entities_fixed"], 1);
    let diff = json["fixed_files"][0]["diff"].as_str().unwrap();
    assert!(diff.contains("+    /// <summary>Determines whether the file exists.</summary>"));

    let fixed: Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("fixed.json")).unwrap()).unwrap();
    let source = fixed["files"][0]["source"].as_str().unwrap();
    assert!(source.contains("Determines whether the file exists."));

    // The fixed snapshot checks clean.
    let (_stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["check", "fixed.json"]);
    assert_eq!(exit_code, 0);
}

// ============================================================================
// Rules and Errors
// ============================================================================

#[test]
fn rules_lists_catalog() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["rules"]);
    assert_eq!(exit_code, 0);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    let rules = json["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 12);
    assert_eq!(rules[0]["id"], "DP0001");
    let report_only = rules.iter().find(|r| r["id"] == "DP0012").unwrap();
    assert_eq!(report_only["fixable"], false);
}

#[test]
fn missing_snapshot_exits_3() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["check", "missing.json"]);
    assert_eq!(exit_code, 3);

    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 3);
}

#[test]
fn invalid_disable_glob_exits_2() {
    let dir = TempDir::new().unwrap();
    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["--disable", "DP[", "rules"]);
    assert_eq!(exit_code, 2, "stdout: {}", stdout);
}

#[test]
fn malformed_comment_exits_3() {
    let dir = TempDir::new().unwrap();
    let broken = SOURCE.replace("</summary>", "</remarks></summary>");
    write_snapshot(&dir, "probe.json", &broken);

    let (stdout, _stderr, exit_code) = run_docphrase(dir.path(), &["check", "probe.json"]);
    assert_eq!(exit_code, 3, "stdout: {}", stdout);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["error"]["details"]["file"], "Probe.cs");
}
