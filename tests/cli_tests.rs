//! CLI integration tests for the stepguard binary
//!
//! These tests run the compiled binary and check its JSON output.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::Write;

/// Get a Command instance for the stepguard binary
#[allow(deprecated)]
fn stepguard_cmd() -> Command {
    Command::cargo_bin("stepguard").expect("Failed to find stepguard binary")
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("Failed to run stepguard");
    assert!(
        output.status.success(),
        "stepguard failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// --version / --help
// ============================================================================

#[test]
fn test_version_flag() {
    stepguard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    stepguard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("redact"))
        .stdout(predicate::str::contains("report"));
}

// ============================================================================
// classify
// ============================================================================

#[test]
fn test_classify_message() {
    let out = stdout_json(
        stepguard_cmd().args(["classify", "--message", "Request timed out after 30s"]),
    );
    assert_eq!(out["category"], "timeout");
    assert_eq!(out["retriable"], true);
    assert_eq!(out["message"], "Request timed out after 30s");
    assert!(out.get("stack").is_none());
}

#[test]
fn test_classify_message_with_stack() {
    let out = stdout_json(stepguard_cmd().args([
        "classify",
        "-m",
        "Unknown step type: random_custom_step",
        "--stack",
        "at dispatch (engine.rs:88)",
    ]));
    assert_eq!(out["category"], "missing_config");
    assert_eq!(out["retriable"], false);
    assert_eq!(out["stack"], "at dispatch (engine.rs:88)");
}

#[test]
fn test_classify_json_from_stdin() {
    let out = stdout_json(
        stepguard_cmd()
            .args(["classify", "--input", "-"])
            .write_stdin(r#"{"message": "Forbidden", "code": 429}"#),
    );
    assert_eq!(out["category"], "rate_limit");
    assert_eq!(out["retriable"], true);
    assert_eq!(out["message"], r#"{"message":"Forbidden","code":429}"#);
    assert!(out.get("stack").is_none());
}

#[test]
fn test_classify_null_from_stdin() {
    let out = stdout_json(stepguard_cmd().arg("classify").write_stdin("null"));
    assert_eq!(out["category"], "unknown");
    assert_eq!(out["retriable"], false);
    assert_eq!(out["message"], "Unknown error");
}

#[test]
fn test_classify_invalid_json_exits_2() {
    stepguard_cmd()
        .arg("classify")
        .write_stdin("{not json")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid JSON in stdin"));
}

#[test]
fn test_classify_message_conflicts_with_input() {
    stepguard_cmd()
        .args(["classify", "--message", "x", "--input", "-"])
        .assert()
        .failure();
}

// ============================================================================
// redact
// ============================================================================

#[test]
fn test_redact_from_stdin() {
    let out = stdout_json(
        stepguard_cmd()
            .args(["redact", "--compact"])
            .write_stdin(r#"[{"password":"x"}, 1, "y"]"#),
    );
    assert_eq!(out, json!([{"password": "[REDACTED]"}, 1, "y"]));
}

#[test]
fn test_redact_preserves_key_order() {
    stepguard_cmd()
        .args(["redact", "--compact"])
        .write_stdin(r#"{"z":1,"Authorization":"Bearer t","a":2}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"z":1,"Authorization":"[REDACTED]","a":2}"#,
        ));
}

#[test]
fn test_redact_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"config": {{"client_secret": "s", "region": "eu"}}}}"#).unwrap();

    let out = stdout_json(stepguard_cmd().arg("redact").arg("--input").arg(file.path()));
    assert_eq!(
        out,
        json!({"config": {"client_secret": "[REDACTED]", "region": "eu"}})
    );
}

#[test]
fn test_redact_missing_file_exits_2() {
    stepguard_cmd()
        .args(["redact", "--input", "does/not/exist.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read does/not/exist.json"));
}

#[test]
fn test_redact_with_config_file() {
    let mut config = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(config, "[redaction]\nextra_sensitive_keys = [\"ssn\"]").unwrap();

    let out = stdout_json(
        stepguard_cmd()
            .arg("--config")
            .arg(config.path())
            .arg("redact")
            .write_stdin(r#"{"customer_ssn": "123-45-6789", "name": "ada"}"#),
    );
    assert_eq!(out, json!({"customer_ssn": "[REDACTED]", "name": "ada"}));
}

#[test]
fn test_missing_config_file_exits_2() {
    stepguard_cmd()
        .args(["--config", "nope.toml", "classify", "-m", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration file not found"));
}

// ============================================================================
// report
// ============================================================================

#[test]
fn test_report_combines_classification_and_redaction() {
    let mut payload = tempfile::NamedTempFile::new().unwrap();
    write!(payload, r#"{{"url": "https://api.example.com", "api_key": "k"}}"#).unwrap();

    let out = stdout_json(
        stepguard_cmd()
            .args([
                "report",
                "--message",
                "ECONNRESET while contacting provider",
                "--step-id",
                "step-3",
                "--step-type",
                "http_request",
                "--input",
            ])
            .arg(payload.path()),
    );

    assert_eq!(out["errorCategory"], "transient_network");
    assert_eq!(out["retriable"], true);
    assert_eq!(out["disposition"], "retry");
    assert_eq!(out["failureReason"], "ECONNRESET while contacting provider");
    assert_eq!(out["stepId"], "step-3");
    assert_eq!(out["stepType"], "http_request");
    assert_eq!(
        out["payload"],
        json!({"url": "https://api.example.com", "api_key": "[REDACTED]"})
    );
}

#[test]
fn test_report_without_payload() {
    let out = stdout_json(stepguard_cmd().args(["report", "-m", "403 Forbidden"]));
    assert_eq!(out["errorCategory"], "provider_4xx");
    assert_eq!(out["disposition"], "dead_letter");
    assert_eq!(out["payload"], Value::Null);
}

#[test]
fn test_report_step_id_requires_step_type() {
    stepguard_cmd()
        .args(["report", "-m", "x", "--step-id", "s1"])
        .assert()
        .failure();
}
