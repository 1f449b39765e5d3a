//! CLI tests for azmon-rules
//!
//! Runs the built binary with assert_cmd:
//! - Offline commands (schema, validate, expand)
//! - Exit codes per failure class
//! - Apply and destroy against a mock Resource Manager endpoint

mod common;

use assert_cmd::Command;
use common::{remote_body, rule_path, SUBSCRIPTION};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDLE_RULE: &str = r#"name: idle
resource_group_name: rg1
location: West Europe
data_source_id: /subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/logs
criteria:
  - metric_name: Average_% Idle Time
    dimension:
      - name: InstanceName
        operator: Include
        values: ["1"]
"#;

const BAD_SEVERITY_RULE: &str = r#"name: cpu
resource_group_name: rg1
location: eastus
action_type: Alerting
data_source_id: /subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.OperationalInsights/workspaces/logs
severity: 7
trigger:
  - operator: GreaterThan
    threshold: 90
"#;

// Helper to get a command isolated from the caller's configuration
fn azmon_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("azmon-rules").unwrap();
    cmd.arg("--no-color")
        .current_dir(home)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("AZMON_CONFIG")
        .env_remove("AZMON_STATE_FILE")
        .env_remove("AZMON_LOG_LEVEL")
        .env_remove("ARM_SUBSCRIPTION_ID")
        .env_remove("ARM_ACCESS_TOKEN")
        .env_remove("ARM_ENDPOINT")
        .env_remove("ARM_RESOURCES_MUST_BE_IMPORTED")
        .env_remove("RUST_LOG");
    cmd
}

fn write_rule(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// Help and version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    azmon_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_version() {
    let dir = tempdir().unwrap();
    azmon_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    let dir = tempdir().unwrap();
    azmon_cmd(dir.path()).assert().failure();
}

// ============================================================================
// Offline commands
// ============================================================================

#[test]
fn test_schema_json() {
    let dir = tempdir().unwrap();
    let output = azmon_cmd(dir.path())
        .args(["schema", "--output", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let doc: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["resource_type"], "azurerm_monitor_scheduled_query_rules");
}

#[test]
fn test_schema_table_shows_nested_fields() {
    let dir = tempdir().unwrap();
    azmon_cmd(dir.path())
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("criteria.dimension.operator"));
}

#[test]
fn test_validate_ok() {
    let dir = tempdir().unwrap();
    let rule = write_rule(&dir, "idle.yaml", IDLE_RULE);

    azmon_cmd(dir.path())
        .arg("validate")
        .arg(&rule)
        .assert()
        .success()
        .stdout(predicate::str::contains("[idle]"));
}

#[test]
fn test_validate_invalid_exit_code() {
    let dir = tempdir().unwrap();
    let rule = write_rule(&dir, "cpu.yaml", BAD_SEVERITY_RULE);

    azmon_cmd(dir.path())
        .arg("validate")
        .arg(&rule)
        .assert()
        .code(4)
        .stdout(predicate::str::contains("severity"))
        .stdout(predicate::str::contains("cpu.yaml"));
}

#[test]
fn test_validate_missing_file() {
    let dir = tempdir().unwrap();

    azmon_cmd(dir.path())
        .args(["validate", "does-not-exist.yaml"])
        .assert()
        .code(5);
}

#[test]
fn test_expand_prints_wire_body() {
    let dir = tempdir().unwrap();
    let rule = write_rule(&dir, "idle.yaml", IDLE_RULE);

    let output = azmon_cmd(dir.path())
        .args(["--output", "json", "expand"])
        .arg(&rule)
        .output()
        .unwrap();

    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["location"], "westeurope");
    assert_eq!(body["properties"]["enabled"], "true");
    assert_eq!(
        body["properties"]["action"]["criteria"][0]["dimensions"][0]["name"],
        "InstanceName"
    );
}

#[test]
fn test_apply_without_subscription_fails() {
    let dir = tempdir().unwrap();
    let rule = write_rule(&dir, "idle.yaml", IDLE_RULE);

    azmon_cmd(dir.path())
        .arg("apply")
        .arg(&rule)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ARM_SUBSCRIPTION_ID"));
}

#[test]
fn test_destroy_requires_target() {
    let dir = tempdir().unwrap();

    azmon_cmd(dir.path())
        .env("ARM_SUBSCRIPTION_ID", SUBSCRIPTION)
        .arg("destroy")
        .assert()
        .failure();
}

// ============================================================================
// Against a mock endpoint
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_apply_then_destroy() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let rule = write_rule(&dir, "idle.yaml", IDLE_RULE);
    let params = common::log_to_metric_params("idle");
    let config = azmon_rules::monitor::RuleConfig::from_params(&params).unwrap();
    let rule_url = rule_path("rg1", "idle");

    Mock::given(method("GET"))
        .and(path(rule_url.clone()))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(rule_url.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_body(&config)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(rule_url.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_body(&config)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(rule_url.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let home = dir.path().to_path_buf();
    let run = move |args: Vec<String>| {
        let mut cmd = azmon_cmd(&home);
        cmd.env("ARM_ENDPOINT", &endpoint)
            .env("ARM_SUBSCRIPTION_ID", SUBSCRIPTION)
            .env("ARM_ACCESS_TOKEN", "test-token")
            .args(args);
        cmd.output().unwrap()
    };

    let rule_arg = rule.display().to_string();
    let apply = {
        let run = run.clone();
        tokio::task::spawn_blocking(move || run(vec!["apply".into(), rule_arg]))
            .await
            .unwrap()
    };
    assert!(apply.status.success(), "{}", String::from_utf8_lossy(&apply.stderr));
    assert!(String::from_utf8_lossy(&apply.stdout).contains("created: [idle]"));

    let state: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("azmon-rules.state.json")).unwrap())
            .unwrap();
    assert_eq!(state["resources"]["idle"]["id"], rule_url.as_str());

    let destroy = tokio::task::spawn_blocking(move || run(vec!["destroy".into(), "idle".into()]))
        .await
        .unwrap();
    assert!(destroy.status.success(), "{}", String::from_utf8_lossy(&destroy.stderr));

    let state: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("azmon-rules.state.json")).unwrap())
            .unwrap();
    assert!(state["resources"].as_object().unwrap().is_empty());
}
