//! Integration tests for CLI commands.
//!
//! Scans read `kubectl get ... -o json` dumps through `--objects`, so no
//! cluster is needed.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CLUSTER: &str = r#"{
  "apiVersion": "v1",
  "kind": "List",
  "items": [
    {
      "kind": "ClusterRole",
      "metadata": {"name": "cluster-admin"},
      "rules": [{"apiGroups": ["*"], "resources": ["*"], "verbs": ["*"]}]
    },
    {
      "kind": "ClusterRoleBinding",
      "metadata": {"name": "admins"},
      "subjects": [{"kind": "User", "name": "alice"}],
      "roleRef": {"kind": "ClusterRole", "name": "cluster-admin"}
    },
    {
      "kind": "Role",
      "metadata": {"name": "pod-reader", "namespace": "staging"},
      "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get", "list"]}]
    },
    {
      "kind": "RoleBinding",
      "metadata": {"name": "ci-reads-pods", "namespace": "staging"},
      "subjects": [{"kind": "ServiceAccount", "name": "ci"}],
      "roleRef": {"kind": "Role", "name": "pod-reader"}
    },
    {
      "kind": "Role",
      "metadata": {"name": "deployer", "namespace": "prod"},
      "rules": [{"apiGroups": ["apps"], "resources": ["deployments"], "verbs": ["create", "update"]}]
    },
    {
      "kind": "RoleBinding",
      "metadata": {"name": "bob-deploys", "namespace": "prod"},
      "subjects": [{"kind": "User", "name": "bob"}],
      "roleRef": {"kind": "Role", "name": "deployer"}
    },
    {
      "kind": "RoleBinding",
      "metadata": {"name": "orphaned", "namespace": "prod"},
      "subjects": [{"kind": "User", "name": "carol"}],
      "roleRef": {"kind": "Role", "name": "deleted-role"}
    }
  ]
}"#;

const WITHOUT_ADMINS: &str = r#"{
  "items": [
    {
      "kind": "Role",
      "metadata": {"name": "pod-reader", "namespace": "staging"},
      "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get", "list"]}]
    },
    {
      "kind": "RoleBinding",
      "metadata": {"name": "ci-reads-pods", "namespace": "staging"},
      "subjects": [{"kind": "ServiceAccount", "name": "ci"}],
      "roleRef": {"kind": "Role", "name": "pod-reader"}
    }
  ]
}"#;

fn permiflow(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("permiflow").unwrap();
    cmd.env_remove("PERMIFLOW_NAMESPACES")
        .env_remove("KUBE_CONTEXT")
        .arg("--no-color")
        .arg("--project-dir")
        .arg(project);
    cmd
}

fn write_objects(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Scans `objects` into `dir/<name>` as JSON.
fn scan_to(dir: &Path, objects: &Path, name: &str) -> PathBuf {
    let output = dir.join(name);
    permiflow(dir)
        .arg("scan")
        .arg("--objects")
        .arg(objects)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    output
}

// ============================================================================
// Scan
// ============================================================================

#[test]
fn scan_prints_json_report_to_stdout() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);

    let output = permiflow(temp.path())
        .args(["scan", "--context", "kind-test", "--objects"])
        .arg(&objects)
        .assert()
        .success()
        .stderr(predicate::str::contains("TOTAL"))
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["cluster_context"], "kind-test");

    let bindings = report["bindings"].as_array().unwrap();
    assert_eq!(bindings.len(), 3);
    let admins = bindings.iter().find(|b| b["binding"] == "admins").unwrap();
    assert_eq!(admins["risk"], "HIGH");
    assert_eq!(admins["subject"]["name"], "alice");

    assert_eq!(report["warnings"][0]["binding"], "orphaned");
}

#[test]
fn scan_warns_about_dangling_role_refs() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);

    permiflow(temp.path())
        .args(["scan", "--objects"])
        .arg(&objects)
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped binding"))
        .stderr(predicate::str::contains("deleted-role"));
}

#[test]
fn scan_namespace_filter_keeps_cluster_bindings() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);

    permiflow(temp.path())
        .args(["scan", "--namespaces", "staging", "--objects"])
        .arg(&objects)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"admins\""))
        .stdout(predicate::str::contains("\"ci-reads-pods\""))
        .stdout(predicate::str::contains("bob-deploys").not());
}

#[test]
fn scan_reads_namespaces_from_environment() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);

    permiflow(temp.path())
        .env("PERMIFLOW_NAMESPACES", "prod")
        .args(["scan", "--objects"])
        .arg(&objects)
        .assert()
        .success()
        .stdout(predicate::str::contains("bob-deploys"))
        .stdout(predicate::str::contains("ci-reads-pods").not());
}

#[test]
fn scan_output_dir_writes_every_format() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let reports = temp.path().join("reports");

    permiflow(temp.path())
        .args(["scan", "--objects"])
        .arg(&objects)
        .arg("--output-dir")
        .arg(&reports)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    for name in ["rbac-scan.json", "rbac-scan.md", "rbac-scan.csv"] {
        assert!(reports.join(name).exists(), "missing {name}");
    }
    let markdown = fs::read_to_string(reports.join("rbac-scan.md")).unwrap();
    assert!(markdown.contains("HIGH"));
}

#[test]
fn scan_markdown_format() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);

    permiflow(temp.path())
        .args(["scan", "--format", "markdown", "--objects"])
        .arg(&objects)
        .assert()
        .success()
        .stdout(predicate::str::contains("cluster-admin"))
        .stdout(predicate::str::starts_with("#"));
}

#[test]
fn scan_fails_on_high_risk_after_writing_reports() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let reports = temp.path().join("reports");

    permiflow(temp.path())
        .args(["scan", "--fail-on-high-risk", "--objects"])
        .arg(&objects)
        .arg("--output-dir")
        .arg(&reports)
        .assert()
        .failure()
        .stderr(predicate::str::contains("HIGH risk"));

    assert!(reports.join("rbac-scan.json").exists());
}

#[test]
fn scan_fail_on_high_risk_from_config() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    fs::write(
        temp.path().join("permiflow.toml"),
        "[scan]\nfail_on_high_risk = true\n",
    )
    .unwrap();

    permiflow(temp.path())
        .args(["scan", "--objects"])
        .arg(&objects)
        .assert()
        .failure();
}

#[test]
fn scan_without_high_risk_passes_the_gate() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", WITHOUT_ADMINS);

    permiflow(temp.path())
        .args(["scan", "--fail-on-high-risk", "--objects"])
        .arg(&objects)
        .assert()
        .success();
}

#[test]
fn scan_rejects_unreadable_object_dump() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", "not json");

    permiflow(temp.path())
        .args(["scan", "--objects"])
        .arg(&objects)
        .assert()
        .failure()
        .stderr(predicate::str::contains("objects.json"));
}

#[test]
fn scan_archives_into_history() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let history = temp.path().join("history");

    permiflow(temp.path())
        .args(["scan", "--objects"])
        .arg(&objects)
        .arg("--output-dir")
        .arg(temp.path().join("reports"))
        .arg("--history-dir")
        .arg(&history)
        .assert()
        .success()
        .stderr(predicate::str::contains("Archived"));

    let archived: Vec<String> = fs::read_dir(&history)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(archived.iter().any(|n| n.starts_with("rbac-scan-")));
    assert!(archived.iter().any(|n| n.ends_with("-metadata.json")));
}

// ============================================================================
// Diff
// ============================================================================

#[test]
fn diff_reports_removed_cluster_admin() {
    let temp = TempDir::new().unwrap();
    let before = write_objects(temp.path(), "before.json", CLUSTER);
    let after = write_objects(temp.path(), "after.json", WITHOUT_ADMINS);
    let baseline = scan_to(temp.path(), &before, "baseline.json");
    let current = scan_to(temp.path(), &after, "current.json");

    let output = permiflow(temp.path())
        .arg("diff")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(result["added"].as_array().unwrap().is_empty());
    assert!(result["changed"].as_array().unwrap().is_empty());

    let removed: Vec<&str> = result["removed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["binding"].as_str().unwrap())
        .collect();
    assert_eq!(removed, vec!["admins", "bob-deploys"]);
}

#[test]
fn diff_of_identical_scans_is_empty() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let baseline = scan_to(temp.path(), &objects, "baseline.json");

    permiflow(temp.path())
        .arg("diff")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&baseline)
        .arg("--fail-on-drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"added\": []"))
        .stdout(predicate::str::contains("\"changed\": []"));
}

#[test]
fn diff_fails_on_drift_after_writing_report() {
    let temp = TempDir::new().unwrap();
    let before = write_objects(temp.path(), "before.json", CLUSTER);
    let after = write_objects(temp.path(), "after.json", WITHOUT_ADMINS);
    let baseline = scan_to(temp.path(), &before, "baseline.json");
    let current = scan_to(temp.path(), &after, "current.json");
    let report = temp.path().join("drift.md");

    permiflow(temp.path())
        .arg("diff")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&current)
        .args(["--format", "markdown", "--fail-on-drift", "--output"])
        .arg(&report)
        .assert()
        .failure()
        .stderr(predicate::str::contains("drift detected"));

    let markdown = fs::read_to_string(report).unwrap();
    assert!(markdown.contains("admins"));
}

#[test]
fn diff_against_object_dump() {
    let temp = TempDir::new().unwrap();
    let before = write_objects(temp.path(), "before.json", WITHOUT_ADMINS);
    let after = write_objects(temp.path(), "after.json", CLUSTER);
    let baseline = scan_to(temp.path(), &before, "baseline.json");

    permiflow(temp.path())
        .arg("diff")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--objects")
        .arg(&after)
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("admins"));
}

#[test]
fn diff_rejects_malformed_baseline() {
    let temp = TempDir::new().unwrap();
    let baseline = temp.path().join("baseline.json");
    fs::write(&baseline, r#"{"timestamp": "2026-10-19T00:00:00Z", "bindings": 5}"#).unwrap();

    permiflow(temp.path())
        .arg("diff")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--current")
        .arg(&baseline)
        .assert()
        .failure()
        .stderr(predicate::str::contains("baseline.json"));
}

// ============================================================================
// Summary
// ============================================================================

#[test]
fn summary_env_format() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let scan = scan_to(temp.path(), &objects, "scan.json");

    permiflow(temp.path())
        .arg("summary")
        .arg(&scan)
        .args(["--format", "env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HIGH_COUNT=1"))
        .stdout(predicate::str::contains("TOTAL=3"));
}

#[test]
fn summary_json_format() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let scan = scan_to(temp.path(), &objects, "scan.json");

    let output = permiflow(temp.path())
        .arg("summary")
        .arg(&scan)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["high"], 1);
    assert_eq!(summary["total"], 3);
}

#[test]
fn summary_text_format() {
    let temp = TempDir::new().unwrap();
    let objects = write_objects(temp.path(), "objects.json", CLUSTER);
    let scan = scan_to(temp.path(), &objects, "scan.json");

    permiflow(temp.path())
        .arg("summary")
        .arg(&scan)
        .assert()
        .success()
        .stdout(predicate::str::contains("RBAC risk summary"))
        .stdout(predicate::str::contains("MEDIUM"));
}

// ============================================================================
// Config Commands
// ============================================================================

#[test]
fn config_init_writes_project_file() {
    let temp = TempDir::new().unwrap();

    permiflow(temp.path())
        .args(["config", "init"])
        .assert()
        .success();

    let written = fs::read_to_string(temp.path().join("permiflow.toml")).unwrap();
    assert!(written.contains("[scan]"));
    assert!(written.contains("[cluster]"));

    permiflow(temp.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn config_show_reflects_project_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("permiflow.toml"),
        "[scan]\nnamespaces = [\"prod\", \"staging\"]\nfail_on_drift = true\n",
    )
    .unwrap();

    permiflow(temp.path())
        .args(["config", "show", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fail_on_drift = true"));

    permiflow(temp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prod,staging"));
}

#[test]
fn config_validate_accepts_defaults() {
    let temp = TempDir::new().unwrap();

    permiflow(temp.path())
        .args(["config", "init"])
        .assert()
        .success();

    permiflow(temp.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("valid"));
}

#[test]
fn config_validate_rejects_bad_namespace() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("permiflow.toml"),
        "[scan]\nnamespaces = [\"-bad-\"]\n",
    )
    .unwrap();

    permiflow(temp.path())
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
}
