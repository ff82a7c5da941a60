//! CLI integration tests for Quay.
//!
//! These tests drive the compliance commands end to end against fixture
//! projects. Everything runs offline: remote-looking dependencies are
//! pre-installed under lib/ so no command touches the network.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use quay::audit::{cache, Severity, Vulnerability};
use quay::ProjectContext;

/// Get the quay binary command.
fn quay() -> Command {
    Command::cargo_bin("quay").unwrap()
}

/// A project with one remote-looking dependency already installed.
fn fixture_project() -> TempDir {
    let tmp = TempDir::new().unwrap();

    fs::write(
        tmp.path().join("Quay.toml"),
        r#"[package]
name = "fixture"
version = "0.1.0"
license = "MIT"

[dependencies]
libdemo = { git = "https://github.com/acme/libdemo", version = "~1.2" }
"#,
    )
    .unwrap();

    fs::write(
        tmp.path().join("Quay.lock"),
        r#"version = 1

[[package]]
name = "libdemo"
version = "1.2.0"
resolver = "git"
source = "https://github.com/acme/libdemo"
"#,
    )
    .unwrap();

    let install = tmp.path().join("lib/libdemo");
    fs::create_dir_all(install.join("src")).unwrap();
    fs::write(install.join("src/demo.c"), "int demo(void) { return 7; }\n").unwrap();
    fs::write(
        install.join("Quay.toml"),
        "[package]\nname = \"libdemo\"\nversion = \"1.2.0\"\nlicense = \"MIT\"\n",
    )
    .unwrap();

    tmp
}

fn lockfile_checksum(project: &Path) -> Option<String> {
    let lock = fs::read_to_string(project.join("Quay.lock")).unwrap();
    lock.lines()
        .find(|l| l.starts_with("checksum"))
        .map(|l| l.split('"').nth(1).unwrap().to_string())
}

// ============================================================================
// quay install
// ============================================================================

#[test]
fn test_install_migrates_checksums() {
    let tmp = fixture_project();

    quay()
        .args(["install"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let checksum = lockfile_checksum(tmp.path()).expect("checksum written to lockfile");
    assert!(checksum.starts_with("sha256:"));
    assert_eq!(checksum.len(), "sha256:".len() + 64);

    // The changelog recorded the install.
    let changelog = tmp.path().join(".quay/audit/changelog.json");
    assert!(changelog.exists());
    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&changelog).unwrap()).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["action"], "install");
    assert!(entries[0]["lockfile_checksum"]
        .as_str()
        .unwrap()
        .starts_with("sha256:"));

    // Second install is a no-op.
    let before = fs::read_to_string(tmp.path().join("Quay.lock")).unwrap();
    quay()
        .args(["install"])
        .current_dir(tmp.path())
        .assert()
        .success();
    assert_eq!(before, fs::read_to_string(tmp.path().join("Quay.lock")).unwrap());
}

#[test]
fn test_install_detects_tampering() {
    let tmp = fixture_project();

    quay().args(["install"]).current_dir(tmp.path()).assert().success();

    // Tamper with the installed tree.
    fs::write(
        tmp.path().join("lib/libdemo/src/demo.c"),
        "int demo(void) { return 666; }\n",
    )
    .unwrap();

    quay()
        .args(["install"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("libdemo"));

    // The opt-out proceeds with a warning.
    quay()
        .args(["install", "--skip-verify"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("skip-verify"));
}

#[test]
fn test_install_requires_lockfile() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("Quay.toml"),
        "[package]\nname = \"empty\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();

    quay()
        .args(["install"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing lockfile"));
}

#[test]
fn test_policy_gate_blocks_install() {
    let tmp = fixture_project();
    fs::write(
        tmp.path().join(".quay-policy.yml"),
        "version: \"1\"\nrules:\n  dependencies:\n    blocked:\n      - name: libdemo\n        reason: unwanted\n",
    )
    .unwrap();

    quay()
        .args(["install"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("policy"));

    // Blocked before the lockfile write.
    assert!(lockfile_checksum(tmp.path()).is_none());
}

// ============================================================================
// quay audit
// ============================================================================

#[test]
fn test_audit_offline_clean() {
    let tmp = fixture_project();

    quay()
        .args(["--offline", "audit", "--format", "json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_vulnerabilities\": 0"));
}

#[test]
fn test_audit_reports_cached_vulnerability() {
    let tmp = fixture_project();

    // Seed the per-purl cache with one high-severity advisory.
    let ctx = ProjectContext::at(tmp.path()).unwrap();
    let vuln = Vulnerability {
        id: "ADV-1".into(),
        summary: "stack overflow in demo()".into(),
        details: String::new(),
        severity: Severity::High,
        cvss_score: Some(8.1),
        aliases: vec!["CVE-2024-0001".into()],
        references: vec![],
        published: None,
        modified: None,
        affected_versions: vec!["introduced: 1.0.0".into()],
    };
    cache::store(&ctx, "pkg:github/acme/libdemo@1.2.0", &[vuln]).unwrap();

    quay()
        .args(["--offline", "audit", "--format", "json"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"total_vulnerabilities\": 1"))
        .stdout(predicate::str::contains("ADV-1"));

    // A higher fail-above threshold passes on the same data.
    quay()
        .args(["--offline", "audit", "--fail-above", "critical"])
        .current_dir(tmp.path())
        .assert()
        .success();

    // An ignore rule suppresses it by alias.
    fs::write(
        tmp.path().join(".quay-audit-ignore.yml"),
        "ignores:\n  - id: CVE-2024-0001\n    reason: accepted\n",
    )
    .unwrap();
    quay()
        .args(["--offline", "audit", "--format", "json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ignored_count\": 1"));
}

// ============================================================================
// quay licenses
// ============================================================================

#[test]
fn test_licenses_json_and_check() {
    let tmp = fixture_project();

    quay()
        .args(["licenses", "--format", "json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"verdict\": \"allowed\""));

    // Deny MIT and the check fails.
    fs::write(
        tmp.path().join(".quay-license-policy.yml"),
        "policy:\n  denied: [MIT]\n",
    )
    .unwrap();

    quay()
        .args(["licenses", "--check"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("denied"));
}

// ============================================================================
// quay policy
// ============================================================================

#[test]
fn test_policy_init_and_show() {
    let tmp = fixture_project();

    quay()
        .args(["policy", "init"])
        .current_dir(tmp.path())
        .assert()
        .success();
    assert!(tmp.path().join(".quay-policy.yml").exists());

    // Refuses to overwrite without --force.
    quay()
        .args(["policy", "init"])
        .current_dir(tmp.path())
        .assert()
        .failure();

    quay()
        .args(["policy", "show"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed hosts: any"));
}

#[test]
fn test_policy_check_exit_codes() {
    let tmp = fixture_project();

    // No policy file: clean exit.
    quay()
        .args(["policy", "check"])
        .current_dir(tmp.path())
        .assert()
        .success();

    // Warnings only: exit 2; with --strict: exit 1.
    fs::write(
        tmp.path().join(".quay-policy.yml"),
        "version: \"1\"\nrules:\n  custom:\n    - name: demo-warning\n      pattern: \"^libdemo$\"\n      action: warn\n",
    )
    .unwrap();
    quay()
        .args(["policy", "check"])
        .current_dir(tmp.path())
        .assert()
        .code(2);
    quay()
        .args(["policy", "check", "--strict"])
        .current_dir(tmp.path())
        .assert()
        .code(1);

    // Errors: exit 1.
    fs::write(
        tmp.path().join(".quay-policy.yml"),
        "version: \"1\"\nrules:\n  sources:\n    allowed_hosts: [gitlab.com]\n",
    )
    .unwrap();
    quay()
        .args(["policy", "check", "--format", "json"])
        .current_dir(tmp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("allowed_hosts"));
}

// ============================================================================
// quay diff
// ============================================================================

#[test]
fn test_diff_lockfile_paths() {
    let tmp = fixture_project();

    // An old lockfile with a different pinned commit for the same version.
    let old = tmp.path().join("old.lock");
    fs::write(
        &old,
        r#"version = 1

[[package]]
name = "libdemo"
version = "1.2.0+git.commit.aaaa1111"
resolver = "git"
source = "https://github.com/acme/libdemo"

[[package]]
name = "gone"
version = "0.4.0"
resolver = "git"
source = "https://github.com/acme/gone"
"#,
    )
    .unwrap();

    let current = tmp.path().join("Quay.lock");
    fs::write(
        &current,
        r#"version = 1

[[package]]
name = "libdemo"
version = "1.2.0+git.commit.bbbb2222"
resolver = "git"
source = "https://github.com/acme/libdemo"
"#,
    )
    .unwrap();

    quay()
        .args([
            "diff",
            old.to_str().unwrap(),
            "current",
            "--format",
            "json",
        ])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"from_commit\": \"aaaa1111\""))
        .stdout(predicate::str::contains("\"to_commit\": \"bbbb2222\""))
        .stdout(predicate::str::contains("\"removed\": 1"));
}

#[test]
fn test_diff_last_install() {
    let tmp = fixture_project();

    quay().args(["install"]).current_dir(tmp.path()).assert().success();

    // The solver bumps the version afterwards.
    fs::write(
        tmp.path().join("Quay.lock"),
        r#"version = 1

[[package]]
name = "libdemo"
version = "1.3.0"
resolver = "git"
source = "https://github.com/acme/libdemo"
"#,
    )
    .unwrap();

    quay()
        .args(["diff", "--format", "markdown"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("| Updated | libdemo | 1.2.0 | 1.3.0 |"));
}

// ============================================================================
// quay compliance-report
// ============================================================================

#[test]
fn test_compliance_report_graceful_degradation() {
    let tmp = fixture_project();

    let assert = quay()
        .args(["--offline", "compliance-report", "--reviewer", "sec-team"])
        .current_dir(tmp.path())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let report = &value["report"];

    assert_eq!(report["version"], "1.0");
    assert_eq!(report["project"]["name"], "fixture");
    assert!(report["sections"]["sbom"].is_object());
    assert!(report["sections"]["integrity"].is_object());
    assert!(report["sections"]["policy_compliance"].is_null());
    assert!(report["sections"]["change_history"].is_null());
    assert_eq!(report["summary"]["overall_status"], "pass");
    assert_eq!(report["attestation"]["reviewer"], "sec-team");
}

#[test]
fn test_compliance_report_archives_output() {
    let tmp = fixture_project();
    let out = tmp.path().join("report.json");

    quay()
        .args([
            "--offline",
            "compliance-report",
            "--output",
            out.to_str().unwrap(),
        ])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(out.exists());
    let archived: Vec<_> = fs::read_dir(tmp.path().join(".quay/audit/reports"))
        .unwrap()
        .collect();
    assert_eq!(archived.len(), 1);
}

#[test]
fn test_compliance_report_rejects_unknown_format() {
    let tmp = fixture_project();

    quay()
        .args(["--offline", "compliance-report", "--format", "yaml"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown output format"));
}

// ============================================================================
// shared command contract
// ============================================================================

#[test]
fn test_commands_require_lockfile() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("Quay.toml"),
        "[package]\nname = \"empty\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();

    for command in [vec!["audit"], vec!["licenses"], vec!["compliance-report"]] {
        quay()
            .args(&command)
            .arg("--offline")
            .current_dir(tmp.path())
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Missing lockfile"));
    }
}
