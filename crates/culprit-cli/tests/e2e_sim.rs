//! E2E CLI tests for `culprit dev sim` and `culprit completions`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn culprit_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("culprit"));
    cmd.current_dir(dir.path());
    cmd.env("HOME", dir.path());
    cmd.env("XDG_CONFIG_HOME", dir.path().join(".config"));
    cmd.env_remove("FORMAT");
    cmd.env("CULPRIT_LOG", "error");
    cmd
}

#[test]
fn campaign_passes_and_reports_json() {
    let dir = TempDir::new().expect("tempdir");
    let output = culprit_cmd(&dir)
        .args(["dev", "sim", "run", "--seeds", "20", "--format", "json"])
        .output()
        .expect("culprit should not crash");
    assert!(
        output.status.success(),
        "stdout={}",
        String::from_utf8_lossy(&output.stdout)
    );

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["seeds_run"], 20);
    assert_eq!(json["all_passed"], true);
    assert_eq!(json["seeds_failed"], 0);
    assert!(json["first_failure"].is_null());
}

#[test]
fn campaign_text_summary() {
    let dir = TempDir::new().expect("tempdir");
    culprit_cmd(&dir)
        .args([
            "dev", "sim", "run", "--seeds", "10", "--seed-start", "100", "--masks", "50",
            "--format", "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("campaign seeds_run=10"))
        .stdout(predicate::str::contains("all_passed=true"));
}

#[test]
fn invalid_campaign_config_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    culprit_cmd(&dir)
        .args([
            "dev", "sim", "run", "--min-len", "10", "--max-len", "5", "--format", "text",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_len"));
}

#[test]
fn replay_is_deterministic() {
    let dir = TempDir::new().expect("tempdir");
    let run = || {
        culprit_cmd(&dir)
            .args(["dev", "sim", "replay", "--seed", "3", "--format", "json"])
            .output()
            .expect("culprit should not crash")
    };
    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);

    let json: Value = serde_json::from_slice(&first.stdout).expect("valid JSON");
    assert_eq!(json["scenario"]["seed"], 3);
    assert!(json["prefix_lengths"].is_array());
    assert_eq!(json["verdict"]["verdict"].as_str().map(|v| v != "failed"), Some(true));
}

#[test]
fn replay_pretty_lists_oracle_calls() {
    let dir = TempDir::new().expect("tempdir");
    culprit_cmd(&dir)
        .args(["dev", "sim", "replay", "--seed", "7", "--format", "pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Replay Seed 7"))
        .stdout(predicate::str::contains("Oracle Calls"));
}

#[test]
fn completions_for_each_shell() {
    let dir = TempDir::new().expect("tempdir");
    for shell in ["bash", "zsh", "fish"] {
        culprit_cmd(&dir)
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("culprit"));
    }
}
