//! Integration tests for the `tuyalink` CLI binary.
//!
//! Argument parsing, help output, config handling and error exit codes,
//! all without reaching the Tuya cloud.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

const NO_HOME: &str = "/tmp/tuyalink-cli-test-nonexistent";

/// Build a [`Command`] for the `tuyalink` binary with env isolation.
///
/// Clears all `TUYALINK_*` env vars and points config directories at
/// `config_home` so tests never touch the user's real configuration.
fn tuyalink_cmd_in(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tuyalink");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env("NO_COLOR", "1")
        .env_remove("TUYALINK_PROFILE")
        .env_remove("TUYALINK_DEVICE")
        .env_remove("TUYALINK_REGION")
        .env_remove("TUYALINK_OUTPUT")
        .env_remove("TUYALINK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn tuyalink_cmd() -> assert_cmd::Command {
    tuyalink_cmd_in(Path::new(NO_HOME))
}

/// Write `contents` as the config file under a fresh config home.
fn config_home(contents: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let app_dir = dir.path().join("tuyalink");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(app_dir.join("config.toml"), contents).unwrap();
    dir
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tuyalink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    tuyalink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Tuya")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("send"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    tuyalink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tuyalink"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = tuyalink_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_send_requires_assignments() {
    tuyalink_cmd().arg("send").assert().code(2);
}

#[test]
fn test_send_rejects_malformed_assignment() {
    tuyalink_cmd()
        .args(["send", "system_arm_type"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CODE=VALUE"));
}

#[test]
fn test_status_without_config() {
    tuyalink_cmd()
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_region_is_a_usage_error() {
    let home = config_home(
        r#"
[profiles.default]
region = "mars"
access_id = "id"
access_secret = "secret"
device_id = "dev"
"#,
    );
    tuyalink_cmd_in(home.path())
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("region"));
}

#[test]
fn test_unknown_profile_lists_available() {
    let home = config_home(
        r#"
[profiles.home]
access_id = "id"
device_id = "dev"
"#,
    );
    tuyalink_cmd_in(home.path())
        .args(["--profile", "office", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("office").and(predicate::str::contains("home")));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    tuyalink_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tuyalink").and(predicate::str::contains("config.toml")));
}

#[test]
fn test_config_show_redacts_secret() {
    let home = config_home(
        r#"
default_profile = "home"

[profiles.home]
region = "eu"
access_id = "abc123"
access_secret = "hunter2"
device_id = "dev42"
"#,
    );
    tuyalink_cmd_in(home.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("abc123")
                .and(predicate::str::contains("dev42"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_show_without_config() {
    tuyalink_cmd()
        .args(["config", "show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();
    tuyalink_cmd_in(home.path())
        .args([
            "--profile",
            "home",
            "--device",
            "dev42",
            "--region",
            "eu",
            "config",
            "init",
            "--access-id",
            "abc123",
            "--access-secret-env",
            "TUYA_SECRET",
        ])
        .assert()
        .success();

    // The only profile becomes the default.
    tuyalink_cmd_in(home.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"name\": \"home\"")
                .and(predicate::str::contains("dev42"))
                .and(predicate::str::contains("TUYA_SECRET")),
        );
}

#[test]
fn test_config_init_requires_device() {
    let home = tempfile::tempdir().unwrap();
    tuyalink_cmd_in(home.path())
        .args(["config", "init", "--access-id", "abc123"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("device_id"));
    assert!(!home.path().join("tuyalink").join("config.toml").exists());
}

#[test]
fn test_config_use_unknown_profile() {
    let home = config_home(
        r#"
[profiles.home]
access_id = "id"
device_id = "dev"
"#,
    );
    tuyalink_cmd_in(home.path())
        .args(["config", "use", "office"])
        .assert()
        .code(2);
}
