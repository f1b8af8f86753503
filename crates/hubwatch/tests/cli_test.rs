//! Integration tests for the `hubwatch` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! config handling and error exit codes, all without a cloud account.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `hubwatch` binary with env isolation.
///
/// Clears all `HUBWATCH_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn hubwatch_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hubwatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    for var in [
        "HUBWATCH_PROFILE",
        "HUBWATCH_OUTPUT",
        "HUBWATCH_INSECURE",
        "HUBWATCH_TIMEOUT",
        "HUBWATCH_API_KEY",
        "HUBWATCH_LOGIN",
        "HUBWATCH_PASSWORD_HASH",
        "HUBWATCH_RTSP_PASSWORD",
        "HUBWATCH_DEFAULT_PROFILE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join("hubwatch");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
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
    let home = tempfile::tempdir().unwrap();
    let output = hubwatch_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Ajax")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("disarm")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hubwatch"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = hubwatch_cmd(home.path()).arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error mentioning foobar:\n{text}");
}

#[test]
fn test_channel_out_of_range_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["devices", "channel", "Home", "Porch", "3", "on"])
        .assert()
        .code(2);
}

#[test]
fn test_relay_rejects_unknown_state() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["devices", "relay", "Home", "Kettle", "maybe"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("maybe"));
}

#[test]
fn test_brightness_above_full_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["devices", "brightness", "Home", "Ceiling", "101"])
        .assert()
        .code(2);
}

// ── Config handling ─────────────────────────────────────────────────

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    hubwatch_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_masks_secrets() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
default_profile = "home"

[profiles.home]
login = "owner@example.com"
password_hash = "5f4dcc3b5aa765d61d8327deb882cf99"
api_key = "plain-key"
"#,
    );

    hubwatch_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.home]")
                .and(predicate::str::contains("owner@example.com"))
                .and(predicate::str::contains("plain-key").not())
                .and(predicate::str::contains("5f4dcc3b").not()),
        );
}

#[test]
fn test_config_use_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[profiles.home]\nlogin = \"owner@example.com\"\n");

    hubwatch_cmd(home.path())
        .args(["config", "use", "cabin"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("cabin"));
}

#[test]
fn test_config_use_switches_default_profile() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "[profiles.home]\nlogin = \"a@example.com\"\n\n[profiles.cabin]\nlogin = \"b@example.com\"\n",
    );

    hubwatch_cmd(home.path())
        .args(["config", "use", "cabin"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(home.path().join("hubwatch/config.toml")).unwrap();
    assert!(saved.contains("default_profile = \"cabin\""), "{saved}");
}

// ── Connected commands without an account ───────────────────────────

#[test]
fn test_status_without_config_reports_missing_profile() {
    let home = tempfile::tempdir().unwrap();
    let output = hubwatch_cmd(home.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("Profile 'default' not found"), "{text}");
}

#[test]
fn test_arm_with_unknown_profile_flag() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[profiles.home]\nlogin = \"owner@example.com\"\n");

    hubwatch_cmd(home.path())
        .args(["--profile", "cabin", "arm", "Home"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("home"));
}
