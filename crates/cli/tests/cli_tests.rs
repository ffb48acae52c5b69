//! CLI integration tests

use std::process::Command;

fn nss() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nss"))
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = nss().arg("--help").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("namespace scheduler"), "Should show app description");
    assert!(stdout.contains("up"), "Should show up command");
    assert!(stdout.contains("down"), "Should show down command");
    assert!(stdout.contains("state"), "Should show state command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = nss().arg("--version").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("nss"), "Should show binary name");
}

/// Test up subcommand help
#[test]
fn test_up_help() {
    let output = nss()
        .args(["up", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Up help should succeed");
    assert!(stdout.contains("--batch-size"), "Should show batch size option");
    assert!(
        stdout.contains("--batch-interval"),
        "Should show batch interval option"
    );
}

/// Test that down without patterns is rejected
#[test]
fn test_down_requires_patterns() {
    let output = nss().arg("down").output().expect("Failed to execute command");

    assert!(!output.status.success(), "Down without patterns should fail");
}

/// Test that an unreachable daemon is reported as an error
#[test]
fn test_unreachable_api_fails() {
    let output = nss()
        .args(["--api-url", "http://127.0.0.1:1", "state", "team-a"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unreachable API should fail");
    assert!(stderr.contains("Failed to send request"));
}
