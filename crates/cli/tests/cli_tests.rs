//! CLI integration tests

use std::process::{Command, Output};

fn ros(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ros"))
        .args(args)
        .env_remove("ROS_API_URL")
        .env_remove("ROS_TOKEN")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = ros(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Resource Optimization"), "Should show app name");
    assert!(stdout.contains("systems"), "Should show systems command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("--inventory-url"), "Should show inventory-url option");
    assert!(stdout.contains("--format"), "Should show format option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = ros(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ros"), "Should show binary name");
}

#[test]
fn test_systems_list_help() {
    let output = ros(&["systems", "list", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Systems list help should succeed");
    for option in ["--page", "--per-page", "--sort", "--direction", "--name", "--no-inventory"] {
        assert!(stdout.contains(option), "Should show {} option", option);
    }
}

#[test]
fn test_systems_recommendations_help() {
    let output = ros(&["systems", "recommendations", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("INVENTORY_ID"), "Should show id argument");
    assert!(stdout.contains("--per-page"), "Should show per-page option");
}

#[test]
fn test_invalid_command() {
    let output = ros(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_missing_inventory_id() {
    let output = ros(&["systems", "recommendations"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing argument should fail");
    assert!(stderr.contains("INVENTORY_ID"));
}

#[test]
fn test_invalid_direction_rejected() {
    let output = ros(&["systems", "list", "--direction", "sideways"]);
    assert!(!output.status.success(), "Unknown direction should fail");
}
