//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a fresh temp dir, so
//! config and alarm files never touch the real user directory. Only commands
//! that work without a backend are exercised.

use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &tempfile::TempDir, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_medminder"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("MEDMINDER_ENV")
        .env_remove("MEDMINDER_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn home() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp home")
}

#[test]
fn test_med_times() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["med", "times", "--frequency", "8", "--start", "08:00"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "08:00 16:00 00:00");
}

#[test]
fn test_med_times_bad_start_falls_back() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["med", "times", "--frequency", "12", "--start", "nope"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "08:00 20:00");
}

#[test]
fn test_med_presets() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["med", "presets"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().count(), 5);
}

#[test]
fn test_config_set_get() {
    let home = home();
    let (_, _, code) = run_cli(&home, &["config", "set", "notifications.reminder_minutes", "30"]);
    assert_eq!(code, 0);
    let (stdout, _, code) = run_cli(&home, &["config", "get", "notifications.reminder_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "30");
}

#[test]
fn test_config_get_unset_user_id() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["config", "get", "session.user_id"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "");
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = home();
    let (_, stderr, code) = run_cli(&home, &["config", "set", "notifications.volume", "3"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_list_json() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["config", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["notifications"]["enabled"], serde_json::Value::Bool(true));
}

#[test]
fn test_alarms_list_empty() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["alarms", "list"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "no alarms");
}

#[test]
fn test_alarms_fire_nothing_due() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["alarms", "fire"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0 due, 0 shown");
}

#[test]
fn test_brightness() {
    let home = home();
    let (stdout, _, code) = run_cli(&home, &["brightness", "10", "10000", "--alpha", "1"]);
    assert_eq!(code, 0);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("0.100"));
    assert!(lines[1].ends_with("1.000"));
}

#[test]
fn test_auth_without_backend_url_fails() {
    let home = home();
    let (_, stderr, code) = run_cli(&home, &["auth", "status"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("backend.url"));
}
