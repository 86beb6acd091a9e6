//! Integration tests for the `recur` CLI binary.
//!
//! These exercise the expand, describe, canonical and recurrence-id
//! subcommands through the actual binary, including stdin/stdout piping,
//! file I/O, flag precedence and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to the calendar.json fixture (document with options).
fn calendar_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/calendar.json")
}

/// Helper: path to the events.json fixture (bare array of events).
fn events_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/events.json")
}

fn pattern_json_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/pattern.json")
}

const Q1: [&str; 4] = [
    "--from",
    "2024-01-01T00:00:00Z",
    "--to",
    "2024-03-31T23:59:59Z",
];

fn recur() -> Command {
    Command::cargo_bin("recur").unwrap()
}

/// Helper: run `recur expand` with extra args and parse stdout as JSON.
fn expand_json(args: &[&str]) -> Value {
    let output = recur()
        .arg("expand")
        .args(args)
        .output()
        .expect("recur must run");
    assert!(output.status.success(), "recur expand failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn instance_ids(value: &Value) -> Vec<String> {
    value["instances"]
        .as_array()
        .expect("instances array")
        .iter()
        .map(|i| i["id"].as_str().expect("id").to_string())
        .collect()
}

fn diagnostic_kinds(value: &Value) -> Vec<(String, String)> {
    value["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .map(|d| {
            (
                d["event_id"].as_str().expect("event_id").to_string(),
                d["kind"].as_str().expect("kind").to_string(),
            )
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_calendar_file() {
    let mut args = vec!["-i", calendar_json_path()];
    args.extend(Q1);
    let value = expand_json(&args);

    assert_eq!(
        instance_ids(&value),
        [
            "offsite",
            "ticker",
            "standup#2024-01-01T09:00:00Z",
            "standup#2024-01-15T09:00:00Z",
            "review#2024-01-10T14:00:00",
            "review#2024-02-10T14:00:00",
            "review#2024-03-10T14:00:00",
        ]
    );
    assert_eq!(
        diagnostic_kinds(&value),
        [("ticker".to_string(), "unsupported_frequency".to_string())]
    );

    let moved = &value["instances"][5];
    assert_eq!(moved["title"], "Design review (moved)");
    assert_eq!(moved["location"], "Room 4");
    assert_eq!(moved["start"], "2024-02-12T10:00:00-05:00");
    assert_eq!(moved["end"], "2024-02-12T11:00:00-05:00");
    assert_eq!(moved["recurrence_id"], "2024-02-10T14:00:00");
}

#[test]
fn expand_stdin_bare_array() {
    let input = std::fs::read_to_string(events_json_path()).expect("events.json fixture must exist");
    let value = {
        let output = recur()
            .args([
                "expand",
                "--from",
                "2024-01-01T00:00:00+01:00",
                "--to",
                "2024-01-31T23:59:59+01:00",
            ])
            .write_stdin(input)
            .output()
            .expect("recur must run");
        assert!(output.status.success());
        serde_json::from_slice::<Value>(&output.stdout).unwrap()
    };

    // Weekly periods match on the period start only: every Monday.
    assert_eq!(
        instance_ids(&value),
        [
            "gym#2024-01-01T17:00:00Z",
            "gym#2024-01-08T17:00:00Z",
            "gym#2024-01-15T17:00:00Z",
            "gym#2024-01-22T17:00:00Z",
            "gym#2024-01-29T17:00:00Z",
        ]
    );
}

#[test]
fn expand_every_listed_day_flag() {
    let value = expand_json(&[
        "-i",
        events_json_path(),
        "--from",
        "2024-01-01T00:00:00+01:00",
        "--to",
        "2024-01-31T23:59:59+01:00",
        "--every-listed-day",
    ]);
    assert_eq!(
        instance_ids(&value),
        [
            "gym#2024-01-01T17:00:00Z",
            "gym#2024-01-03T17:00:00Z",
            "gym#2024-01-05T17:00:00Z",
            "gym#2024-01-08T17:00:00Z",
            "gym#2024-01-10T17:00:00Z",
            "gym#2024-01-12T17:00:00Z",
        ]
    );
}

#[test]
fn expand_report_orphans_flag() {
    let mut args = vec!["-i", calendar_json_path(), "--report-orphans"];
    args.extend(Q1);
    let value = expand_json(&args);

    assert_eq!(
        diagnostic_kinds(&value),
        [
            ("review".to_string(), "orphaned_override".to_string()),
            ("ticker".to_string(), "unsupported_frequency".to_string()),
        ]
    );
    assert_eq!(value["diagnostics"][0]["recurrence_id"], "2024-03-10T19:00:00Z");
}

#[test]
fn expand_max_iterations_flag_overrides_document() {
    let mut args = vec!["-i", calendar_json_path(), "--max-iterations", "1"];
    args.extend(Q1);
    let value = expand_json(&args);

    let capped: Vec<&Value> = value["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["kind"] == "iteration_cap_reached")
        .collect();
    assert_eq!(capped.len(), 2);
    assert!(capped.iter().all(|d| d["max_iterations"] == 1));
}

#[test]
fn expand_file_to_file_pretty() {
    let output_path = "/tmp/recur-test-expand-output.json";
    let _ = std::fs::remove_file(output_path);

    let mut args = vec!["expand", "-i", calendar_json_path(), "-o", output_path, "--pretty"];
    args.extend(Q1);
    recur().args(&args).assert().success().stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(output_path).expect("output file must exist");
    assert!(content.contains("\n  \"instances\": ["));
    let value: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(instance_ids(&value).len(), 7);

    let _ = std::fs::remove_file(output_path);
}

#[test]
fn expand_unsupported_rule_warns_on_stderr() {
    let mut args = vec!["expand", "-i", calendar_json_path()];
    args.extend(Q1);
    recur()
        .args(&args)
        .assert()
        .success()
        .stderr(predicate::str::contains("unusable recurrence rule"));
}

#[test]
fn expand_invalid_json_fails() {
    recur()
        .args(["expand", "--from", "2024-01-01T00:00:00Z", "--to", "2024-01-02T00:00:00Z"])
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse events JSON"));
}

#[test]
fn expand_invalid_window_fails() {
    recur()
        .args(["expand", "--from", "yesterday", "--to", "2024-01-02T00:00:00Z"])
        .write_stdin("[]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid datetime"));
}

#[test]
fn expand_missing_file_fails() {
    let mut args = vec!["expand", "-i", "/tmp/recur-does-not-exist.json"];
    args.extend(Q1);
    recur()
        .args(&args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Describe / canonical
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn describe_weekly_rule() {
    let output = recur()
        .args(["describe", "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=8"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["frequency"], "weekly");
    assert_eq!(value["interval"], 2);
    assert_eq!(value["ends"]["type"], "after");
    assert_eq!(value["ends"]["count"], 8);
    assert_eq!(value["week_days"], serde_json::json!(["Mon", "Wed"]));
}

#[test]
fn describe_sub_daily_rule_fails() {
    recur()
        .args(["describe", "FREQ=SECONDLY"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported frequency: SECONDLY"));
}

#[test]
fn canonical_from_file() {
    recur()
        .args(["canonical", "-i", pattern_json_path()])
        .assert()
        .success()
        .stdout("FREQ=YEARLY;INTERVAL=2;BYMONTH=3,9;UNTIL=20301231\n");
}

#[test]
fn canonical_non_repeating_prints_empty_line() {
    recur()
        .arg("canonical")
        .write_stdin(r#"{"frequency":"none"}"#)
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn canonical_rejects_out_of_range_month() {
    recur()
        .arg("canonical")
        .write_stdin(r#"{"frequency":"yearly","months":[13]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BYMONTH out of range: 13"));
}

#[test]
fn describe_then_canonical_roundtrip() {
    let rule = "FREQ=MONTHLY;BYMONTHDAY=-1;UNTIL=20241231T235959Z";
    let described = recur().args(["describe", rule]).output().unwrap();
    assert!(described.status.success());

    recur()
        .arg("canonical")
        .write_stdin(described.stdout)
        .assert()
        .success()
        .stdout(format!("{}\n", rule));
}

// ─────────────────────────────────────────────────────────────────────────────
// Recurrence id
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn recurrence_id_with_timezone_is_local() {
    recur()
        .args([
            "recurrence-id",
            "--start",
            "2024-01-08T09:00:00-05:00",
            "--timezone",
            "America/New_York",
        ])
        .assert()
        .success()
        .stdout("2024-01-08T09:00:00\n");
}

#[test]
fn recurrence_id_without_timezone_is_utc() {
    recur()
        .args(["recurrence-id", "--start", "2024-01-08T09:00:00-05:00"])
        .assert()
        .success()
        .stdout("2024-01-08T14:00:00Z\n");
}

#[test]
fn no_subcommand_shows_usage() {
    recur()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
