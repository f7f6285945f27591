#![cfg(feature = "cli_api")]

mod common;

use assert_cmd::Command;
use common::{release_edges, release_items};
use predicates::str::contains as str_contains;
use std::path::Path;
use tempfile::{TempDir, tempdir};
use timeline_blueprint::WorkItemSnapshot;

#[allow(deprecated)]
fn run_cli(store: &Path, script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env("BLUEPRINT_STORE_DIR", store)
        .write_stdin(script.to_string())
        .assert()
}

fn write_snapshot(dir: &TempDir) -> String {
    let snapshot = WorkItemSnapshot {
        items: release_items(),
        edges: release_edges(),
    };
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn cli_calendar_arithmetic() {
    let dir = tempdir().unwrap();
    run_cli(
        dir.path(),
        "enddate 2024-01-04 5\nworkdays 2024-01-01 2024-01-14\nnext 2024-01-06\nquit\n",
    )
    .success()
    .stdout(str_contains("2024-01-10 (7 calendar days)"))
    .stdout(str_contains("10\n"))
    .stdout(str_contains("2024-01-08"));
}

#[test]
fn cli_enddate_rejects_huge_counts() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "enddate 2024-01-04 -9223372036854775808\nquit\n")
        .success()
        .stdout(str_contains("Workday count out of range"));
}

#[test]
fn cli_holiday_changes_day_report() {
    let dir = tempdir().unwrap();
    run_cli(
        dir.path(),
        "holiday add 2024-01-02\nday 2024-01-02\nholiday remove 2024-01-02\nday 2024-01-02\nquit\n",
    )
    .success()
    .stdout(str_contains("holiday 2024-01-02 added."))
    .stdout(str_contains("workday=false holiday=true"))
    .stdout(str_contains("holiday 2024-01-02 removed."))
    .stdout(str_contains("workday=true holiday=false"));
}

#[test]
fn cli_reports_bad_input() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "day tomorrow\nfrobnicate\ntemplate show missing\nquit\n")
        .success()
        .stdout(str_contains("Usage: day <date>"))
        .stdout(str_contains("Unknown command"))
        .stdout(str_contains("Template missing not found."));
}

#[test]
fn cli_capture_then_preview() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    let snapshot = write_snapshot(&dir);

    run_cli(
        &store,
        &format!("items load {snapshot}\nitems show\ncapture epic-1 Release checklist\ntemplates\nquit\n"),
    )
    .success()
    .stdout(str_contains("Loaded 5 items and 4 edges."))
    .stdout(str_contains("  issue-1 Design"))
    .stdout(str_contains("Captured template"))
    .stdout(str_contains("Release checklist"));

    let id = std::fs::read_dir(&store)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            path.file_stem().map(|s| s.to_string_lossy().to_string())
        })
        .next()
        .expect("stored template");

    run_cli(
        &store,
        &format!("preview {id} 2024-03-01 [Q2]\ntemplate rename {id} Spring plan\ntemplate delete {id}\ntemplates\nquit\n"),
    )
    .success()
    .stdout(str_contains("Preview (success=true"))
    .stdout(str_contains("[Q2] Release 1.0"))
    .stdout(str_contains("renamed to 'Spring plan'"))
    .stdout(str_contains(format!("Deleted template {id}.")))
    .stdout(str_contains("No templates stored."));
}
