use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn reportflow() -> Command {
    let mut cmd = Command::cargo_bin("reportflow").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn schema_prints_config_properties() {
    reportflow()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"properties\""))
        .stdout(predicate::str::contains("materials_dir"));
}

#[test]
fn materials_lists_files_without_models() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.md"), "# Notes\nSome text").unwrap();
    fs::write(dir.path().join("data.bin"), [0u8, 1, 2]).unwrap();

    reportflow()
        .current_dir(dir.path())
        .args(["materials", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.md"))
        .stdout(predicate::str::contains("markdown"))
        .stdout(predicate::str::contains("2 files (1 usable)"));
}

#[test]
fn run_without_topic_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    reportflow()
        .current_dir(dir.path())
        .args(["run", "--materials", "materials"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("topic is required"));
}

#[test]
fn run_reports_failing_stage() {
    let dir = tempfile::tempdir().unwrap();
    reportflow()
        .current_dir(dir.path())
        .args(["run", "--topic", "Rust", "--materials", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stage 'load'"))
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn dry_run_prints_stage_plan() {
    let dir = tempfile::tempdir().unwrap();
    reportflow()
        .current_dir(dir.path())
        .args(["run", "--topic", "Rust", "--provider", "claude_cli", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "load -> analyze -> plan -> save_outline -> write -> assemble -> summary",
        ));
}
