// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

use assert_cmd::Command;
use predicates::prelude::*;

fn buildflow() -> Command {
    let mut cmd = Command::cargo_bin("buildflow").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn commands_json_lists_build() {
    buildflow()
        .args(["commands", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"build\""));
}

#[test]
fn init_writes_config_and_refuses_second_time() {
    let dir = tempfile::tempdir().unwrap();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created .buildflow.yaml"));

    assert!(dir.path().join(".buildflow.yaml").is_file());
    assert!(dir.path().join("patches").is_dir());

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .arg("init")
        .assert()
        .failure();
}

#[test]
fn validate_accepts_generated_config() {
    let dir = tempfile::tempdir().unwrap();
    buildflow().arg("-C").arg(dir.path()).arg("init").assert().success();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file parses"));
}

#[test]
fn validate_rejects_bad_checksum() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("build.yaml"),
        "name: cmake\nchecksum: nothex\n",
    )
    .unwrap();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .args(["validate", "build.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("BLAKE3"));
}

#[test]
fn graph_text_shows_stage_order() {
    let dir = tempfile::tempdir().unwrap();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .arg("graph")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. fetch - Download the source archive"))
        .stdout(predicate::str::contains(
            "compile - Build and install [depends: bootstrap, configure]",
        ));
}

#[test]
fn graph_dot_has_edges() {
    let dir = tempfile::tempdir().unwrap();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .args(["graph", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fetch\" -> \"extract\";"))
        .stdout(predicate::str::contains("\"configure\" -> \"compile\";"));
}

#[test]
fn build_dry_run_prints_plan() {
    let dir = tempfile::tempdir().unwrap();

    buildflow()
        .arg("-C")
        .arg(dir.path())
        .args(["build", "--dry-run", "--strategy", "bootstrap", "-j", "2"])
        .args(["--temp-root", "tmp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build plan for cmake 3.26.4"))
        .stdout(predicate::str::contains("cmake-3.26.4.tar.gz"))
        .stdout(predicate::str::contains("2 jobs, forced"));

    assert!(!dir.path().join("tmp").exists());
}

#[test]
fn unknown_strategy_is_rejected() {
    buildflow()
        .args(["build", "--strategy", "magic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown strategy"));
}
