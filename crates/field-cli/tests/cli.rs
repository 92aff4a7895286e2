// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn field(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("field").unwrap();
    cmd.arg("--config-dir").arg(config_dir.path());
    cmd
}

const SMALL: [&str; 9] = [
    "--scenario", "gradient", "--width", "3", "--height", "3", "--radius", "0.15", "--until",
];

fn small_run(config_dir: &TempDir, seed: &str) -> String {
    let out = field(config_dir)
        .arg("run")
        .args(SMALL)
        .args(["2", "--seed", seed])
        .output()
        .unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap()
}

fn digest_line(report: &str) -> String {
    report
        .lines()
        .find(|l| l.starts_with("digest: "))
        .unwrap()
        .to_owned()
}

#[test]
fn gradient_run_prints_summary() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .arg("run")
        .args(SMALL)
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("scenario: gradient"))
        .stdout(predicate::str::contains("nodes: 9"))
        .stdout(predicate::str::contains("reached nodes: 9"));
}

#[test]
fn same_seed_same_digest() {
    let dir = TempDir::new().unwrap();
    let a = small_run(&dir, "7");
    let b = small_run(&dir, "7");
    assert_eq!(digest_line(&a), digest_line(&b));
}

#[test]
fn saved_profile_is_reused() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .arg("run")
        .args(SMALL)
        .args(["1", "--save-profile", "tiny"])
        .assert()
        .success();
    assert!(dir.path().join("tiny.json").exists());

    field(&dir)
        .args(["profile", "show", "tiny"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"width\": 3"))
        .stdout(predicate::str::contains("\"scenario\": \"gradient\""));

    field(&dir)
        .args(["run", "--profile", "tiny"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes: 9"));
}

#[test]
fn flags_override_profile() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .arg("run")
        .args(SMALL)
        .args(["1", "--save-profile", "tiny"])
        .assert()
        .success();
    field(&dir)
        .args(["run", "--profile", "tiny", "--width", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes: 6"));
}

#[test]
fn out_writes_final_frame() {
    let dir = TempDir::new().unwrap();
    let frame = dir.path().join("frame.json");
    field(&dir)
        .arg("run")
        .args(SMALL)
        .arg("1")
        .arg("--out")
        .arg(&frame)
        .arg("--pretty")
        .assert()
        .success();
    let text = std::fs::read_to_string(&frame).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 9);
    assert_eq!(json["nodes"][0]["result"].as_f64(), Some(0.0));
}

#[test]
fn missing_profile_fails() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .args(["run", "--profile", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile"));
}

#[test]
fn empty_lattice_fails() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .args(["run", "--width", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lattice"));
}

#[test]
fn defaults_are_printable() {
    let dir = TempDir::new().unwrap();
    field(&dir)
        .args(["profile", "defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"seed\": 42"));
}
