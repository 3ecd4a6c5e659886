//! Integration tests for `outpost enroll` against a scratch install directory.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use nix::errno::Errno;
use predicates::prelude::*;

use crate::cli_tests::outpost;

/// `<base>/Outpost/Agent` created empty, as install leaves it before enrolling.
fn scratch_install(base: &Path) -> PathBuf {
    let top = base.join("Outpost").join("Agent");
    std::fs::create_dir_all(&top).expect("top dir");
    top
}

#[test]
fn from_install_writes_the_record() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let top = scratch_install(tmp.path());

    let output = outpost()
        .args([
            "--json",
            "enroll",
            "--from-install",
            "--url",
            "https://fleet.example:8220",
            "--enrollment-token",
            "tok-123",
            "--tag",
            "edge",
        ])
        .arg("--base-path")
        .arg(tmp.path())
        .output()
        .expect("run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(summary["url"], "https://fleet.example:8220");
    assert_eq!(summary["replaced"], false);

    let record = std::fs::read_to_string(top.join("fleet.yaml")).expect("record");
    assert!(record.contains("enrollment_token: tok-123"), "{record}");
    assert!(record.contains("- edge"), "{record}");
    assert!(record.contains("enrolled_at:"), "{record}");
}

#[test]
fn repeated_enrollment_from_install_replaces_silently() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let top = scratch_install(tmp.path());

    for url in ["https://old.example", "https://new.example"] {
        outpost()
            .args(["enroll", "--from-install", "--enrollment-token", "tok"])
            .args(["--url", url])
            .arg("--base-path")
            .arg(tmp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                "Successfully enrolled the Outpost Agent into {url}."
            )));
    }

    let record = std::fs::read_to_string(top.join("fleet.yaml")).expect("record");
    assert!(record.contains("https://new.example"));
    assert!(!record.contains("https://old.example"));
}

#[test]
fn non_http_url_is_rejected_before_writing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let top = scratch_install(tmp.path());

    let output = outpost()
        .args([
            "--json",
            "enroll",
            "--from-install",
            "--url",
            "ftp://fleet.example",
            "--enrollment-token",
            "tok",
        ])
        .arg("--base-path")
        .arg(tmp.path())
        .output()
        .expect("run");

    assert_eq!(output.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(err["code"], "validation");
    assert!(err["message"].as_str().expect("message").contains("--url"));
    assert!(!top.join("fleet.yaml").exists());
}

#[test]
fn missing_token_names_the_flag() {
    let tmp = tempfile::tempdir().expect("tempdir");
    scratch_install(tmp.path());

    outpost()
        .args(["enroll", "--from-install", "--url", "https://fleet.example"])
        .arg("--base-path")
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--enrollment-token"));
}

#[test]
fn enrolling_without_an_install_points_at_install() {
    let tmp = tempfile::tempdir().expect("tempdir");

    outpost()
        .args([
            "enroll",
            "--namespace",
            "itest",
            "--url",
            "https://fleet.example",
            "--enrollment-token",
            "tok",
        ])
        .arg("--base-path")
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("outpost install"));
    assert!(!tmp.path().join("Outpost").exists());
}

#[test]
fn from_install_targets_the_install_the_binary_lives_in() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let top = tmp.path().join("Outpost").join("Agent-edge");
    std::fs::create_dir_all(&top).expect("top dir");
    let installed = top.join("outpost");
    std::fs::copy(assert_cmd::cargo::cargo_bin!("outpost"), &installed).expect("copy binary");

    let mut cmd = assert_cmd::Command::new(&installed);
    cmd.env("NO_COLOR", "1")
        .env("OUTPOST_BASE_PATH", tmp.path())
        .env_remove("OUTPOST_URL")
        .env_remove("OUTPOST_ENROLLMENT_TOKEN")
        .args([
            "enroll",
            "--from-install",
            "--url",
            "https://fleet.example",
            "--enrollment-token",
            "tok",
        ]);
    // A fresh copy can be briefly busy while another test thread forks.
    let output = (0..10)
        .find_map(|_| match cmd.output() {
            Err(e) if e.raw_os_error() == Some(Errno::ETXTBSY as i32) => {
                std::thread::sleep(std::time::Duration::from_millis(50));
                None
            }
            other => Some(other),
        })
        .expect("binary stayed busy")
        .expect("run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(top.join("fleet.yaml").exists());
    assert!(!tmp.path().join("Outpost").join("Agent").exists());
}
