//! Tests for state detection and the point-in-time lock check.

#![allow(clippy::expect_used)]

use std::path::Path;

use anyhow::Result;
use outpost_cli::application::ports::InstallInspector;
use outpost_cli::application::services::detect::{detect_state, ensure_not_running};
use outpost_cli::domain::{InstallError, InstallLayout, InstallState};

use crate::mocks::{CallLog, FakeHost};

fn layout() -> InstallLayout {
    InstallLayout::new(Path::new("/opt"), Some("edge"))
}

#[tokio::test]
async fn every_combination_classifies() {
    let log = CallLog::default();
    let cases = [
        (FakeHost::new(&log), InstallState::NotInstalled),
        (FakeHost::installed(&log), InstallState::Installed),
        (FakeHost::broken(&log), InstallState::Broken),
        (FakeHost::package(&log), InstallState::PackageInstall),
        (
            FakeHost {
                service_registered: true,
                ..FakeHost::new(&log)
            },
            InstallState::Broken,
        ),
    ];
    for (host, expected) in cases {
        let report = detect_state(&host, &layout()).await.expect("detect");
        assert_eq!(report.state, expected);
        if expected == InstallState::Broken {
            assert!(report.reason.is_some(), "broken without a reason");
        }
    }
}

#[tokio::test]
async fn package_manager_is_not_asked_without_a_binary() {
    let log = CallLog::default();
    // The package probe would claim ownership; a missing binary must win.
    let host = FakeHost {
        package_managed: true,
        ..FakeHost::new(&log)
    };
    let report = detect_state(&host, &layout()).await.expect("detect");
    assert_eq!(report.state, InstallState::NotInstalled);
}

struct FailingInspector;

impl InstallInspector for FailingInspector {
    fn binary_present(&self, _: &InstallLayout) -> Result<bool> {
        anyhow::bail!("permission denied")
    }

    fn service_registered(&self, _: &InstallLayout) -> Result<bool> {
        Ok(false)
    }

    async fn package_managed(&self, _: &InstallLayout) -> Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn probe_errors_are_not_read_as_not_installed() {
    let err = detect_state(&FailingInspector, &layout())
        .await
        .expect_err("probe failure");
    assert!(format!("{err:#}").contains("permission denied"));
}

#[test]
fn free_lock_is_taken_and_released() {
    let log = CallLog::default();
    ensure_not_running(&FakeHost::new(&log), &layout()).expect("free");
    assert_eq!(log.calls(), ["try_lock", "unlock"]);
}

#[test]
fn held_lock_is_already_running_for_the_data_dir() {
    let log = CallLog::default();
    let host = FakeHost {
        lock_held: true,
        ..FakeHost::new(&log)
    };
    match ensure_not_running(&host, &layout()) {
        Err(InstallError::AlreadyRunning(dir)) => {
            assert_eq!(dir, Path::new("/opt/Outpost/Agent-edge/data"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
