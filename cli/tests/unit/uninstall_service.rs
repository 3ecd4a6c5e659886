//! Tests for the embedded uninstall routine.

#![allow(clippy::expect_used)]

use std::path::Path;

use outpost_cli::application::services::uninstall::{
    UninstallOptions, UninstallOutcome, uninstall,
};
use outpost_cli::domain::{InstallError, InstallLayout, InstallState};

use crate::mocks::{CallLog, FakeHost, RecordingInstaller, RecordingReporter, ScriptedPrompter};

fn opts(force: bool, non_interactive: bool) -> UninstallOptions {
    UninstallOptions {
        layout: InstallLayout::new(Path::new("/opt"), None),
        force,
        non_interactive,
    }
}

fn install_error(err: &anyhow::Error) -> &InstallError {
    err.downcast_ref::<InstallError>()
        .unwrap_or_else(|| panic!("expected InstallError, got: {err:#}"))
}

#[tokio::test]
async fn forced_uninstall_removes_without_prompt() {
    let log = CallLog::default();
    let host = FakeHost::installed(&log);
    let installer = RecordingInstaller::new(&log);
    let prompter = ScriptedPrompter::new();
    let reporter = RecordingReporter::new();

    let outcome = uninstall(&host, &installer, &prompter, &reporter, opts(true, true))
        .await
        .expect("uninstall");

    assert!(matches!(
        outcome,
        UninstallOutcome::Removed { prior } if prior.state == InstallState::Installed
    ));
    assert_eq!(log.calls(), ["uninstall"]);
    assert!(prompter.asked().is_empty());
}

#[tokio::test]
async fn nothing_installed_is_not_an_error() {
    let log = CallLog::default();
    let host = FakeHost::new(&log);
    let installer = RecordingInstaller::new(&log);
    let reporter = RecordingReporter::new();

    let outcome = uninstall(&host, &installer, &ScriptedPrompter::new(), &reporter, opts(true, true))
        .await
        .expect("uninstall");

    assert_eq!(outcome, UninstallOutcome::NotInstalled);
    assert!(log.calls().is_empty());
    assert_eq!(reporter.infos().len(), 1);
}

#[tokio::test]
async fn package_install_is_refused() {
    let log = CallLog::default();
    let host = FakeHost::package(&log);
    let installer = RecordingInstaller::new(&log);

    let err = uninstall(
        &host,
        &installer,
        &ScriptedPrompter::new(),
        &RecordingReporter::new(),
        opts(true, true),
    )
    .await
    .expect_err("package managed");

    assert!(matches!(install_error(&err), InstallError::PackageManaged(_)));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn non_interactive_requires_force() {
    let log = CallLog::default();
    let host = FakeHost::installed(&log);
    let installer = RecordingInstaller::new(&log);

    let err = uninstall(
        &host,
        &installer,
        &ScriptedPrompter::new(),
        &RecordingReporter::new(),
        opts(false, true),
    )
    .await
    .expect_err("needs force");

    assert!(matches!(install_error(&err), InstallError::Validation(_)));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn declining_keeps_the_install() {
    let log = CallLog::default();
    let host = FakeHost::installed(&log);
    let installer = RecordingInstaller::new(&log);
    let prompter = ScriptedPrompter::new().confirm_with(false);

    let err = uninstall(
        &host,
        &installer,
        &prompter,
        &RecordingReporter::new(),
        opts(false, false),
    )
    .await
    .expect_err("declined");

    assert!(install_error(&err).is_cancellation());
    assert!(log.calls().is_empty());
    assert_eq!(prompter.asked().len(), 1);
}

#[tokio::test]
async fn broken_install_without_service_checks_the_lock() {
    let log = CallLog::default();
    let host = FakeHost {
        lock_held: true,
        ..FakeHost::broken(&log)
    };
    let installer = RecordingInstaller::new(&log);

    let err = uninstall(
        &host,
        &installer,
        &ScriptedPrompter::new(),
        &RecordingReporter::new(),
        opts(true, false),
    )
    .await
    .expect_err("stray agent");

    assert!(matches!(install_error(&err), InstallError::AlreadyRunning(_)));
    assert_eq!(log.calls(), ["try_lock"]);
}

#[tokio::test]
async fn registered_service_skips_the_lock_check() {
    let log = CallLog::default();
    let host = FakeHost {
        lock_held: true,
        ..FakeHost::installed(&log)
    };
    let installer = RecordingInstaller::new(&log);

    uninstall(
        &host,
        &installer,
        &ScriptedPrompter::new(),
        &RecordingReporter::new(),
        opts(true, false),
    )
    .await
    .expect("uninstall");

    assert_eq!(log.calls(), ["uninstall"]);
}

#[tokio::test]
async fn installer_failure_is_uninstall_failed() {
    let log = CallLog::default();
    let host = FakeHost::installed(&log);
    let mut installer = RecordingInstaller::new(&log);
    installer.fail_uninstall = true;

    let err = uninstall(
        &host,
        &installer,
        &ScriptedPrompter::new(),
        &RecordingReporter::new(),
        opts(true, false),
    )
    .await
    .expect_err("failed");

    assert!(matches!(install_error(&err), InstallError::UninstallFailed(_)));
}
