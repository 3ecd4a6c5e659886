//! Installation state detection.
//!
//! Read-only: every probe goes through `InstallInspector`, and probe failures
//! are returned rather than read as "not installed".

use anyhow::{Context, Result};

use crate::application::ports::{DirectoryLock, InstallInspector};
use crate::domain::{InstallError, InstallLayout, StateReport, classify};

/// Classify the host for `layout`.
///
/// # Errors
///
/// Returns an error if any probe fails.
pub async fn detect_state(
    inspector: &impl InstallInspector,
    layout: &InstallLayout,
) -> Result<StateReport> {
    let binary_present = inspector
        .binary_present(layout)
        .context("checking for the installed agent binary")?;
    let service_registered = inspector
        .service_registered(layout)
        .context("checking the service registration")?;
    let package_managed = if binary_present {
        inspector
            .package_managed(layout)
            .await
            .context("querying the package manager")?
    } else {
        false
    };

    let report = classify(binary_present, service_registered, package_managed);
    tracing::debug!(
        path = %layout.top_path().display(),
        binary_present,
        service_registered,
        package_managed,
        state = %report.state,
        "classified installation"
    );
    Ok(report)
}

/// Point-in-time check that nothing holds the data-directory lock.
///
/// The lock is released before returning; it does not cover the rest of
/// the transaction.
///
/// # Errors
///
/// `InstallError::AlreadyRunning` when the lock is held, `InstallError::Lock`
/// for other lock failures.
pub fn ensure_not_running(
    locker: &impl DirectoryLock,
    layout: &InstallLayout,
) -> Result<(), InstallError> {
    let handle = locker.try_lock(&layout.data_dir())?;
    locker.unlock(handle)?;
    Ok(())
}
