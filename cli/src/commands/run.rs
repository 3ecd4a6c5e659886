//! `outpost run`: service entry point used by the systemd unit.
//!
//! Holds the data-directory lock until SIGTERM or SIGINT, which is what
//! installers observe as "already running". Fleet communication itself lives
//! in the remote client; this loop only tracks the enrollment record.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal::unix::{SignalKind, signal};

use crate::application::ports::DirectoryLock;
use crate::commands::TargetArgs;
use crate::domain::{EnrollmentRecord, InstallError};
use crate::infra::enrollment_store::EnrollmentStore;
use crate::infra::lock::FileLocker;

const ENROLLMENT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Run the agent until the service manager stops it.
///
/// # Errors
///
/// Returns `AlreadyRunning` if another agent holds the lock, or an error if
/// signal handlers cannot be installed.
pub async fn run(args: RunArgs) -> Result<()> {
    let layout = args.target.layout()?;
    let data_dir = layout.data_dir();
    let handle = FileLocker
        .try_lock(&data_dir)
        .map_err(InstallError::from)?;
    if !handle.is_held() {
        return Err(InstallError::validation(format!(
            "data directory {} is missing, reinstall the agent",
            data_dir.display()
        ))
        .into());
    }
    tracing::info!(path = %layout.top_path().display(), "agent started");

    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut int = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let store = EnrollmentStore::new(layout.enrollment_path());
    let mut ticker = tokio::time::interval(ENROLLMENT_POLL_INTERVAL);
    let mut current: Option<EnrollmentRecord> = None;

    loop {
        tokio::select! {
            _ = term.recv() => break,
            _ = int.recv() => break,
            _ = ticker.tick() => match store.load() {
                Ok(record) if record != current => {
                    log_enrollment(record.as_ref());
                    current = record;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "cannot read enrollment"),
            },
        }
    }

    tracing::info!("received shutdown signal");
    FileLocker.unlock(handle).map_err(InstallError::from)?;
    Ok(())
}

fn log_enrollment(record: Option<&EnrollmentRecord>) {
    match record {
        Some(r) => tracing::info!(
            url = r.url.as_deref().unwrap_or("-"),
            fleet_server = r.fleet_server_es.is_some(),
            enrolled_at = %r.enrolled_at,
            "enrollment loaded"
        ),
        None => tracing::info!("running standalone, not enrolled"),
    }
}
