//! `outpost status`: show installation state, liveness and enrollment.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{DirectoryLock, InstallInspector, ProgressReporter};
use crate::application::services::detect::detect_state;
use crate::commands::TargetArgs;
use crate::domain::{AgentStatus, InstallLayout, LockError};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::enrollment_store::EnrollmentStore;
use crate::infra::host::LocalHost;
use crate::output::{SpinnerReporter, json};

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Run `outpost status`.
///
/// # Errors
///
/// Returns an error if the installation cannot be inspected.
pub async fn run(app: &AppContext, args: StatusArgs) -> Result<()> {
    let layout = args.target.layout()?;
    let host = LocalHost::new(TokioCommandRunner::default());

    let status = {
        let reporter = SpinnerReporter::new(&app.output);
        reporter.step("Inspecting installation");
        let status = collect(&host, &layout).await?;
        reporter.success("Inspected installation");
        status
    };

    if app.is_json() {
        return json::print(&status);
    }
    app.renderer().render_status(&status);
    Ok(())
}

/// Gather the status snapshot for `layout`.
///
/// Only the install-state probe is fatal; the liveness, flavor and
/// enrollment fields degrade to `None` when they cannot be read.
///
/// # Errors
///
/// Returns an error if the install state cannot be detected.
pub async fn collect(
    host: &(impl InstallInspector + DirectoryLock),
    layout: &InstallLayout,
) -> Result<AgentStatus> {
    let report = detect_state(host, layout).await?;
    Ok(AgentStatus {
        path: layout.top_path().to_path_buf(),
        service: layout.service_name(),
        report,
        running: probe_running(host, layout),
        flavor: read_flavor(layout),
        fleet_url: read_fleet_url(layout),
    })
}

fn probe_running(lock: &impl DirectoryLock, layout: &InstallLayout) -> Option<bool> {
    match lock.try_lock(&layout.data_dir()) {
        Ok(handle) => match lock.unlock(handle) {
            Ok(()) => Some(false),
            Err(e) => {
                tracing::debug!(error = %e, "cannot release status probe lock");
                Some(false)
            }
        },
        Err(LockError::AlreadyRunning { .. }) => Some(true),
        Err(e) => {
            tracing::debug!(error = %e, "cannot probe agent lock");
            None
        }
    }
}

fn read_flavor(layout: &InstallLayout) -> Option<String> {
    let path = layout.flavor_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => Some(content.trim().to_string()).filter(|f| !f.is_empty()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no flavor marker");
            None
        }
    }
}

fn read_fleet_url(layout: &InstallLayout) -> Option<String> {
    match EnrollmentStore::new(layout.enrollment_path()).load() {
        Ok(record) => record.and_then(|r| r.url.or(r.fleet_server_es)),
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "cannot read enrollment");
            None
        }
    }
}
