//! `outpost uninstall`: remove the agent and its service.
//!
//! Also the entry point newer installers use (`uninstall --force`) to have
//! an installed binary remove itself.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::uninstall::{UninstallOptions, UninstallOutcome, uninstall};
use crate::commands::TargetArgs;
use crate::domain::InstallError;
use crate::infra::accounts::running_as_root;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::host::LocalHost;
use crate::infra::systemd::SystemdInstaller;
use crate::output::{SpinnerReporter, json};

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Uninstall without prompting
    #[arg(short, long)]
    pub force: bool,

    /// Never prompt (requires --force)
    #[arg(short = 'n', long)]
    pub non_interactive: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Run `outpost uninstall`.
///
/// # Errors
///
/// Returns an error if the installation cannot be removed.
pub async fn run(app: &AppContext, args: UninstallArgs) -> Result<()> {
    if !running_as_root() {
        return Err(InstallError::validation(
            "uninstall requires root privileges, re-run with sudo",
        )
        .into());
    }

    let layout = args.target.layout()?;
    let host = LocalHost::new(TokioCommandRunner::default());
    let installer = SystemdInstaller::new(TokioCommandRunner::default())?;
    let reporter = SpinnerReporter::new(&app.output);
    let opts = UninstallOptions {
        layout,
        force: args.force,
        non_interactive: args.non_interactive || app.non_interactive,
    };
    let path = opts.layout.top_path().to_path_buf();

    let outcome = uninstall(&host, &installer, app, &reporter, opts).await?;

    if app.is_json() {
        let removed = matches!(outcome, UninstallOutcome::Removed { .. });
        return json::print(&serde_json::json!({ "path": path, "removed": removed }));
    }
    Ok(())
}
