//! `outpost install`: install the agent as a system service.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::install::{InstallOutcome, Phase, install};
use crate::commands::EnrollmentArgs;
use crate::domain::layout::{BASE_PATH_ENV, DEFAULT_BASE_PATH, SERVICE_DISPLAY_NAME};
use crate::domain::{CustomAccount, InstallError, InstallOptions, InstallState};
use crate::infra::accounts::running_as_root;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::host::LocalHost;
use crate::infra::process::ProcessDelegate;
use crate::infra::systemd::SystemdInstaller;
use crate::output::{TerminalReporter, json};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Directory the agent is installed under
    #[arg(long, env = BASE_PATH_ENV, default_value = DEFAULT_BASE_PATH)]
    pub base_path: PathBuf,

    /// Overwrite an existing installation without prompting
    #[arg(short, long)]
    pub force: bool,

    /// Never prompt; fail when required input is missing
    #[arg(short = 'n', long)]
    pub non_interactive: bool,

    /// Run the agent as a dedicated unprivileged account
    #[arg(long)]
    pub unprivileged: bool,

    /// Install the flavor that includes server components
    #[arg(long)]
    pub install_servers: bool,

    /// Install side by side under a namespace (experimental)
    #[arg(long, hide = true)]
    pub namespace: Option<String>,

    /// Install into the development namespace (experimental)
    #[arg(long, hide = true)]
    pub develop: bool,

    /// Remove an existing install with this binary instead of the installed one
    #[arg(long, hide = true)]
    pub run_uninstall_from_binary: bool,

    /// Custom account to run as (requires --unprivileged)
    #[arg(long)]
    pub user: Option<String>,

    /// Custom group to run as (requires --unprivileged)
    #[arg(long)]
    pub group: Option<String>,

    /// Password of the custom account, where the platform needs one
    #[arg(long, hide_env_values = true)]
    pub password: Option<String>,

    /// Install without starting the service or enrolling
    #[arg(long)]
    pub delay_enroll: bool,

    #[command(flatten)]
    pub enrollment: EnrollmentArgs,
}

impl InstallArgs {
    /// Build the typed option set the install transaction consumes.
    #[must_use]
    pub fn into_options(self, env_non_interactive: bool) -> InstallOptions {
        InstallOptions {
            base_path: self.base_path,
            unprivileged: self.unprivileged,
            install_servers: self.install_servers,
            namespace: self.namespace,
            develop: self.develop,
            run_uninstall_from_binary: self.run_uninstall_from_binary,
            account: CustomAccount {
                user: self.user,
                group: self.group,
                password: self.password,
            },
            force: self.force,
            non_interactive: self.non_interactive || env_non_interactive,
            enrollment: self.enrollment.into_flags(self.delay_enroll),
        }
    }
}

/// Run `outpost install`.
///
/// # Errors
///
/// Returns the `InstallError` that stopped the transaction.
pub async fn run(app: &AppContext, args: InstallArgs) -> Result<()> {
    if !running_as_root() {
        return Err(InstallError::validation(
            "installation requires root privileges, re-run with sudo",
        )
        .into());
    }

    let host = LocalHost::new(TokioCommandRunner::default());
    let installer = SystemdInstaller::new(TokioCommandRunner::default())?;
    let reporter = TerminalReporter::new(&app.output);
    let opts = args.into_options(app.non_interactive);

    let outcome = install(&host, &installer, &ProcessDelegate, app, &reporter, opts).await?;

    if app.is_json() {
        return json::print(&summary(&outcome));
    }
    app.output.success(&completion_message(&outcome));
    Ok(())
}

fn summary(outcome: &InstallOutcome) -> serde_json::Value {
    serde_json::json!({
        "path": outcome.path,
        "prior_state": outcome.prior.state,
        "installed": outcome.reached(Phase::Installed),
        "service_started": outcome.reached(Phase::ServiceStarted),
        "enrolled": outcome.reached(Phase::Enrolled),
        "owner": outcome.ownership,
    })
}

fn completion_message(outcome: &InstallOutcome) -> String {
    if outcome.prior.state == InstallState::PackageInstall {
        if outcome.reached(Phase::Enrolled) {
            return format!("{SERVICE_DISPLAY_NAME} package has been successfully enrolled.");
        }
        return format!("{SERVICE_DISPLAY_NAME} package is installed, nothing was changed.");
    }
    format!(
        "{SERVICE_DISPLAY_NAME} has been successfully installed at {}.",
        outcome.path.display()
    )
}
