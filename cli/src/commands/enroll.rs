//! `outpost enroll`: persist Fleet enrollment parameters for the agent.
//!
//! The installer calls this through the self-invocation contract with
//! `--from-install`; operators can also run it on an installed agent.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::Prompter;
use crate::application::services::detect::detect_state;
use crate::commands::{EnrollmentArgs, TargetArgs};
use crate::domain::{EnrollmentRecord, InstallError, InstallState};
use crate::infra::accounts::running_as_root;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::enrollment_store::EnrollmentStore;
use crate::infra::host::LocalHost;
use crate::infra::permissions::match_owner;
use crate::output::json;

#[derive(Args, Debug)]
pub struct EnrollArgs {
    /// Called by `install`; skips installation preconditions
    #[arg(long, hide = true)]
    pub from_install: bool,

    /// Replace an existing enrollment without prompting
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub enrollment: EnrollmentArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Run `outpost enroll`.
///
/// # Errors
///
/// Returns an error if the flags are incomplete, the agent is not installed,
/// or the record cannot be written.
pub async fn run(app: &AppContext, args: EnrollArgs) -> Result<()> {
    let layout = if args.from_install {
        args.target.installed_layout()?
    } else {
        args.target.layout()?
    };
    let record = EnrollmentRecord::from_flags(&args.enrollment.into_flags(false), Utc::now())?;

    if !args.from_install {
        let host = LocalHost::new(TokioCommandRunner::default());
        let report = detect_state(&host, &layout).await?;
        if !matches!(
            report.state,
            InstallState::Installed | InstallState::PackageInstall
        ) {
            return Err(InstallError::validation(format!(
                "no installed agent at {} ({}), run `outpost install` first",
                layout.top_path().display(),
                report.state
            ))
            .into());
        }
    }

    let store = EnrollmentStore::new(layout.enrollment_path());
    let existing = store.load()?;
    if existing.is_some() && !args.force && !args.from_install {
        confirm_replace(app)?;
    }

    store.save(&record)?;
    if running_as_root() {
        match_owner(store.path(), layout.top_path())
            .context("cannot hand the enrollment record to the agent account")?;
    }
    tracing::info!(
        path = %store.path().display(),
        fleet_server = record.fleet_server_es.is_some(),
        "enrollment saved"
    );

    if app.is_json() {
        return json::print(&serde_json::json!({
            "path": store.path(),
            "url": record.url,
            "fleet_server_es": record.fleet_server_es,
            "replaced": existing.is_some(),
        }));
    }
    let target = record
        .url
        .as_deref()
        .or(record.fleet_server_es.as_deref())
        .unwrap_or_default();
    app.output
        .success(&format!("Successfully enrolled the Outpost Agent into {target}."));
    Ok(())
}

fn confirm_replace(app: &AppContext) -> Result<(), InstallError> {
    if app.non_interactive {
        return Err(InstallError::validation(
            "agent is already enrolled, use --force to replace the enrollment",
        ));
    }
    let replace = app
        .confirm(
            "This will replace your current enrollment. Do you want to continue?",
            true,
        )
        .map_err(InstallError::Prompt)?;
    if replace {
        Ok(())
    } else {
        Err(InstallError::declined("enrollment was cancelled by the user"))
    }
}
