//! Application service: embedded uninstall.
//!
//! This is what `outpost uninstall` runs, including when a newer installer
//! invokes an installed binary through `uninstall --force`.

use anyhow::Result;

use crate::application::ports::{
    DirectoryLock, InstallInspector, Prompter, ProgressReporter, ServiceInstaller,
};
use crate::application::services::detect::{detect_state, ensure_not_running};
use crate::domain::layout::SERVICE_DISPLAY_NAME;
use crate::domain::{InstallError, InstallLayout, InstallState, StateReport};

/// Inputs for the uninstall use-case.
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    pub layout: InstallLayout,
    pub force: bool,
    pub non_interactive: bool,
}

/// What the uninstall found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    /// Nothing was installed at the layout.
    NotInstalled,
    /// Files and service registration were removed.
    Removed { prior: StateReport },
}

/// Remove the installation at `opts.layout`.
///
/// # Errors
///
/// `InstallError::PackageManaged` for package installs, `InstallError::Validation`
/// for a non-interactive run without `--force`, `ConfirmationDeclined` when
/// the operator says no, `AlreadyRunning` when the lock is held and no
/// service is registered to stop, and `UninstallFailed` when removal fails.
pub async fn uninstall(
    host: &(impl InstallInspector + DirectoryLock),
    installer: &impl ServiceInstaller,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
    opts: UninstallOptions,
) -> Result<UninstallOutcome> {
    let layout = &opts.layout;
    let prior = detect_state(host, layout).await?;
    match prior.state {
        InstallState::PackageInstall => {
            return Err(InstallError::PackageManaged(layout.top_path().to_path_buf()).into());
        }
        InstallState::NotInstalled => {
            reporter.info(&format!(
                "{SERVICE_DISPLAY_NAME} is not installed at {}",
                layout.top_path().display()
            ));
            return Ok(UninstallOutcome::NotInstalled);
        }
        InstallState::Installed | InstallState::Broken => {}
    }

    if !opts.force {
        if opts.non_interactive {
            return Err(InstallError::validation(
                "uninstall requires --force when running non-interactively",
            )
            .into());
        }
        let prompt = format!(
            "{SERVICE_DISPLAY_NAME} will be uninstalled from {}. Do you want to continue?",
            layout.top_path().display()
        );
        let confirmed = prompter
            .confirm(&prompt, false)
            .map_err(InstallError::Prompt)?;
        if !confirmed {
            return Err(InstallError::declined("uninstall was cancelled by the user").into());
        }
    }

    // A registered service is stopped by the installer, which releases the
    // lock. Without one, a lock holder is a stray agent we must not delete.
    if prior.state == InstallState::Broken && !host.service_registered(layout)? {
        ensure_not_running(host, layout)?;
    }

    reporter.step(&format!("Uninstalling {SERVICE_DISPLAY_NAME}"));
    installer
        .uninstall(layout)
        .await
        .map_err(InstallError::UninstallFailed)?;
    tracing::info!(path = %layout.top_path().display(), "uninstalled");
    reporter.success(&format!("{SERVICE_DISPLAY_NAME} has been uninstalled."));

    Ok(UninstallOutcome::Removed { prior })
}
