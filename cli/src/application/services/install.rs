//! Application service: install transaction.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All host access is routed through injected port traits.
//!
//! Forward steps: validate, detect, confirm, plan enrollment, uninstall the
//! prior install, install, start the service, enroll. Every mutating step
//! that succeeds pushes its compensation on a [`Rollback`]; a failure after
//! that point unwinds the stack before the error is returned.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::{Delegate, Host, Prompter, ProgressReporter, ServiceInstaller};
use crate::application::services::detect::{detect_state, ensure_not_running};
use crate::application::services::enrollment::plan_enrollment;
use crate::application::services::ownership::resolve_ownership;
use crate::application::services::rollback::{Compensation, Rollback};
use crate::domain::layout::SERVICE_DISPLAY_NAME;
use crate::domain::ownership::PASSWORD_REQUIRED;
use crate::domain::{
    EnrollPlan, InstallError, InstallOptions, InstallRequest, InstallState, OwnershipDescriptor,
    StateReport,
};

/// Transaction states, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validated,
    Confirmed,
    PriorUninstalled,
    Installed,
    ServiceStarted,
    Enrolled,
    Done,
}

/// Result of a completed install transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Top directory of the installation.
    pub path: PathBuf,
    /// State detected before anything was changed.
    pub prior: StateReport,
    /// Realised ownership of the new install; `None` for package installs.
    pub ownership: Option<OwnershipDescriptor>,
    pub plan: EnrollPlan,
    /// Every phase the transaction passed through.
    pub phases: Vec<Phase>,
}

impl InstallOutcome {
    #[must_use]
    pub fn reached(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}

/// Run the install transaction.
///
/// Accepts port trait bounds so the caller can inject real or mock
/// implementations. The service never touches any presentation type.
///
/// # Errors
///
/// Returns an [`InstallError`] (wrapped in `anyhow`) naming the step that
/// stopped the transaction. Errors after the install step are returned only
/// after every compensation has run.
pub async fn install(
    host: &impl Host,
    installer: &impl ServiceInstaller,
    delegate: &impl Delegate,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
    opts: InstallOptions,
) -> Result<InstallOutcome> {
    let (req, notices) = InstallRequest::validate(opts)?;
    for notice in &notices {
        reporter.info(notice);
    }
    let mut phases = vec![Phase::Validated];
    let layout = &req.layout;

    let prior = detect_state(host, layout).await?;
    tracing::info!(
        state = %prior.state,
        path = %layout.top_path().display(),
        "detected installation state"
    );
    if prior.state == InstallState::Installed && !req.force {
        return Err(InstallError::AlreadyInstalled(layout.top_path().to_path_buf()).into());
    }
    if prior.state == InstallState::Installed && req.run_uninstall_from_binary {
        reporter.warn(
            "Uninstall will not be run from the agent installed in the system path, components may persist.",
        );
    }
    if req.non_interactive {
        reporter.info("Installing in non-interactive mode.");
    }
    let package_install = prior.state == InstallState::PackageInstall;
    if package_install {
        reporter.info("Installed as a system package, installation will not be altered.");
    }

    // An installed service is stopped by the prior uninstall and a package
    // install is only enrolled, so the lock is checked when nothing we would
    // stop or keep is expected to hold it.
    if matches!(prior.state, InstallState::NotInstalled | InstallState::Broken) {
        ensure_not_running(host, layout)?;
    }

    let target = if package_install {
        None
    } else {
        Some(resolve_ownership(
            req.privilege,
            &req.account,
            host,
            PASSWORD_REQUIRED,
        )?)
    };

    confirm(&req, &prior, prompter, reporter)?;
    phases.push(Phase::Confirmed);

    let plan = plan_enrollment(&req, prompter)?;
    tracing::debug!(?plan, "enrollment planned");

    if prior.state == InstallState::Installed {
        uninstall_prior(&req, installer, delegate, reporter).await?;
        phases.push(Phase::PriorUninstalled);
    }

    let mut rollback = Rollback::new();
    let mut ownership = None;

    if let Some(target) = &target {
        reporter.step(&format!("Installing {SERVICE_DISPLAY_NAME}"));
        let realised = installer
            .install(layout, target, req.flavor)
            .await
            .map_err(InstallError::InstallFailed)?;
        rollback.push(
            Compensation::Uninstall,
            format!("installed {}", layout.top_path().display()),
        );
        phases.push(Phase::Installed);
        tracing::info!(
            path = %layout.top_path().display(),
            user = %realised.user.name,
            group = %realised.group.name,
            "installed"
        );

        if plan != EnrollPlan::Delayed {
            reporter.step("Starting service");
            if let Err(e) = installer.start_service(layout).await {
                reporter.warn(&format!(
                    "Installation failed to start '{}' service.",
                    layout.service_name()
                ));
                rollback.unwind(installer, layout, reporter).await;
                return Err(InstallError::ServiceStartFailed(e).into());
            }
            rollback.push(
                Compensation::StopService,
                format!("started {}", layout.service_name()),
            );
            phases.push(Phase::ServiceStarted);
        }
        ownership = Some(realised);
    }

    if let EnrollPlan::Enroll { args } = &plan {
        reporter.step(&format!("Enrolling {SERVICE_DISPLAY_NAME} with Fleet"));
        let binary = layout.binary_path();
        if let Err(e) = delegate.enroll(&binary, args, ownership.as_ref()).await {
            tracing::warn!(error = %e, status = ?e.exit_status(), "enrollment failed");
            rollback.unwind(installer, layout, reporter).await;
            return Err(InstallError::EnrollFailed(e).into());
        }
        phases.push(Phase::Enrolled);
    }

    rollback.commit();
    reporter.success("Done");
    phases.push(Phase::Done);

    Ok(InstallOutcome {
        path: layout.top_path().to_path_buf(),
        prior,
        ownership,
        plan,
        phases,
    })
}

/// Ask the operator before mutating anything.
///
/// `--force` and non-interactive runs never prompt. A broken install gets
/// its own wording so the operator sees why a reinstall is proposed.
fn confirm(
    req: &InstallRequest,
    prior: &StateReport,
    prompter: &impl Prompter,
    reporter: &impl ProgressReporter,
) -> Result<(), InstallError> {
    if req.force || req.non_interactive {
        return Ok(());
    }
    let top = req.layout.top_path().display();
    let prompt = match prior.state {
        InstallState::PackageInstall => return Ok(()),
        InstallState::Broken => {
            let reason = prior.reason.as_deref().unwrap_or("unknown");
            reporter.warn(&format!(
                "{SERVICE_DISPLAY_NAME} is installed but currently broken: {reason}"
            ));
            format!(
                "Continuing will re-install {SERVICE_DISPLAY_NAME} over the current installation at {top}. Do you want to continue?"
            )
        }
        InstallState::NotInstalled | InstallState::Installed => format!(
            "{SERVICE_DISPLAY_NAME} will be installed at {top} and will run as a service. Do you want to continue?"
        ),
    };
    let confirmed = prompter.confirm(&prompt, true).map_err(InstallError::Prompt)?;
    if confirmed {
        Ok(())
    } else {
        Err(InstallError::declined("installation was cancelled by the user"))
    }
}

async fn uninstall_prior(
    req: &InstallRequest,
    installer: &impl ServiceInstaller,
    delegate: &impl Delegate,
    reporter: &impl ProgressReporter,
) -> Result<(), InstallError> {
    let layout = &req.layout;
    reporter.step(&format!("Uninstalling current {SERVICE_DISPLAY_NAME}"));
    let result = if req.run_uninstall_from_binary {
        installer.uninstall(layout).await
    } else {
        delegate.uninstall_with_binary(&layout.binary_path()).await
    };
    result.map_err(InstallError::UninstallFailed)?;
    tracing::info!(path = %layout.top_path().display(), "removed prior installation");
    Ok(())
}
