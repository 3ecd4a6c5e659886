//! Delegation to the installed binary through the self-invocation contract.
//!
//! Children inherit stdin/stdout/stderr so prompts from the installed
//! binary reach the operator. Each call is a single attempt.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};

use crate::application::ports::{EnrollmentDelegate, UninstallDelegate};
use crate::domain::enrollment::{ENROLL_COMMAND, FORCE_FLAG, FROM_INSTALL_FLAG, UNINSTALL_COMMAND};
use crate::domain::layout::BASE_PATH_ENV;
use crate::domain::{EnrollError, OwnershipDescriptor};
use crate::infra::accounts::running_as_root;

/// Production `Delegate`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessDelegate;

fn inherited(binary: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(binary);
    // The child must act on the install it lives in, not the caller's base path.
    cmd.env_remove(BASE_PATH_ENV)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

impl UninstallDelegate for ProcessDelegate {
    async fn uninstall_with_binary(&self, binary: &Path) -> Result<()> {
        tracing::info!(binary = %binary.display(), "running uninstall of the installed binary");
        let status = inherited(binary)
            .args([UNINSTALL_COMMAND, FORCE_FLAG])
            .status()
            .await
            .with_context(|| format!("failed to execute {}", binary.display()))?;
        if !status.success() {
            bail!("{} {UNINSTALL_COMMAND} exited with {status}", binary.display());
        }
        Ok(())
    }
}

impl EnrollmentDelegate for ProcessDelegate {
    async fn enroll(
        &self,
        binary: &Path,
        args: &[String],
        run_as: Option<&OwnershipDescriptor>,
    ) -> Result<(), EnrollError> {
        let mut cmd = inherited(binary);
        cmd.arg(ENROLL_COMMAND).arg(FROM_INSTALL_FLAG).args(args);

        // Switching identity needs root; otherwise the child already runs as us.
        if let Some(owner) = run_as.filter(|o| !o.is_privileged()) {
            if running_as_root() {
                let (Some(uid), Some(gid)) = (owner.uid(), owner.gid()) else {
                    return Err(EnrollError::Identity(format!(
                        "{}:{} has no numeric ids",
                        owner.user.name, owner.group.name
                    )));
                };
                cmd.uid(uid).gid(gid);
                tracing::debug!(uid, gid, "enrolling as unprivileged owner");
            }
        }

        tracing::info!(binary = %binary.display(), "launching enroll");
        let mut child = cmd.spawn().map_err(|source| EnrollError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;
        let status = child.wait().await.map_err(|source| EnrollError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(EnrollError::Exit { status })
        }
    }
}
