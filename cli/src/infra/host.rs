//! Production `Host`: filesystem and package-manager probes, plus the
//! directory lock and account lookups.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{AccountDirectory, CommandRunner, DirectoryLock, InstallInspector};
use crate::domain::{InstallLayout, LockError};
use crate::infra::accounts::SystemAccounts;
use crate::infra::lock::{FileLocker, LockHandle};
use crate::infra::systemd::{SYSTEMD_UNIT_DIR, unit_path};

/// Package managers asked whether they own the installed binary, in order.
const PACKAGE_QUERIES: &[(&str, &str)] = &[("dpkg", "-S"), ("rpm", "-qf")];

pub struct LocalHost<C: CommandRunner> {
    runner: C,
    unit_dir: PathBuf,
    locker: FileLocker,
    accounts: SystemAccounts,
}

impl<C: CommandRunner> LocalHost<C> {
    pub fn new(runner: C) -> Self {
        Self::with_unit_dir(runner, PathBuf::from(SYSTEMD_UNIT_DIR))
    }

    pub fn with_unit_dir(runner: C, unit_dir: PathBuf) -> Self {
        Self {
            runner,
            unit_dir,
            locker: FileLocker,
            accounts: SystemAccounts,
        }
    }
}

impl<C: CommandRunner> InstallInspector for LocalHost<C> {
    fn binary_present(&self, layout: &InstallLayout) -> Result<bool> {
        let path = layout.binary_path();
        path.try_exists()
            .with_context(|| format!("stat {}", path.display()))
    }

    fn service_registered(&self, layout: &InstallLayout) -> Result<bool> {
        let path = unit_path(&self.unit_dir, layout);
        path.try_exists()
            .with_context(|| format!("stat {}", path.display()))
    }

    async fn package_managed(&self, layout: &InstallLayout) -> Result<bool> {
        let binary = layout.binary_path();
        let binary = binary.to_string_lossy();
        for &(program, flag) in PACKAGE_QUERIES {
            match self.runner.run(program, &[flag, &*binary]).await {
                Ok(output) => {
                    if output.status.success() {
                        tracing::debug!(program, %binary, "binary owned by package manager");
                        return Ok(true);
                    }
                }
                Err(e) if is_missing_program(&e) => {
                    tracing::debug!(program, "package manager not available");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}

impl<C: CommandRunner> DirectoryLock for LocalHost<C> {
    type Handle = LockHandle;

    fn try_lock(&self, data_dir: &Path) -> Result<LockHandle, LockError> {
        self.locker.try_lock(data_dir)
    }

    fn unlock(&self, handle: LockHandle) -> Result<(), LockError> {
        self.locker.unlock(handle)
    }
}

impl<C: CommandRunner> AccountDirectory for LocalHost<C> {
    fn lookup_user(&self, name: &str) -> Result<Option<u32>> {
        self.accounts.lookup_user(name)
    }

    fn lookup_group(&self, name: &str) -> Result<Option<u32>> {
        self.accounts.lookup_group(name)
    }
}

fn is_missing_program(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|io| io.kind() == io::ErrorKind::NotFound)
}
