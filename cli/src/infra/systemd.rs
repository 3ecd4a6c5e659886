//! `ServiceInstaller` for systemd hosts.
//!
//! Lays the running executable down as `<install>/outpost`, registers a
//! unit that runs `outpost run`, and drives `systemctl`.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::application::ports::{AccountDirectory, CommandRunner, ServiceInstaller};
use crate::domain::layout::SERVICE_DISPLAY_NAME;
use crate::domain::{Flavor, InstallLayout, OwnershipDescriptor, OwnershipTarget, PrivilegeMode};
use crate::infra::accounts::SystemAccounts;
use crate::infra::command_runner::ensure_success;
use crate::infra::permissions::{apply_ownership, validate_tree};

pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

const STOP_POLL_INTERVAL: Duration = Duration::from_secs(1);
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// `<unit_dir>/<service>.service`
#[must_use]
pub fn unit_path(unit_dir: &Path, layout: &InstallLayout) -> PathBuf {
    unit_dir.join(format!("{}.service", layout.service_name()))
}

/// Render the unit file for `layout`, running as `owner`.
#[must_use]
pub fn render_unit(layout: &InstallLayout, owner: &OwnershipDescriptor) -> String {
    let binary = layout.binary_path();
    let top = layout.top_path();
    let mut unit = format!(
        "[Unit]\n\
         Description={SERVICE_DISPLAY_NAME}\n\
         ConditionFileIsExecutable={binary}\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         ExecStart={binary} run --verbose\n\
         WorkingDirectory={top}\n\
         Restart=always\n\
         RestartSec=15\n\
         KillMode=process\n",
        binary = binary.display(),
        top = top.display(),
    );
    if !owner.is_privileged() {
        unit.push_str(&format!("User={}\nGroup={}\n", owner.user.name, owner.group.name));
    }
    unit.push_str("\n[Install]\nWantedBy=multi-user.target\n");
    unit
}

pub struct SystemdInstaller<C: CommandRunner> {
    runner: C,
    unit_dir: PathBuf,
    source_binary: PathBuf,
}

impl<C: CommandRunner> SystemdInstaller<C> {
    /// Installer that copies the currently running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the running executable cannot be located.
    pub fn new(runner: C) -> Result<Self> {
        let source_binary =
            std::env::current_exe().context("cannot determine the running executable")?;
        Ok(Self {
            runner,
            unit_dir: PathBuf::from(SYSTEMD_UNIT_DIR),
            source_binary,
        })
    }

    /// Installer with an explicit unit directory and source executable.
    pub fn with_paths(runner: C, unit_dir: PathBuf, source_binary: PathBuf) -> Self {
        Self {
            runner,
            unit_dir,
            source_binary,
        }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<()> {
        let output = self.runner.run("systemctl", args).await?;
        ensure_success("systemctl", args, &output)
    }

    async fn register(&self, layout: &InstallLayout, unit: &Path, files: InstallFiles) -> Result<()> {
        tokio::task::spawn_blocking(move || files.write())
            .await
            .context("spawn_blocking for install files")??;

        let service = layout.service_name();
        self.systemctl(&["daemon-reload"]).await?;
        self.systemctl(&["enable", &service]).await?;
        tracing::info!(%service, unit = %unit.display(), "registered service");
        Ok(())
    }

    /// Best-effort removal of a half-written install, so it cannot later be
    /// detected as a complete one.
    async fn discard_partial(&self, layout: &InstallLayout, unit: PathBuf) {
        let top = layout.top_path().to_path_buf();
        for path in [unit, top] {
            if let Err(e) = remove_path(path).await {
                tracing::warn!(error = %format!("{e:#}"), "cleanup after failed install");
            }
        }
        if let Err(e) = self.systemctl(&["daemon-reload"]).await {
            tracing::warn!(error = %format!("{e:#}"), "daemon-reload after failed install");
        }
    }

    async fn is_active(&self, service: &str) -> Result<bool> {
        let output = self.runner.run("systemctl", &["is-active", service]).await?;
        let state = String::from_utf8_lossy(&output.stdout);
        Ok(matches!(state.trim(), "active" | "activating" | "deactivating" | "reloading"))
    }

    async fn ensure_accounts(&self, target: &OwnershipTarget) -> Result<OwnershipDescriptor> {
        if target.mode == PrivilegeMode::Privileged {
            return Ok(target.descriptor.clone());
        }
        let group = &target.descriptor.group.name;
        let user = &target.descriptor.user.name;
        if target.create_group {
            let args = ["--system", group.as_str()];
            let output = self.runner.run("groupadd", &args).await?;
            ensure_success("groupadd", &args, &output)?;
            tracing::info!(%group, "created group");
        }
        if target.create_user {
            let args = [
                "--system",
                "--no-create-home",
                "--shell",
                "/usr/sbin/nologin",
                "--gid",
                group.as_str(),
                user.as_str(),
            ];
            let output = self.runner.run("useradd", &args).await?;
            ensure_success("useradd", &args, &output)?;
            tracing::info!(%user, "created user");
        }

        let mut realised = target.descriptor.clone();
        realised.user.id = SystemAccounts.lookup_user(user)?;
        realised.group.id = SystemAccounts.lookup_group(group)?;
        if realised.user.id.is_none() || realised.group.id.is_none() {
            bail!("account {user}:{group} does not exist after creation");
        }
        Ok(realised)
    }
}

/// Everything `install` writes to disk, owned so it can move onto the
/// blocking pool.
struct InstallFiles {
    source_binary: PathBuf,
    layout: InstallLayout,
    flavor: Flavor,
    unit: PathBuf,
    unit_text: String,
    uid: u32,
    gid: u32,
}

impl InstallFiles {
    fn write(&self) -> Result<()> {
        let layout = &self.layout;
        let top = layout.top_path();
        std::fs::create_dir_all(top).with_context(|| format!("creating {}", top.display()))?;
        std::fs::set_permissions(top, std::fs::Permissions::from_mode(0o750))
            .with_context(|| format!("chmod {}", top.display()))?;

        let binary = layout.binary_path();
        std::fs::copy(&self.source_binary, &binary).with_context(|| {
            format!(
                "copying {} to {}",
                self.source_binary.display(),
                binary.display()
            )
        })?;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o750))
            .with_context(|| format!("chmod {}", binary.display()))?;

        let data = layout.data_dir();
        std::fs::create_dir_all(&data).with_context(|| format!("creating {}", data.display()))?;
        std::fs::write(layout.flavor_path(), self.flavor.as_str())
            .with_context(|| format!("writing {}", layout.flavor_path().display()))?;

        std::fs::write(&self.unit, &self.unit_text)
            .with_context(|| format!("writing {}", self.unit.display()))?;

        apply_ownership(top, self.uid, self.gid)?;
        validate_tree(top, self.uid, self.gid).context("permission validation failed")
    }
}

impl<C: CommandRunner> ServiceInstaller for SystemdInstaller<C> {
    async fn install(
        &self,
        layout: &InstallLayout,
        target: &OwnershipTarget,
        flavor: Flavor,
    ) -> Result<OwnershipDescriptor> {
        let owner = self.ensure_accounts(target).await?;
        let (Some(uid), Some(gid)) = (owner.uid(), owner.gid()) else {
            bail!("unresolved ownership {}:{}", owner.user.name, owner.group.name);
        };

        let unit = unit_path(&self.unit_dir, layout);
        let files = InstallFiles {
            source_binary: self.source_binary.clone(),
            layout: layout.clone(),
            flavor,
            unit: unit.clone(),
            unit_text: render_unit(layout, &owner),
            uid,
            gid,
        };
        if let Err(e) = self.register(layout, &unit, files).await {
            self.discard_partial(layout, unit).await;
            return Err(e);
        }
        Ok(owner)
    }

    async fn uninstall(&self, layout: &InstallLayout) -> Result<()> {
        let service = layout.service_name();
        let unit = unit_path(&self.unit_dir, layout);
        if unit.exists() {
            if let Err(e) = self.stop_service(layout).await {
                tracing::warn!(%service, error = %format!("{e:#}"), "stop before uninstall failed");
            }
            if let Err(e) = self.systemctl(&["disable", &service]).await {
                tracing::warn!(%service, error = %format!("{e:#}"), "disable failed");
            }
            remove_path(unit).await?;
            self.systemctl(&["daemon-reload"]).await?;
        }
        remove_path(layout.top_path().to_path_buf()).await?;
        tracing::info!(%service, path = %layout.top_path().display(), "removed installation");
        Ok(())
    }

    async fn start_service(&self, layout: &InstallLayout) -> Result<()> {
        self.systemctl(&["start", &layout.service_name()]).await
    }

    async fn stop_service(&self, layout: &InstallLayout) -> Result<()> {
        let service = layout.service_name();
        self.systemctl(&["stop", &service]).await?;
        let deadline = tokio::time::Instant::now() + STOP_TIMEOUT;
        while self.is_active(&service).await? {
            if tokio::time::Instant::now() >= deadline {
                bail!("{service} still active after {}s", STOP_TIMEOUT.as_secs());
            }
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }
        Ok(())
    }
}

/// Remove a file or a whole directory tree; a missing path is fine.
async fn remove_path(path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        ignore_missing(result, &path)
    })
    .await
    .context("spawn_blocking for removal")?
}

/// Treat `NotFound` from a removal as success.
fn ignore_missing(result: io::Result<()>, path: &Path) -> Result<()> {
    match result {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("removing {}", path.display()))
        }
        _ => Ok(()),
    }
}
