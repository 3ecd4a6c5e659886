//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::Output;

use anyhow::Result;

use crate::domain::{
    EnrollError, Flavor, InstallLayout, LockError, OwnershipDescriptor, OwnershipTarget,
};

// ── State Inspection Port ─────────────────────────────────────────────────────

/// Read-only probes used to classify the host. Implementations must not
/// mutate anything and must propagate I/O errors.
#[allow(async_fn_in_trait)]
pub trait InstallInspector {
    /// Whether the agent executable exists at the layout's binary path.
    fn binary_present(&self, layout: &InstallLayout) -> Result<bool>;
    /// Whether the service manager has a unit registered for the layout.
    fn service_registered(&self, layout: &InstallLayout) -> Result<bool>;
    /// Whether the installed binary is owned by the host package manager.
    async fn package_managed(&self, layout: &InstallLayout) -> Result<bool>;
}

// ── Directory Lock Port ───────────────────────────────────────────────────────

/// Exclusive, non-blocking lock keyed by the data directory.
pub trait DirectoryLock {
    /// Proof of ownership; dropping it also releases the lock.
    type Handle;
    /// Try to take the lock without waiting.
    ///
    /// # Errors
    ///
    /// `LockError::AlreadyRunning` if another process holds it,
    /// `LockError::Io` for anything else.
    fn try_lock(&self, data_dir: &Path) -> Result<Self::Handle, LockError>;
    /// Release a lock taken by `try_lock`.
    fn unlock(&self, handle: Self::Handle) -> Result<(), LockError>;
}

// ── Account Port ──────────────────────────────────────────────────────────────

/// Host account database lookups.
pub trait AccountDirectory {
    /// Numeric id of `name`, or `None` if no such user exists.
    fn lookup_user(&self, name: &str) -> Result<Option<u32>>;
    /// Numeric id of `name`, or `None` if no such group exists.
    fn lookup_group(&self, name: &str) -> Result<Option<u32>>;
}

/// Composite trait: everything the orchestrator reads from the host.
pub trait Host: InstallInspector + DirectoryLock + AccountDirectory {}

/// Blanket implementation: any type implementing the three sub-traits is a `Host`.
impl<T> Host for T where T: InstallInspector + DirectoryLock + AccountDirectory {}

// ── Service Installer Port ────────────────────────────────────────────────────

/// Lays down files and registers/starts/stops the platform service.
#[allow(async_fn_in_trait)]
pub trait ServiceInstaller {
    /// Install the current binary into `layout` owned by `target` and
    /// register the service. Returns the realised ownership (with ids).
    async fn install(
        &self,
        layout: &InstallLayout,
        target: &OwnershipTarget,
        flavor: Flavor,
    ) -> Result<OwnershipDescriptor>;
    /// Remove everything `install` created. Must tolerate missing artifacts.
    async fn uninstall(&self, layout: &InstallLayout) -> Result<()>;
    /// Start the registered service.
    async fn start_service(&self, layout: &InstallLayout) -> Result<()>;
    /// Stop the service and wait until it is inactive.
    async fn stop_service(&self, layout: &InstallLayout) -> Result<()>;
}

// ── Delegation Ports ──────────────────────────────────────────────────────────

/// Runs the already-installed binary's own uninstall routine.
#[allow(async_fn_in_trait)]
pub trait UninstallDelegate {
    /// Run `<binary> uninstall --force` and wait for it.
    async fn uninstall_with_binary(&self, binary: &Path) -> Result<()>;
}

/// Launches the freshly installed binary to enroll it.
#[allow(async_fn_in_trait)]
pub trait EnrollmentDelegate {
    /// Run `<binary> enroll --from-install <args>` with inherited stdio and
    /// wait for it. Single attempt, no retry.
    ///
    /// When `run_as` is given and unprivileged, the child runs as that identity.
    async fn enroll(
        &self,
        binary: &Path,
        args: &[String],
        run_as: Option<&OwnershipDescriptor>,
    ) -> Result<(), EnrollError>;
}

/// Composite trait: subprocesses of the installed binary.
pub trait Delegate: UninstallDelegate + EnrollmentDelegate {}

impl<T> Delegate for T where T: UninstallDelegate + EnrollmentDelegate {}

// ── Prompt Port ───────────────────────────────────────────────────────────────

/// Operator interaction. Only called when the run is interactive.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;
    /// Read a line of free text (may be empty).
    fn input(&self, prompt: &str) -> Result<String>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
///
/// Purely observational: implementations swallow their own failures.
pub trait ProgressReporter {
    /// Describe the phase currently in progress.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit an informational notice.
    fn info(&self, message: &str);
}
