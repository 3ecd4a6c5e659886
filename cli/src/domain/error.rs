//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

// ── Install transaction errors ───────────────────────────────────────────────

/// Terminal outcomes of the install / uninstall transaction.
///
/// Each failing step maps to exactly one variant so callers (and tests) can
/// tell *where* the transaction stopped by downcasting the `anyhow::Error`.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Bad flags or paths. Raised before anything is touched.
    #[error("{0}")]
    Validation(String),

    #[error("cannot perform installation as Outpost Agent is already running from {}", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("already installed at: {}", .0.display())]
    AlreadyInstalled(PathBuf),

    /// The operator answered "no" or left a required answer empty.
    #[error("{reason}")]
    ConfirmationDeclined { reason: String },

    #[error("installed as a system package at {}, it must be managed by the package manager", .0.display())]
    PackageManaged(PathBuf),

    #[error("problem reading prompt response")]
    Prompt(#[source] anyhow::Error),

    #[error("error obtaining lock")]
    Lock(#[source] std::io::Error),

    #[error("invalid account: {0}")]
    InvalidAccount(String),

    #[error("failed to uninstall the current installation")]
    UninstallFailed(#[source] anyhow::Error),

    #[error("error installing package")]
    InstallFailed(#[source] anyhow::Error),

    #[error("error starting service")]
    ServiceStartFailed(#[source] anyhow::Error),

    #[error("enroll command failed")]
    EnrollFailed(#[source] EnrollError),
}

impl InstallError {
    /// Shorthand for a `Validation` error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for a `ConfirmationDeclined` error.
    pub fn declined(reason: impl Into<String>) -> Self {
        Self::ConfirmationDeclined {
            reason: reason.into(),
        }
    }

    /// Whether this error is a clean cancellation rather than a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::ConfirmationDeclined { .. })
    }

    /// Stable machine-readable code, used in `--json` error objects.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::AlreadyRunning(_) => "already_running",
            Self::AlreadyInstalled(_) => "already_installed",
            Self::ConfirmationDeclined { .. } => "cancelled",
            Self::PackageManaged(_) => "package_managed",
            Self::Prompt(_) => "prompt",
            Self::Lock(_) => "lock",
            Self::InvalidAccount(_) => "invalid_account",
            Self::UninstallFailed(_) => "uninstall_failed",
            Self::InstallFailed(_) => "install_failed",
            Self::ServiceStartFailed(_) => "service_start_failed",
            Self::EnrollFailed(_) => "enroll_failed",
        }
    }
}

impl From<LockError> for InstallError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AlreadyRunning { dir } => Self::AlreadyRunning(dir),
            LockError::Io { source, .. } => Self::Lock(source),
        }
    }
}

// ── Directory lock errors ────────────────────────────────────────────────────

/// Errors from the data-directory lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process (usually the running service) holds the lock.
    #[error("another process holds the lock on {}", .dir.display())]
    AlreadyRunning { dir: PathBuf },

    #[error("cannot lock {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Enrollment errors ────────────────────────────────────────────────────────

/// Errors from the delegated enrollment subprocess.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("failed to execute enroll command {}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("enroll command exited with {status}")]
    Exit { status: ExitStatus },

    #[error("failed to apply run-as identity: {0}")]
    Identity(String),
}

impl EnrollError {
    /// Exit status of the child process, when it ran to completion.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Self::Exit { status } => Some(*status),
            _ => None,
        }
    }
}
