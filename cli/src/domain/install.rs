//! Install request, installation state, and their pure validation rules.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use std::path::PathBuf;

use serde::Serialize;

use crate::domain::enrollment::EnrollmentFlags;
use crate::domain::error::InstallError;
use crate::domain::layout::{DEVELOPMENT_NAMESPACE, InstallLayout, validate_namespace};
use crate::domain::ownership::PrivilegeMode;

// ── Installation state ────────────────────────────────────────────────────────

/// Classification of the host, computed fresh on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    NotInstalled,
    Installed,
    /// Partial or inconsistent artifacts are present.
    Broken,
    /// Placed by the host package manager; never mutated here.
    PackageInstall,
}

impl std::fmt::Display for InstallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotInstalled => "not installed",
            Self::Installed => "installed",
            Self::Broken => "broken",
            Self::PackageInstall => "installed by package manager",
        };
        f.write_str(s)
    }
}

/// Detected state plus a human-readable reason (always set for `Broken`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateReport {
    pub state: InstallState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StateReport {
    fn ok(state: InstallState) -> Self {
        Self {
            state,
            reason: None,
        }
    }

    fn broken(reason: &str) -> Self {
        Self {
            state: InstallState::Broken,
            reason: Some(reason.to_string()),
        }
    }
}

/// Classify the host from three observations.
#[must_use]
pub fn classify(binary_present: bool, service_registered: bool, package_managed: bool) -> StateReport {
    // Package-owned files are never overwritten, even when inconsistent.
    if package_managed {
        return StateReport {
            state: InstallState::PackageInstall,
            reason: (!service_registered)
                .then(|| "package-managed agent is not registered as a service".to_string()),
        };
    }
    match (binary_present, service_registered) {
        (false, false) => StateReport::ok(InstallState::NotInstalled),
        (false, true) => StateReport::broken("service exists but installed agent binary is missing"),
        (true, false) => StateReport::broken("service is not installed"),
        (true, true) => StateReport::ok(InstallState::Installed),
    }
}

/// Snapshot rendered by `outpost status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    pub path: PathBuf,
    pub service: String,
    #[serde(flatten)]
    pub report: StateReport,
    /// Something holds the data-directory lock; `None` when the lock could
    /// not be probed (usually missing privileges).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_url: Option<String>,
}

// ── Request ───────────────────────────────────────────────────────────────────

/// Service flavor: the default agent, or the larger one with server components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    #[default]
    Default,
    Servers,
}

impl Flavor {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Servers => "servers",
        }
    }
}

/// Custom run-as account override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomAccount {
    pub user: Option<String>,
    pub group: Option<String>,
    /// Only meaningful where local accounts need a password.
    pub password: Option<String>,
}

impl CustomAccount {
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.user.is_some() || self.group.is_some()
    }
}

/// Raw, typed install inputs as collected at the CLI boundary.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub base_path: PathBuf,
    pub unprivileged: bool,
    pub install_servers: bool,
    pub namespace: Option<String>,
    pub develop: bool,
    pub run_uninstall_from_binary: bool,
    pub account: CustomAccount,
    pub force: bool,
    pub non_interactive: bool,
    pub enrollment: EnrollmentFlags,
}

/// Validated, immutable install request.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub base_path: PathBuf,
    pub layout: InstallLayout,
    pub privilege: PrivilegeMode,
    pub account: CustomAccount,
    pub flavor: Flavor,
    pub force: bool,
    pub non_interactive: bool,
    pub run_uninstall_from_binary: bool,
    pub enrollment: EnrollmentFlags,
}

impl InstallRequest {
    /// Normalise and validate raw options.
    ///
    /// Returns the request together with the notices the operator should see
    /// (in the order they apply).
    ///
    /// # Errors
    ///
    /// Returns `InstallError::Validation` for a relative base path, invalid
    /// enrollment flags, an invalid namespace, or a custom account on a
    /// privileged install.
    pub fn validate(opts: InstallOptions) -> Result<(Self, Vec<String>), InstallError> {
        let mut notices = Vec::new();

        let mut install_servers = opts.install_servers;
        if opts.enrollment.fleet_server_requested() && !install_servers {
            install_servers = true;
            notices.push("fleet-server installation detected, using --install-servers flag".to_string());
        }

        opts.enrollment
            .validate()
            .map_err(|e| InstallError::validation(format!("could not validate flags: {e}")))?;

        if !opts.base_path.is_absolute() {
            return Err(InstallError::validation(format!(
                "base path [{}] is not absolute",
                opts.base_path.display()
            )));
        }

        let privilege = if opts.unprivileged {
            notices.push("Unprivileged installation mode enabled.".to_string());
            PrivilegeMode::Unprivileged
        } else {
            PrivilegeMode::Privileged
        };
        if privilege == PrivilegeMode::Privileged && opts.account.is_set() {
            return Err(InstallError::validation(
                "--user and --group can only be used with --unprivileged",
            ));
        }

        let mut namespace = None;
        if opts.develop {
            notices.push(
                "Installing into development namespace; this is an experimental and currently unsupported feature."
                    .to_string(),
            );
            namespace = Some(DEVELOPMENT_NAMESPACE.to_string());
        }
        if let Some(ns) = opts.namespace.filter(|ns| !ns.is_empty()) {
            validate_namespace(&ns)?;
            notices.push(format!(
                "Installing into namespace '{ns}'; this is an experimental and currently unsupported feature."
            ));
            namespace = Some(ns);
        }

        let flavor = if install_servers {
            Flavor::Servers
        } else {
            Flavor::Default
        };
        let layout = InstallLayout::new(&opts.base_path, namespace.as_deref());

        Ok((
            Self {
                base_path: opts.base_path,
                layout,
                privilege,
                account: opts.account,
                flavor,
                force: opts.force,
                non_interactive: opts.non_interactive,
                run_uninstall_from_binary: opts.run_uninstall_from_binary,
                enrollment: opts.enrollment,
            },
            notices,
        ))
    }
}
