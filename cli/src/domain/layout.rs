//! On-host install layout: where the agent lives and what its artifacts are called.
//!
//! The namespace is an explicit value carried by `InstallLayout`; nothing in
//! the process holds a global install namespace.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::InstallError;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Name of the agent executable inside the install directory.
pub const BINARY_NAME: &str = "outpost";

/// Base name of the system service.
pub const SERVICE_BASE_NAME: &str = "outpost-agent";

/// Human-facing service name used in progress output.
pub const SERVICE_DISPLAY_NAME: &str = "Outpost Agent";

pub const VENDOR_DIR: &str = "Outpost";
pub const AGENT_DIR: &str = "Agent";

/// Namespace selected by `--develop`.
pub const DEVELOPMENT_NAMESPACE: &str = "Development";

/// Environment variable naming the base path. Self-invocations drop it so
/// the child resolves the install it was launched from.
pub const BASE_PATH_ENV: &str = "OUTPOST_BASE_PATH";

pub const DATA_DIR: &str = "data";
pub const LOCK_FILE_NAME: &str = "agent.lock";
pub const CONTROL_SOCKET_NAME: &str = "outpost.sock";
pub const ENROLLMENT_FILE_NAME: &str = "fleet.yaml";
pub const FLAVOR_FILE_NAME: &str = ".flavor";

/// Default `--base-path`.
#[cfg(target_os = "macos")]
pub const DEFAULT_BASE_PATH: &str = "/Library";
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_BASE_PATH: &str = "/opt";

/// Namespaces become part of directory and unit names, so they are restricted
/// to a path-safe alphabet.
pub static NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,62}$").expect("valid regex")
});

/// Validate an install namespace.
///
/// # Errors
///
/// Returns `InstallError::Validation` if the namespace is not path-safe.
pub fn validate_namespace(namespace: &str) -> Result<(), InstallError> {
    if !NAMESPACE_RE.is_match(namespace) || namespace.contains("..") {
        return Err(InstallError::validation(format!(
            "invalid namespace '{namespace}': must match {}",
            NAMESPACE_RE.as_str()
        )));
    }
    Ok(())
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Resolved paths and names for one (possibly namespaced) installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    top_path: PathBuf,
    namespace: Option<String>,
}

impl InstallLayout {
    /// Layout for an install rooted at `base_path`.
    ///
    /// `<base>/Outpost/Agent`, or `<base>/Outpost/Agent-<ns>` when namespaced.
    #[must_use]
    pub fn new(base_path: &Path, namespace: Option<&str>) -> Self {
        let agent_dir = match namespace {
            Some(ns) => format!("{AGENT_DIR}-{ns}"),
            None => AGENT_DIR.to_string(),
        };
        Self {
            top_path: base_path.join(VENDOR_DIR).join(agent_dir),
            namespace: namespace.map(str::to_owned),
        }
    }

    /// Recover the layout of an existing install from its top directory.
    ///
    /// Used by the installed binary itself (`enroll`, `uninstall`, `run`),
    /// which only knows where it lives.
    #[must_use]
    pub fn from_top_path(top_path: PathBuf) -> Self {
        let namespace = top_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(&format!("{AGENT_DIR}-")))
            .filter(|ns| !ns.is_empty())
            .map(str::to_owned);
        Self {
            top_path,
            namespace,
        }
    }

    #[must_use]
    pub fn top_path(&self) -> &Path {
        &self.top_path
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Path of the agent executable inside the install.
    #[must_use]
    pub fn binary_path(&self) -> PathBuf {
        self.top_path.join(BINARY_NAME)
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.top_path.join(DATA_DIR)
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir().join(LOCK_FILE_NAME)
    }

    #[must_use]
    pub fn control_socket_path(&self) -> PathBuf {
        self.data_dir().join(CONTROL_SOCKET_NAME)
    }

    #[must_use]
    pub fn enrollment_path(&self) -> PathBuf {
        self.top_path.join(ENROLLMENT_FILE_NAME)
    }

    #[must_use]
    pub fn flavor_path(&self) -> PathBuf {
        self.top_path.join(FLAVOR_FILE_NAME)
    }

    /// System service name, suffixed with the namespace when present.
    #[must_use]
    pub fn service_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{SERVICE_BASE_NAME}-{}", ns.to_lowercase()),
            None => SERVICE_BASE_NAME.to_string(),
        }
    }
}
