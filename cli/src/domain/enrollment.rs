//! Enrollment flag group, the self-invocation contract, and the persisted
//! enrollment record.
//!
//! Pure types and validators, no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::InstallError;

// ── Self-invocation contract ──────────────────────────────────────────────────
//
// An installed binary is driven by newer installers through these arguments.
// They must keep working across releases.

/// Subcommand that enrolls the installed agent.
pub const ENROLL_COMMAND: &str = "enroll";

/// Hidden flag telling `enroll` it was launched by `install`.
pub const FROM_INSTALL_FLAG: &str = "--from-install";

/// Subcommand running the embedded uninstall routine.
pub const UNINSTALL_COMMAND: &str = "uninstall";

/// Skips the uninstall confirmation prompt.
pub const FORCE_FLAG: &str = "--force";

// ── Flags ─────────────────────────────────────────────────────────────────────

/// Enrollment flags, forwarded verbatim to the delegated `enroll` subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentFlags {
    pub url: Option<String>,
    pub enrollment_token: Option<String>,
    pub fleet_server_es: Option<String>,
    pub fleet_server_service_token: Option<String>,
    pub fleet_server_policy: Option<String>,
    pub fleet_server_host: Option<String>,
    pub fleet_server_port: Option<u16>,
    pub proxy_url: Option<String>,
    pub tags: Vec<String>,
    pub insecure: bool,
    pub delay_enroll: bool,
}

impl EnrollmentFlags {
    /// Whether any `--fleet-server-*` flag was explicitly set.
    #[must_use]
    pub fn fleet_server_requested(&self) -> bool {
        non_empty(self.fleet_server_es.as_ref()).is_some()
            || non_empty(self.fleet_server_service_token.as_ref()).is_some()
            || non_empty(self.fleet_server_policy.as_ref()).is_some()
            || non_empty(self.fleet_server_host.as_ref()).is_some()
            || self.fleet_server_port.is_some()
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        non_empty(self.url.as_ref())
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        non_empty(self.enrollment_token.as_ref())
    }

    #[must_use]
    pub fn fleet_server_es(&self) -> Option<&str> {
        non_empty(self.fleet_server_es.as_ref())
    }

    /// Validate the flag group on its own.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::Validation` for a non-http(s) URL, a
    /// fleet-server option without `--fleet-server-es`, or an empty tag.
    pub fn validate(&self) -> Result<(), InstallError> {
        for (flag, value) in [
            ("--url", self.url()),
            ("--fleet-server-es", self.fleet_server_es()),
            ("--proxy-url", non_empty(self.proxy_url.as_ref())),
        ] {
            if let Some(v) = value {
                validate_protocol(flag, v)?;
            }
        }

        let needs_es = non_empty(self.fleet_server_service_token.as_ref()).is_some()
            || non_empty(self.fleet_server_policy.as_ref()).is_some()
            || non_empty(self.fleet_server_host.as_ref()).is_some()
            || self.fleet_server_port.is_some();
        if needs_es && self.fleet_server_es().is_none() {
            return Err(InstallError::validation(
                "--fleet-server-es is required when other --fleet-server-* flags are set",
            ));
        }

        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(InstallError::validation("--tag values must not be empty"));
        }
        Ok(())
    }

    /// Build the argument list for `enroll`, substituting `url` and `token`
    /// (which may have been collected interactively).
    #[must_use]
    pub fn to_args(&self, url: Option<&str>, token: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: Option<&str>| {
            if let Some(v) = value {
                args.push(flag.to_string());
                args.push(v.to_string());
            }
        };
        push("--url", url);
        push("--enrollment-token", token);
        push("--fleet-server-es", self.fleet_server_es());
        push(
            "--fleet-server-service-token",
            non_empty(self.fleet_server_service_token.as_ref()),
        );
        push(
            "--fleet-server-policy",
            non_empty(self.fleet_server_policy.as_ref()),
        );
        push("--fleet-server-host", non_empty(self.fleet_server_host.as_ref()));
        let port = self.fleet_server_port.map(|p| p.to_string());
        push("--fleet-server-port", port.as_deref());
        push("--proxy-url", non_empty(self.proxy_url.as_ref()));
        for tag in &self.tags {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if self.insecure {
            args.push("--insecure".to_string());
        }
        args
    }
}

/// What the install transaction will do about enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollPlan {
    /// Install only (standalone mode).
    Standalone,
    /// `--delay-enroll`: the operator enrolls later; the service is not started.
    Delayed,
    /// Launch `enroll` with these arguments after install.
    Enroll { args: Vec<String> },
}

impl EnrollPlan {
    #[must_use]
    pub fn enrolls(&self) -> bool {
        matches!(self, Self::Enroll { .. })
    }
}

/// Accept only `http` / `https` endpoints.
///
/// # Errors
///
/// Returns `InstallError::Validation` naming the flag.
pub fn validate_protocol(flag: &str, value: &str) -> Result<(), InstallError> {
    let Some((scheme, rest)) = value.split_once("://") else {
        return Err(InstallError::validation(format!(
            "{flag} must be an absolute URL, got '{value}'"
        )));
    };
    if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
        return Err(InstallError::validation(format!(
            "invalid protocol \"{scheme}\" for {flag}, accepted values are 'http' and 'https'"
        )));
    }
    if rest.is_empty() || rest.starts_with('/') {
        return Err(InstallError::validation(format!(
            "{flag} is missing a host: '{value}'"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

// ── Persisted record ──────────────────────────────────────────────────────────

/// Enrollment parameters written next to the installed binary by `enroll`.
///
/// The remote fleet client reads this on start-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet_server_es: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet_server_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub insecure: bool,
    pub enrolled_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    /// Build a record from validated flags.
    ///
    /// # Errors
    ///
    /// Returns `InstallError::Validation` if neither `--url` + `--enrollment-token`
    /// nor `--fleet-server-es` was given.
    pub fn from_flags(flags: &EnrollmentFlags, now: DateTime<Utc>) -> Result<Self, InstallError> {
        flags.validate()?;
        if flags.fleet_server_es().is_none() {
            if flags.url().is_none() {
                return Err(InstallError::validation(
                    "missing required --url argument used to enroll the agent",
                ));
            }
            if flags.token().is_none() {
                return Err(InstallError::validation(
                    "missing required --enrollment-token argument used to enroll the agent",
                ));
            }
        }
        Ok(Self {
            url: flags.url().map(str::to_owned),
            enrollment_token: flags.token().map(str::to_owned),
            fleet_server_es: flags.fleet_server_es().map(str::to_owned),
            fleet_server_policy: non_empty(flags.fleet_server_policy.as_ref()).map(str::to_owned),
            proxy_url: non_empty(flags.proxy_url.as_ref()).map(str::to_owned),
            tags: flags.tags.clone(),
            insecure: flags.insecure,
            enrolled_at: now,
        })
    }
}
