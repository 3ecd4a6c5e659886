//! Command implementations

pub mod enroll;
pub mod install;
pub mod run;
pub mod status;
pub mod uninstall;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use crate::domain::layout::{
    BASE_PATH_ENV, BINARY_NAME, DEFAULT_BASE_PATH, DEVELOPMENT_NAMESPACE, VENDOR_DIR,
    validate_namespace,
};
use crate::domain::{EnrollmentFlags, InstallLayout};

/// Enrollment flags shared by `install` and `enroll`.
#[derive(Args, Debug, Clone, Default)]
pub struct EnrollmentArgs {
    /// Fleet server URL to enroll into
    #[arg(short, long, env = "OUTPOST_URL")]
    pub url: Option<String>,

    /// Enrollment token issued by Fleet
    #[arg(short = 't', long, env = "OUTPOST_ENROLLMENT_TOKEN", hide_env_values = true)]
    pub enrollment_token: Option<String>,

    /// Bootstrap a fleet server against this Elasticsearch URL
    #[arg(long)]
    pub fleet_server_es: Option<String>,

    /// Service token the fleet server uses to reach Elasticsearch
    #[arg(long)]
    pub fleet_server_service_token: Option<String>,

    /// Policy the bootstrapped fleet server runs
    #[arg(long)]
    pub fleet_server_policy: Option<String>,

    /// Host the fleet server binds to
    #[arg(long)]
    pub fleet_server_host: Option<String>,

    /// Port the fleet server binds to
    #[arg(long)]
    pub fleet_server_port: Option<u16>,

    /// Proxy used to reach Fleet
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Tag for this agent (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Skip TLS verification when talking to Fleet
    #[arg(short, long)]
    pub insecure: bool,
}

impl EnrollmentArgs {
    /// Typed flag group handed to the domain.
    #[must_use]
    pub fn into_flags(self, delay_enroll: bool) -> EnrollmentFlags {
        EnrollmentFlags {
            url: self.url,
            enrollment_token: self.enrollment_token,
            fleet_server_es: self.fleet_server_es,
            fleet_server_service_token: self.fleet_server_service_token,
            fleet_server_policy: self.fleet_server_policy,
            fleet_server_host: self.fleet_server_host,
            fleet_server_port: self.fleet_server_port,
            proxy_url: self.proxy_url,
            tags: self.tags,
            insecure: self.insecure,
            delay_enroll,
        }
    }
}

/// Selects an existing installation.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Base path of the installation [default: where this binary is installed]
    #[arg(long, env = BASE_PATH_ENV)]
    pub base_path: Option<PathBuf>,

    /// Installation namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Select the development namespace
    #[arg(long, hide = true)]
    pub develop: bool,
}

impl TargetArgs {
    /// Resolve the layout, preferring the install this binary runs from.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid namespace.
    pub fn layout(&self) -> Result<InstallLayout> {
        let exe = std::env::current_exe().ok();
        self.layout_for(exe.as_deref())
    }

    /// Resolve the layout given the path of the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid namespace.
    pub fn layout_for(&self, exe: Option<&Path>) -> Result<InstallLayout> {
        let namespace = match (&self.namespace, self.develop) {
            (Some(ns), _) => {
                validate_namespace(ns)?;
                Some(ns.as_str())
            }
            (None, true) => Some(DEVELOPMENT_NAMESPACE),
            (None, false) => None,
        };
        if let Some(base) = &self.base_path {
            return Ok(InstallLayout::new(base, namespace));
        }
        if namespace.is_none() {
            if let Some(top) = exe.and_then(installed_top_path) {
                return Ok(InstallLayout::from_top_path(top.to_path_buf()));
            }
        }
        Ok(InstallLayout::new(Path::new(DEFAULT_BASE_PATH), namespace))
    }

    /// Layout for a self-invocation: the install the binary lives in wins
    /// over flags and environment.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid namespace.
    pub fn installed_layout(&self) -> Result<InstallLayout> {
        let exe = std::env::current_exe().ok();
        self.installed_layout_for(exe.as_deref())
    }

    /// `installed_layout` given the path of the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid namespace.
    pub fn installed_layout_for(&self, exe: Option<&Path>) -> Result<InstallLayout> {
        match exe.and_then(installed_top_path) {
            Some(top) => Ok(InstallLayout::from_top_path(top.to_path_buf())),
            None => self.layout_for(exe),
        }
    }
}

/// `<base>/Outpost/Agent[-ns]` when `exe` is `<that>/outpost`.
fn installed_top_path(exe: &Path) -> Option<&Path> {
    if exe.file_name()? != BINARY_NAME {
        return None;
    }
    let top = exe.parent()?;
    let vendor = top.parent()?;
    (vendor.file_name()? == VENDOR_DIR).then_some(top)
}
