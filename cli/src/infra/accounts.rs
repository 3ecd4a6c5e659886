//! Account database lookups through `nix::unistd` (getpwnam / getgrnam).

use anyhow::{Context, Result};
use nix::unistd::{Group, User};

use crate::application::ports::AccountDirectory;

/// Production `AccountDirectory`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAccounts;

impl AccountDirectory for SystemAccounts {
    fn lookup_user(&self, name: &str) -> Result<Option<u32>> {
        let user = User::from_name(name).with_context(|| format!("getpwnam({name})"))?;
        Ok(user.map(|u| u.uid.as_raw()))
    }

    fn lookup_group(&self, name: &str) -> Result<Option<u32>> {
        let group = Group::from_name(name).with_context(|| format!("getgrnam({name})"))?;
        Ok(group.map(|g| g.gid.as_raw()))
    }
}

/// Whether this process runs with root privileges.
#[must_use]
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}
