//! Ownership resolution: which account installed files must belong to.
//!
//! Computes the target identity only. Applying it (`chown`, ACLs) is the
//! installer's job.

use anyhow::{Context, Result};

use crate::application::ports::AccountDirectory;
use crate::domain::ownership::{DEFAULT_GROUP, DEFAULT_USER};
use crate::domain::{
    Account, CustomAccount, InstallError, OwnershipDescriptor, OwnershipTarget, PrivilegeMode,
};

/// Resolve the ownership target for an install.
///
/// - `Privileged`: the fixed root account.
/// - `Unprivileged`: the custom `--user` / `--group` when given (they must
///   exist), otherwise the dedicated default account, which the installer
///   creates when missing.
///
/// # Errors
///
/// Returns `InstallError::InvalidAccount` when a named account does not exist
/// or a required password is missing, and propagates lookup failures.
pub fn resolve_ownership(
    mode: PrivilegeMode,
    custom: &CustomAccount,
    accounts: &impl AccountDirectory,
    password_required: bool,
) -> Result<OwnershipTarget> {
    if mode == PrivilegeMode::Privileged {
        return Ok(OwnershipTarget::privileged());
    }

    if password_required
        && custom.user.is_some()
        && custom.password.as_deref().is_none_or(str::is_empty)
    {
        return Err(InstallError::InvalidAccount(
            "--password is required when --user is set".to_string(),
        )
        .into());
    }

    let (user, create_user) = match custom.user.as_deref() {
        Some(name) => {
            let id = accounts
                .lookup_user(name)
                .with_context(|| format!("looking up user '{name}'"))?
                .ok_or_else(|| InstallError::InvalidAccount(format!("user '{name}' does not exist")))?;
            (Account::new(name, Some(id)), false)
        }
        None => {
            let id = accounts
                .lookup_user(DEFAULT_USER)
                .with_context(|| format!("looking up user '{DEFAULT_USER}'"))?;
            (Account::new(DEFAULT_USER, id), id.is_none())
        }
    };

    let (group, create_group) = match custom.group.as_deref() {
        Some(name) => {
            let id = accounts
                .lookup_group(name)
                .with_context(|| format!("looking up group '{name}'"))?
                .ok_or_else(|| {
                    InstallError::InvalidAccount(format!("group '{name}' does not exist"))
                })?;
            (Account::new(name, Some(id)), false)
        }
        None => {
            let id = accounts
                .lookup_group(DEFAULT_GROUP)
                .with_context(|| format!("looking up group '{DEFAULT_GROUP}'"))?;
            (Account::new(DEFAULT_GROUP, id), id.is_none())
        }
    };

    tracing::debug!(user = %user.name, group = %group.name, create_user, create_group, "resolved ownership");
    Ok(OwnershipTarget {
        mode,
        descriptor: OwnershipDescriptor { user, group },
        create_user,
        create_group,
    })
}
