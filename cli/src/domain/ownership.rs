//! Account identities that installed files and the control socket must carry.

use serde::Serialize;

/// Well-known privileged account.
pub const ROOT_USER: &str = "root";
#[cfg(target_os = "macos")]
pub const ROOT_GROUP: &str = "wheel";
#[cfg(not(target_os = "macos"))]
pub const ROOT_GROUP: &str = "root";

/// Dedicated account created for unprivileged installs without `--user`.
pub const DEFAULT_USER: &str = "outpost-agent";
pub const DEFAULT_GROUP: &str = "outpost";

/// Whether a custom account requires `--password` on this platform.
pub const PASSWORD_REQUIRED: bool = cfg!(windows);

/// Privileged (root-owned) or unprivileged (dedicated/custom account) install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeMode {
    Privileged,
    Unprivileged,
}

/// A symbolic account name and its numeric id, when it exists on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub name: String,
    pub id: Option<u32>,
}

impl Account {
    #[must_use]
    pub fn new(name: &str, id: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            id,
        }
    }
}

/// Identity that every installed artifact must be owned by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipDescriptor {
    pub user: Account,
    pub group: Account,
}

impl OwnershipDescriptor {
    /// `root:root` (`root:wheel` on macOS).
    #[must_use]
    pub fn privileged() -> Self {
        Self {
            user: Account::new(ROOT_USER, Some(0)),
            group: Account::new(ROOT_GROUP, Some(0)),
        }
    }

    #[must_use]
    pub fn uid(&self) -> Option<u32> {
        self.user.id
    }

    #[must_use]
    pub fn gid(&self) -> Option<u32> {
        self.group.id
    }

    /// Whether processes for this identity run as root.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        self.user.id == Some(0)
    }
}

/// Resolved ownership plus what the installer still has to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipTarget {
    pub mode: PrivilegeMode,
    pub descriptor: OwnershipDescriptor,
    /// The default user does not exist yet and must be created.
    pub create_user: bool,
    /// The default group does not exist yet and must be created.
    pub create_group: bool,
}

impl OwnershipTarget {
    #[must_use]
    pub fn privileged() -> Self {
        Self {
            mode: PrivilegeMode::Privileged,
            descriptor: OwnershipDescriptor::privileged(),
            create_user: false,
            create_group: false,
        }
    }
}
