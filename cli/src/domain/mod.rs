//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod enrollment;
pub mod error;
pub mod install;
pub mod layout;
pub mod ownership;

pub use enrollment::{EnrollPlan, EnrollmentFlags, EnrollmentRecord};
pub use error::{EnrollError, InstallError, LockError};
pub use install::{
    AgentStatus, CustomAccount, Flavor, InstallOptions, InstallRequest, InstallState, StateReport,
    classify,
};
pub use layout::InstallLayout;
pub use ownership::{Account, OwnershipDescriptor, OwnershipTarget, PrivilegeMode};
