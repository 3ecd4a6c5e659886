//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, file
//! locking, account lookups, systemd registration, and logging.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod accounts;
pub mod command_runner;
pub mod enrollment_store;
pub mod host;
pub mod lock;
pub mod logging;
pub mod permissions;
pub mod process;
pub mod systemd;
