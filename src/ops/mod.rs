//! High-level operations.
//!
//! This module contains the implementation of pkgboot commands.

pub mod pkgboot_build;

pub use pkgboot_build::{build, configure, plan, BuildOptions, Configured};
