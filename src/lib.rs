//! pkgboot - build configuration for small C/C++ packages
//!
//! A package is described by a `Pkgboot.toml` manifest. pkgboot derives
//! the platform-specific compiler and linker settings, discovers sources
//! and tests by directory convention, and assembles a task graph in which
//! the precompiled header is built before the library, the library before
//! the tests, and a `check` target runs every test and aggregates the
//! result.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities for pkgboot unit tests.
///
/// Provides on-disk package fixtures and a scripted action runner.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildContext, BuildError, BuildPlan, TaskGraph};
pub use core::{Manifest, PackageConfig, PlatformProfile, Workspace};
