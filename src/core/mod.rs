//! Core data structures for pkgboot.
//!
//! - Platform profiles and library filtering
//! - Package configuration and the manifest it is loaded from
//! - Workspace layout

pub mod library;
pub mod manifest;
pub mod package;
pub mod platform;
pub mod workspace;

pub use library::{filter_libraries, LibraryRef, PlatformSet};
pub use manifest::{Manifest, MANIFEST_NAME};
pub use package::{PackageConfig, PackageKind, PackageVersion};
pub use platform::{resolve_profile, PlatformPolicy, PlatformProfile, PchStrategy};
pub use workspace::{find_manifest, Layout, Workspace};
