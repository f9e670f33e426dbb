//! Pkgboot.toml manifest parsing.
//!
//! The manifest is the package descriptor. Loading it always produces a
//! fresh [`PackageConfig`]; nothing is shared between loads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::library::LibraryRef;
use crate::core::package::{
    PackageConfig, PackageKind, PackageVersion, DEFAULT_COMMON_SOURCE, DEFAULT_ENTRY,
};
use crate::util::vcs::SourceControl;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "Pkgboot.toml";

/// Parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageSection,
}

fn default_version_part() -> String {
    "0".to_string()
}

fn default_common_source() -> String {
    DEFAULT_COMMON_SOURCE.to_string()
}

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

/// `[package]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,

    #[serde(default)]
    pub kind: PackageKind,

    #[serde(default = "default_version_part")]
    pub major_version: String,

    #[serde(default = "default_version_part")]
    pub minor_version: String,

    #[serde(default = "default_version_part")]
    pub patch: String,

    /// Precompiled header; defaults to `<name>/Common.hpp`
    #[serde(default)]
    pub pch: Option<PathBuf>,

    #[serde(default = "default_common_source")]
    pub common_source: String,

    #[serde(default = "default_entry")]
    pub entry: String,

    #[serde(default)]
    pub defines: BTreeMap<String, String>,

    #[serde(default)]
    pub includes: Vec<PathBuf>,

    #[serde(default)]
    pub lib_path: Vec<PathBuf>,

    #[serde(default)]
    pub libs: Vec<LibraryRef>,

    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Get the declared package name.
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Build the package configuration.
    ///
    /// Source-control metadata is queried exactly once, here.
    pub fn to_config(&self, vcs: &dyn SourceControl) -> Result<PackageConfig> {
        let pkg = &self.package;
        let mut config = PackageConfig::new(&pkg.name)
            .with_kind(pkg.kind)
            .with_version(PackageVersion::new(
                &pkg.major_version,
                &pkg.minor_version,
                &pkg.patch,
            ))
            .with_vcs(vcs.metadata());

        if let Some(pch) = &pkg.pch {
            config.pch_header = pch.clone();
        }
        config.common_source = pkg.common_source.clone();
        config.entry = pkg.entry.clone();
        config.defines = pkg.defines.clone();
        config.includes = pkg.includes.clone();
        config.library_paths = pkg.lib_path.clone();
        config.libraries = pkg.libs.clone();
        config.frameworks = pkg.frameworks.clone();

        config.validate()?;
        Ok(config)
    }
}
