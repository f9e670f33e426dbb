//! Package configuration.
//!
//! A `PackageConfig` is the fully-owned description of one package: its
//! name and version, the source-control metadata captured when the build
//! was configured, and the user's defines, search paths and libraries.
//! It is immutable once handed to the build plan assembler.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;
use crate::core::library::LibraryRef;
use crate::util::vcs::VcsInfo;

/// Define carrying the dotted package version.
pub const VERSION_DEFINE: &str = "VERSION";
/// Define carrying the VCS revision.
pub const REVISION_DEFINE: &str = "REVISION";
/// Define carrying the VCS branch.
pub const BRANCH_DEFINE: &str = "BRANCH";

/// Defines owned by pkgboot; user values for these never win.
pub const RESERVED_DEFINES: [&str; 3] = [VERSION_DEFINE, REVISION_DEFINE, BRANCH_DEFINE];

/// Default name of the precompiled-header translation unit.
pub const DEFAULT_COMMON_SOURCE: &str = "Common.cpp";

/// Default entry point of executable packages.
pub const DEFAULT_ENTRY: &str = "main.cpp";

/// What the package produces besides its library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PackageKind {
    /// Only the library artifact
    #[default]
    #[serde(rename = "lib", alias = "library")]
    Library,
    /// The library plus a linked program
    #[serde(rename = "bin", alias = "exe", alias = "executable")]
    Executable,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Library => "lib",
            PackageKind::Executable => "bin",
        }
    }
}

/// Three-part package version, kept as the strings the author wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl PackageVersion {
    pub fn new(
        major: impl Into<String>,
        minor: impl Into<String>,
        patch: impl Into<String>,
    ) -> Self {
        PackageVersion {
            major: major.into(),
            minor: minor.into(),
            patch: patch.into(),
        }
    }
}

impl Default for PackageVersion {
    fn default() -> Self {
        PackageVersion::new("0", "0", "0")
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Configuration of a single package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    /// Package name, used as the artifact name
    pub name: String,

    /// Package version
    pub version: PackageVersion,

    /// Source-control metadata captured at configuration time
    pub vcs: VcsInfo,

    /// User-supplied preprocessor defines
    pub defines: BTreeMap<String, String>,

    /// Additional include directories, in search order
    pub includes: Vec<PathBuf>,

    /// Additional library search directories, in search order
    pub library_paths: Vec<PathBuf>,

    /// Libraries to link, in link order
    pub libraries: Vec<LibraryRef>,

    /// Frameworks to link (unix-like profile only)
    pub frameworks: Vec<String>,

    /// Package kind
    pub kind: PackageKind,

    /// Precompiled header, as written in `#include` directives
    pub pch_header: PathBuf,

    /// File name of the precompiled-header translation unit under `src/`
    pub common_source: String,

    /// File name of the program entry point under `src/`
    pub entry: String,
}

impl PackageConfig {
    /// Create a library package with default settings.
    ///
    /// The name is lowercased; the precompiled header defaults to
    /// `<name>/Common.hpp`.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().to_lowercase();
        let pch_header = PathBuf::from(&name).join("Common.hpp");

        PackageConfig {
            name,
            version: PackageVersion::default(),
            vcs: VcsInfo::default(),
            defines: BTreeMap::new(),
            includes: Vec::new(),
            library_paths: Vec::new(),
            libraries: Vec::new(),
            frameworks: Vec::new(),
            kind: PackageKind::Library,
            pch_header,
            common_source: DEFAULT_COMMON_SOURCE.to_string(),
            entry: DEFAULT_ENTRY.to_string(),
        }
    }

    /// Set the package version.
    pub fn with_version(mut self, version: PackageVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the source-control metadata.
    pub fn with_vcs(mut self, vcs: VcsInfo) -> Self {
        self.vcs = vcs;
        self
    }

    /// Set the package kind.
    pub fn with_kind(mut self, kind: PackageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a user define.
    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    /// Add a library reference.
    pub fn with_library(mut self, lib: LibraryRef) -> Self {
        self.libraries.push(lib);
        self
    }

    /// Get the dotted display version.
    pub fn display_version(&self) -> String {
        self.version.to_string()
    }

    /// Get the defines pkgboot always provides.
    pub fn reserved_defines(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (VERSION_DEFINE.to_string(), self.display_version()),
            (REVISION_DEFINE.to_string(), self.vcs.revision.clone()),
            (BRANCH_DEFINE.to_string(), self.vcs.branch.clone()),
        ])
    }

    /// Get the final define set.
    ///
    /// User defines are merged with the reserved ones; the reserved values
    /// always win. A user value that differs is reported and dropped.
    pub fn effective_defines(&self) -> BTreeMap<String, String> {
        let reserved = self.reserved_defines();
        let mut defines = self.defines.clone();

        for (key, value) in reserved {
            if let Some(user) = defines.get(&key) {
                if *user != value {
                    tracing::warn!(
                        "define `{}={}` is reserved; using `{}={}`",
                        key,
                        user,
                        key,
                        value
                    );
                }
            }
            defines.insert(key, value);
        }

        defines
    }

    /// Check the fields that must be usable before any node is declared.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.name.trim().is_empty() {
            return Err(BuildError::config("package name is empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(BuildError::config(format!(
                "package name `{}` must not contain path separators",
                self.name
            )));
        }
        if self.pch_header.as_os_str().is_empty() {
            return Err(BuildError::config("precompiled header path is empty"));
        }
        if self.common_source.trim().is_empty() {
            return Err(BuildError::config("common source file name is empty"));
        }
        if self.kind == PackageKind::Executable && self.entry.trim().is_empty() {
            return Err(BuildError::config("executable package has no entry point"));
        }
        if self.defines.keys().any(|key| key.trim().is_empty()) {
            return Err(BuildError::config("define with an empty name"));
        }
        for lib in &self.libraries {
            lib.validate()?;
        }
        Ok(())
    }
}
