//! Platform profiles.
//!
//! A profile is selected once per build from the host platform identifier
//! and carries everything that differs between the Windows and unix-like
//! toolchains: compiler and linker flags, the assembly source pattern, the
//! precompiled-header strategy and artifact naming.

use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;

/// Platform identifier of the Windows profile.
pub const WINDOWS_PLATFORM: &str = "win32";

/// Identifiers known to be unix-like.
pub const UNIX_PLATFORMS: &[&str] = &[
    "linux", "darwin", "posix", "cygwin", "freebsd", "openbsd", "netbsd", "sunos", "aix",
];

/// Get the platform identifier of the host.
///
/// Uses the identifiers library declarations are tagged with (`win32`,
/// `darwin`, `linux`), falling back to the Rust OS name.
pub fn host_platform_id() -> String {
    match std::env::consts::OS {
        "windows" => WINDOWS_PLATFORM.to_string(),
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// What to do with a platform identifier that is neither Windows nor a
/// known unix-like identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPolicy {
    /// Treat it as unix-like.
    #[default]
    Fallback,
    /// Reject it with [`BuildError::UnsupportedPlatform`].
    Strict,
}

/// Profile family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    Unix,
}

/// How the precompiled header is produced and consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PchStrategy {
    /// The header is compiled as a side effect of compiling the common
    /// translation unit; other units consume it through a compiler flag.
    InlineCompile,
    /// The header is compiled by its own step into a standalone artifact;
    /// every unit force-includes the header.
    ExplicitArtifact,
}

/// Platform-specific build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Profile family
    pub family: PlatformFamily,
    /// Platform identifier the profile was resolved from
    pub platform: String,
    /// Flags for every C/C++ compilation
    pub cxxflags: Vec<String>,
    /// Flags for every link
    pub linkflags: Vec<String>,
    /// Glob pattern of assembly sources
    pub asm_pattern: String,
    /// Precompiled-header strategy
    pub pch: PchStrategy,
}

impl PlatformProfile {
    /// The Windows (MSVC) profile.
    pub fn windows() -> Self {
        PlatformProfile {
            family: PlatformFamily::Windows,
            platform: WINDOWS_PLATFORM.to_string(),
            cxxflags: ["/MT", "/EHsc", "/Zi", "/FS"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            linkflags: vec!["/DEBUG".to_string()],
            asm_pattern: "*.asm".to_string(),
            pch: PchStrategy::InlineCompile,
        }
    }

    /// The unix-like (GCC/Clang) profile for the given identifier.
    pub fn unix(platform: impl Into<String>) -> Self {
        PlatformProfile {
            family: PlatformFamily::Unix,
            platform: platform.into(),
            cxxflags: ["-g", "-Wall", "-fPIC"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            linkflags: Vec::new(),
            asm_pattern: "*.s".to_string(),
            pch: PchStrategy::ExplicitArtifact,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.family == PlatformFamily::Windows
    }

    /// Check if the profile targets macOS, where frameworks are linked.
    pub fn is_darwin(&self) -> bool {
        self.family == PlatformFamily::Unix && self.platform == "darwin"
    }

    /// Source patterns of library translation units.
    pub fn source_patterns(&self) -> Vec<String> {
        vec![
            "*.cpp".to_string(),
            "*.c".to_string(),
            self.asm_pattern.clone(),
        ]
    }

    /// Get the object file extension.
    pub fn object_extension(&self) -> &'static str {
        match self.family {
            PlatformFamily::Windows => "obj",
            PlatformFamily::Unix => "o",
        }
    }

    /// Get the library artifact filename.
    ///
    /// Windows builds a static library, unix-like platforms a shared one.
    pub fn library_filename(&self, name: &str) -> String {
        match self.family {
            PlatformFamily::Windows => format!("{}.lib", name),
            PlatformFamily::Unix if self.is_darwin() => format!("lib{}.dylib", name),
            PlatformFamily::Unix => format!("lib{}.so", name),
        }
    }

    /// Get an executable filename.
    pub fn executable_filename(&self, name: &str) -> String {
        match self.family {
            PlatformFamily::Windows => format!("{}.exe", name),
            PlatformFamily::Unix => name.to_string(),
        }
    }
}

/// Resolve the profile for a platform identifier.
///
/// `win32` selects the Windows profile. Every other identifier selects the
/// unix-like profile, except that unknown identifiers are rejected under
/// [`PlatformPolicy::Strict`].
pub fn resolve_profile(
    platform_id: &str,
    policy: PlatformPolicy,
) -> Result<PlatformProfile, BuildError> {
    if platform_id == WINDOWS_PLATFORM {
        return Ok(PlatformProfile::windows());
    }

    if !UNIX_PLATFORMS.contains(&platform_id) {
        match policy {
            PlatformPolicy::Strict => {
                return Err(BuildError::UnsupportedPlatform {
                    platform: platform_id.to_string(),
                })
            }
            PlatformPolicy::Fallback => {
                tracing::warn!(
                    "unknown platform `{}`, using the unix-like profile",
                    platform_id
                );
            }
        }
    }

    Ok(PlatformProfile::unix(platform_id))
}
