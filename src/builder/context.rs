//! Build context - profile, layout, mode and captured environment.
//!
//! Everything the assembler needs to know about the host, captured once
//! before the graph is declared.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::platform::PlatformProfile;
use crate::core::workspace::Layout;
use crate::util::environment::CapturedEnv;

/// Build mode.
///
/// Accepted and reported; no flags depend on it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Debug,
    Release,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(BuildMode::Debug),
            "release" => Ok(BuildMode::Release),
            other => Err(format!(
                "unknown build mode `{}` (expected `debug` or `release`)",
                other
            )),
        }
    }
}

/// Build context shared by the assembler and the runner.
#[derive(Clone)]
pub struct BuildContext {
    /// Platform profile
    pub profile: PlatformProfile,

    /// Package layout
    pub layout: Layout,

    /// Build mode
    pub mode: BuildMode,

    /// Environment passed to every spawned process
    pub env: CapturedEnv,

    /// Root of the Windows toolchain layout
    pub toolchain_root: PathBuf,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("platform", &self.profile.platform)
            .field("family", &self.profile.family)
            .field("root", &self.layout.root())
            .field("mode", &self.mode)
            .field("env_vars", &self.env.len())
            .field("toolchain_root", &self.toolchain_root)
            .finish()
    }
}

impl BuildContext {
    /// Create a context, capturing the process environment.
    pub fn new(
        profile: PlatformProfile,
        layout: Layout,
        mode: BuildMode,
        toolchain_root: impl Into<PathBuf>,
    ) -> Self {
        let toolchain_root = toolchain_root.into();
        let env = CapturedEnv::capture().for_profile(&profile, &toolchain_root);

        BuildContext {
            profile,
            layout,
            mode,
            env,
            toolchain_root,
        }
    }

    /// Replace the captured environment.
    ///
    /// The profile's adjustments are applied to `env`.
    pub fn with_env(mut self, env: CapturedEnv) -> Self {
        self.env = env.for_profile(&self.profile, &self.toolchain_root);
        self
    }

    /// Get the platform identifier.
    pub fn platform(&self) -> &str {
        &self.profile.platform
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn is_release(&self) -> bool {
        self.mode == BuildMode::Release
    }

    /// Include directories placed before the user's.
    pub fn leading_includes(&self) -> Vec<PathBuf> {
        if self.profile.is_windows() {
            vec![self.toolchain_root.join("include")]
        } else {
            Vec::new()
        }
    }

    /// Include directories placed after the user's.
    pub fn trailing_includes(&self) -> Vec<PathBuf> {
        vec![self.layout.include_dir(), self.layout.src_dir()]
    }

    /// Library directories placed after the user's.
    pub fn trailing_library_paths(&self) -> Vec<PathBuf> {
        if self.profile.is_windows() {
            vec![self.toolchain_root.join("lib")]
        } else {
            Vec::new()
        }
    }
}
