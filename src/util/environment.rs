//! Process environment captured for spawned tools.
//!
//! The environment is snapshotted once when the build is configured and
//! passed unchanged to every compiler, linker and test process.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::platform::PlatformProfile;

/// Default root of the Windows toolchain layout.
pub const DEFAULT_TOOLCHAIN_ROOT: &str = r"C:\WinBrew";

/// A read-only snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedEnv {
    vars: BTreeMap<String, String>,
}

impl CapturedEnv {
    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .map(|(k, v)| (lossy(k), lossy(v))),
        )
    }

    /// Build a snapshot from explicit variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CapturedEnv {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Get the name under which `PATH` is stored (`Path` on some Windows hosts).
    fn path_key(&self) -> String {
        self.vars
            .keys()
            .find(|k| k.eq_ignore_ascii_case("PATH"))
            .cloned()
            .unwrap_or_else(|| "PATH".to_string())
    }

    /// Get the `PATH` entries.
    pub fn path_entries(&self) -> Vec<PathBuf> {
        self.vars
            .get(&self.path_key())
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Append directories to `PATH`, after the existing entries.
    pub fn with_path_appended(mut self, dirs: &[PathBuf]) -> Self {
        let key = self.path_key();
        let mut entries = self.path_entries();
        entries.extend(dirs.iter().cloned());

        match std::env::join_paths(&entries) {
            Ok(joined) => {
                self.vars.insert(key, lossy(joined));
            }
            Err(e) => tracing::warn!("could not extend PATH: {}", e),
        }
        self
    }

    /// Apply the profile's adjustments.
    ///
    /// On the Windows profile `PATH` gains `<root>\lib` and `<root>\bin`.
    pub fn for_profile(self, profile: &PlatformProfile, toolchain_root: &Path) -> Self {
        if profile.is_windows() {
            self.with_path_appended(&[toolchain_root.join("lib"), toolchain_root.join("bin")])
        } else {
            self
        }
    }
}

fn lossy(s: OsString) -> String {
    s.to_string_lossy().into_owned()
}
