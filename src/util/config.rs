//! Configuration file support for pkgboot.
//!
//! Two locations are read:
//! - Global: `~/.pkgboot/config.toml` - User-wide defaults
//! - Project: `.pkgboot/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::context::BuildMode;
use crate::core::platform::PlatformPolicy;
use crate::util::environment::DEFAULT_TOOLCHAIN_ROOT;

/// pkgboot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Toolchain overrides
    pub toolchain: ToolchainSettings,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Parallel jobs (None = one per CPU)
    pub jobs: Option<usize>,

    /// Handling of unknown platform identifiers
    pub platform_policy: Option<PlatformPolicy>,

    /// Default build mode
    pub mode: Option<BuildMode>,
}

/// Toolchain overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolchainSettings {
    /// C compiler (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,

    /// C++ compiler, also the link driver
    pub cxx: Option<PathBuf>,

    /// Archiver (e.g., /usr/bin/llvm-ar)
    pub ar: Option<PathBuf>,

    /// Root of the Windows toolchain layout
    pub root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.platform_policy.is_some() {
            self.build.platform_policy = other.build.platform_policy;
        }
        if other.build.mode.is_some() {
            self.build.mode = other.build.mode;
        }

        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if other.toolchain.cxx.is_some() {
            self.toolchain.cxx = other.toolchain.cxx;
        }
        if other.toolchain.ar.is_some() {
            self.toolchain.ar = other.toolchain.ar;
        }
        if other.toolchain.root.is_some() {
            self.toolchain.root = other.toolchain.root;
        }
    }

    pub fn platform_policy(&self) -> PlatformPolicy {
        self.build.platform_policy.unwrap_or_default()
    }

    pub fn mode(&self) -> BuildMode {
        self.build.mode.unwrap_or_default()
    }

    /// Get the Windows toolchain root, `C:\WinBrew` unless configured.
    pub fn toolchain_root(&self) -> PathBuf {
        self.toolchain
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLCHAIN_ROOT))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.pkgboot/config.toml)
/// 2. Global config (~/.pkgboot/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global) = global_path {
        config.merge(Config::load_or_default(global));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global pkgboot config directory (~/.pkgboot).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".pkgboot"))
}

/// Get the global config path (~/.pkgboot/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.pkgboot/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".pkgboot").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.build.jobs.is_none());
        assert_eq!(config.platform_policy(), PlatformPolicy::Fallback);
        assert_eq!(config.mode(), BuildMode::Debug);
        assert_eq!(config.toolchain_root(), PathBuf::from(DEFAULT_TOOLCHAIN_ROOT));
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[build]
jobs = 8
platform-policy = "strict"
mode = "release"

[toolchain]
cxx = "/usr/bin/clang++"
ar = "/usr/bin/llvm-ar"
root = "D:/Brew"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.build.jobs, Some(8));
        assert_eq!(config.platform_policy(), PlatformPolicy::Strict);
        assert_eq!(config.mode(), BuildMode::Release);
        assert_eq!(config.toolchain.cxx, Some(PathBuf::from("/usr/bin/clang++")));
        assert_eq!(config.toolchain.ar, Some(PathBuf::from("/usr/bin/llvm-ar")));
        assert_eq!(config.toolchain_root(), PathBuf::from("D:/Brew"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.build.jobs = Some(4);
        base.toolchain.cxx = Some(PathBuf::from("g++"));

        let mut override_cfg = Config::default();
        override_cfg.toolchain.cxx = Some(PathBuf::from("clang++"));

        base.merge(override_cfg);

        assert_eq!(base.toolchain.cxx, Some(PathBuf::from("clang++")));
        assert_eq!(base.build.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[build]\njobs = 2\n\n[toolchain]\ncxx = \"g++\"\nar = \"ar\"\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[toolchain]\ncxx = \"clang++\"\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);
        assert_eq!(config.toolchain.cxx, Some(PathBuf::from("clang++")));
        assert_eq!(config.toolchain.ar, Some(PathBuf::from("ar")));
        assert_eq!(config.build.jobs, Some(2));
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[build]\njobs = \"many\"\n").unwrap();

        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn test_project_config_path() {
        let path = project_config_path(Path::new("/work/demo"));
        assert_eq!(path, PathBuf::from("/work/demo/.pkgboot/config.toml"));
    }
}
