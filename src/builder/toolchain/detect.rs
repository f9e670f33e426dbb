//! Toolchain detection.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::platform::PlatformProfile;
use crate::util::config::ToolchainSettings;
use crate::util::environment::CapturedEnv;
use crate::util::process::ProcessBuilder;

use super::{GccToolchain, MsvcToolchain, Toolchain, ToolchainPlatform};

/// Detect the toolchain for `profile`.
///
/// Each tool is taken from, in order:
/// 1. The `[toolchain]` config section
/// 2. The `CC`, `CXX` and `AR` variables of the captured environment
/// 3. A search of the captured `PATH`
///
/// The Windows profile uses MSVC (`cl`, `lib`, `link`) and expects a
/// developer environment; every other profile uses a GCC-compatible driver.
pub fn detect_toolchain(
    profile: &PlatformProfile,
    settings: &ToolchainSettings,
    env: &CapturedEnv,
) -> Result<Box<dyn Toolchain>> {
    if profile.is_windows() {
        return detect_msvc(settings, env);
    }
    detect_gcc(profile, settings, env)
}

fn search(env: &CapturedEnv, names: &[&str]) -> Option<PathBuf> {
    let entries = env.path_entries();
    if entries.is_empty() {
        return None;
    }
    let paths = std::env::join_paths(entries).ok()?;
    let cwd = std::env::current_dir().ok()?;
    names
        .iter()
        .find_map(|name| which::which_in(name, Some(&paths), &cwd).ok())
}

fn configured(path: &Option<PathBuf>, what: &str) -> Option<PathBuf> {
    let path = path.as_ref()?;
    if path.components().count() > 1 && !path.exists() {
        tracing::warn!("configured {} not found: {}", what, path.display());
        return None;
    }
    Some(path.clone())
}

fn detect_msvc(settings: &ToolchainSettings, env: &CapturedEnv) -> Result<Box<dyn Toolchain>> {
    let cl = configured(&settings.cxx, "compiler").or_else(|| search(env, &["cl"]));
    let lib = configured(&settings.ar, "librarian").or_else(|| search(env, &["lib"]));
    let link = search(env, &["link"]);

    match (cl, lib, link) {
        (Some(cl), Some(lib), Some(link)) => {
            tracing::debug!("using MSVC: cl={}", cl.display());
            Ok(Box::new(MsvcToolchain::new(cl, lib, link)))
        }
        _ => bail!(
            "MSVC tools not found\n\
             \n\
             pkgboot needs cl.exe, lib.exe and link.exe on PATH.\n\
             Run it from a Developer Command Prompt or set `toolchain.cxx`."
        ),
    }
}

fn detect_gcc(
    profile: &PlatformProfile,
    settings: &ToolchainSettings,
    env: &CapturedEnv,
) -> Result<Box<dyn Toolchain>> {
    let from_env = |key: &str| env.get(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    let cxx = configured(&settings.cxx, "C++ compiler")
        .or_else(|| from_env("CXX"))
        .or_else(|| search(env, &["c++", "g++", "clang++"]));

    let Some(cxx) = cxx else {
        bail!(
            "no C++ compiler found\n\
             \n\
             pkgboot requires a C++ compiler (g++ or clang++).\n\
             Set the CXX environment variable or `toolchain.cxx` in .pkgboot/config.toml."
        )
    };

    // C sources fall back to the C++ driver
    let cc = configured(&settings.cc, "C compiler")
        .or_else(|| from_env("CC"))
        .or_else(|| search(env, &["cc", "gcc", "clang"]))
        .unwrap_or_else(|| cxx.clone());

    let ar = configured(&settings.ar, "archiver")
        .or_else(|| from_env("AR"))
        .or_else(|| search(env, &["ar", "llvm-ar"]))
        .unwrap_or_else(|| PathBuf::from("ar"));

    let family = detect_compiler_family(&cxx, env);
    tracing::debug!(
        "using {} toolchain: cxx={}, cc={}, ar={}",
        family,
        cxx.display(),
        cc.display(),
        ar.display()
    );

    Ok(Box::new(
        GccToolchain::new(cc, cxx, ar, family).with_frameworks(profile.is_darwin()),
    ))
}

/// Detect whether the compiler is GCC, Clang, or Apple Clang.
fn detect_compiler_family(compiler: &Path, env: &CapturedEnv) -> ToolchainPlatform {
    let name = compiler
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name.contains("g++") || name.contains("gcc") {
        return ToolchainPlatform::Gcc;
    }

    let version = ProcessBuilder::new(compiler)
        .arg("--version")
        .env(env)
        .exec()
        .map(|out| String::from_utf8_lossy(&out.stdout).to_lowercase())
        .unwrap_or_default();

    classify_version(&name, &version)
}

fn classify_version(name: &str, version: &str) -> ToolchainPlatform {
    if version.contains("apple") && version.contains("clang") {
        ToolchainPlatform::AppleClang
    } else if version.contains("clang") || name.contains("clang") {
        ToolchainPlatform::Clang
    } else {
        ToolchainPlatform::Gcc
    }
}
