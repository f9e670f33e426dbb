//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use walkdir::WalkDir;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files under `base` whose file name matches one of `patterns`.
///
/// The walk is recursive and the result sorted, so repeated calls on an
/// unchanged tree return the same list. A missing `base` yields nothing.
pub fn find_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let compiled = patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid glob pattern: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(base).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("walk error: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if compiled.iter().any(|p| p.matches(&name)) {
            results.push(entry.into_path());
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Map a file under `from` to the same relative location under `to`,
/// replacing its extension.
pub fn mirror_path(path: &Path, from: &Path, to: &Path, extension: &str) -> PathBuf {
    to.join(relative_path(from, path)).with_extension(extension)
}
