//! Workspace - package root and directory layout.
//!
//! The layout is fixed:
//!
//! ```text
//! <root>/
//!   Pkgboot.toml
//!   include/          public headers
//!   src/              library sources
//!   test/             one standalone program per source
//!   build/src/        library objects
//!   build/test/       test objects
//!   build/pch/        precompiled header
//!   lib/              library artifact
//!   bin/              executable
//!   bin/test/         test programs
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::core::manifest::{Manifest, MANIFEST_NAME};

/// Errors locating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("could not find `{}` in `{}` or any parent directory", MANIFEST_NAME, dir.display())]
    NotFound { dir: PathBuf },
}

/// Find the manifest starting from `start` and searching upward.
pub fn find_manifest(start: &Path) -> Result<PathBuf, ManifestError> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(ManifestError::NotFound {
                dir: start.to_path_buf(),
            });
        }
    }
}

/// Directory layout of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Layout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.root.join("test")
    }

    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Object directory mirroring `src/`.
    pub fn build_src_dir(&self) -> PathBuf {
        self.build_dir().join("src")
    }

    /// Object directory mirroring `test/`.
    pub fn build_test_dir(&self) -> PathBuf {
        self.build_dir().join("test")
    }

    pub fn pch_dir(&self) -> PathBuf {
        self.build_dir().join("pch")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn test_bin_dir(&self) -> PathBuf {
        self.bin_dir().join("test")
    }

    /// Express `path` relative to the root when it lies inside it.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// A loaded package.
#[derive(Debug)]
pub struct Workspace {
    manifest: Manifest,
    manifest_path: PathBuf,
    layout: Layout,
}

impl Workspace {
    /// Load the workspace whose manifest is at `manifest_path`.
    pub fn new(manifest_path: &Path) -> Result<Self> {
        let manifest = Manifest::load(manifest_path)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Workspace {
            manifest,
            manifest_path: manifest_path.to_path_buf(),
            layout: Layout::new(root),
        })
    }

    /// Find and load the workspace containing `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self> {
        let path = find_manifest(cwd)?;
        tracing::debug!("using manifest {}", path.display());
        Self::new(&path)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// Create the output directories.
    pub fn ensure_output_dirs(&self) -> Result<()> {
        for dir in [
            self.layout.build_src_dir(),
            self.layout.build_test_dir(),
            self.layout.pch_dir(),
            self.layout.lib_dir(),
            self.layout.test_bin_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
