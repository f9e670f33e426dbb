//! Source and test discovery.
//!
//! Library sources come from `src/`, test sources from `test/`. The two
//! roots are walked separately so the sets never overlap.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::platform::PlatformProfile;
use crate::core::workspace::Layout;
use crate::util::fs::find_files;

/// Pattern of test sources.
pub const TEST_PATTERN: &str = "*.cpp";

/// Discovered translation units, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    /// Library translation units
    pub library_sources: Vec<PathBuf>,
    /// One entry per standalone test program
    pub test_sources: Vec<PathBuf>,
}

impl SourceSet {
    /// Get the name of a test: its path under `test/` without extension,
    /// with `/` separators.
    pub fn test_name(layout: &Layout, source: &Path) -> String {
        let rel = source
            .strip_prefix(layout.test_dir())
            .unwrap_or(source)
            .with_extension("");
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// What to leave out of the library sources.
#[derive(Debug, Clone, Default)]
pub struct Exclusions<'a> {
    /// Base name of the precompiled-header translation unit; excluded
    /// wherever it appears
    pub common_source: &'a str,
    /// Program entry point, excluded only at `src/<entry>`
    pub entry: Option<&'a str>,
}

/// Enumerate library and test sources.
pub fn discover_sources(
    layout: &Layout,
    profile: &PlatformProfile,
    exclusions: &Exclusions<'_>,
) -> Result<SourceSet> {
    let entry_path = exclusions.entry.map(|e| layout.src_dir().join(e));

    let library_sources: Vec<PathBuf> = find_files(&layout.src_dir(), &profile.source_patterns())?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|n| n != exclusions.common_source)
                .unwrap_or(true)
        })
        .filter(|path| entry_path.as_deref() != Some(path.as_path()))
        .collect();

    let test_sources = find_files(&layout.test_dir(), &[TEST_PATTERN.to_string()])?;

    tracing::debug!(
        "discovered {} library sources, {} tests",
        library_sources.len(),
        test_sources.len()
    );

    Ok(SourceSet {
        library_sources,
        test_sources,
    })
}
