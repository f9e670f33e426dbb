//! On-disk package fixtures.
//!
//! A fixture is a temporary package laid out the way pkgboot expects:
//! manifest, precompiled header, common source, library sources and tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::manifest::MANIFEST_NAME;
use crate::core::package::PackageKind;
use crate::util::fs::write_string;

/// Generate a minimal manifest.
pub fn manifest_text(name: &str, kind: PackageKind) -> String {
    format!(
        r#"[package]
name = "{}"
kind = "{}"
major_version = "0"
minor_version = "1"
patch = "0"
"#,
        name,
        kind.as_str()
    )
}

/// A package written to a temporary directory.
#[derive(Debug)]
pub struct Fixture {
    dir: TempDir,
    name: String,
}

impl Fixture {
    /// Start a library package.
    pub fn library(name: &str) -> FixtureBuilder {
        FixtureBuilder::new(name, PackageKind::Library)
    }

    /// Start an executable package; `src/main.cpp` is written.
    pub fn executable(name: &str) -> FixtureBuilder {
        FixtureBuilder::new(name, PackageKind::Executable)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an absolute path inside the package.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path(MANIFEST_NAME)
    }
}

/// Builder for [`Fixture`].
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    name: String,
    kind: PackageKind,
    sources: Vec<String>,
    tests: Vec<(String, i32)>,
    common: bool,
    header: bool,
}

impl FixtureBuilder {
    fn new(name: &str, kind: PackageKind) -> Self {
        FixtureBuilder {
            name: name.to_string(),
            kind,
            sources: Vec::new(),
            tests: Vec::new(),
            common: true,
            header: true,
        }
    }

    /// Add a library source under `src/`.
    pub fn source(mut self, rel: &str) -> Self {
        self.sources.push(rel.to_string());
        self
    }

    /// Add a test under `test/` whose program exits with `exit_code`.
    pub fn test(mut self, rel: &str, exit_code: i32) -> Self {
        self.tests.push((rel.to_string(), exit_code));
        self
    }

    /// Leave out `src/Common.cpp`.
    pub fn without_common(mut self) -> Self {
        self.common = false;
        self
    }

    /// Leave out `include/<name>/Common.hpp`.
    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    /// Write the package.
    pub fn create(self) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let name = &self.name;
        let header = format!("{}/Common.hpp", name);

        write(root, MANIFEST_NAME, &manifest_text(name, self.kind));

        if self.header {
            write(
                root,
                &format!("include/{}", header),
                "#pragma once\n#include <cstdio>\n",
            );
        }
        if self.common {
            write(root, "src/Common.cpp", &format!("#include \"{}\"\n", header));
        }
        if self.kind == PackageKind::Executable {
            write(
                root,
                "src/main.cpp",
                &format!("#include \"{}\"\n\nint main() {{ return 0; }}\n", header),
            );
        }

        for (i, rel) in self.sources.iter().enumerate() {
            write(root, &format!("src/{}", rel), &source_body(rel, &header, i));
        }
        for (rel, code) in &self.tests {
            write(
                root,
                &format!("test/{}", rel),
                &format!("#include \"{}\"\n\nint main() {{ return {}; }}\n", header, code),
            );
        }

        Fixture {
            dir,
            name: self.name,
        }
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    write_string(&root.join(rel), contents).unwrap();
}

fn source_body(rel: &str, header: &str, index: usize) -> String {
    if rel.ends_with(".cpp") {
        format!(
            "#include \"{}\"\n\nint pkgboot_fixture_{}() {{ return {}; }}\n",
            header, index, index
        )
    } else if rel.ends_with(".c") {
        format!("int pkgboot_fixture_c_{}(void) {{ return {}; }}\n", index, index)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = Fixture::executable("demo")
            .source("a.cpp")
            .test("t.cpp", 1)
            .create();

        assert!(fixture.manifest_path().is_file());
        assert!(fixture.path("include/demo/Common.hpp").is_file());
        assert!(fixture.path("src/Common.cpp").is_file());
        assert!(fixture.path("src/main.cpp").is_file());
        assert!(fixture.path("src/a.cpp").is_file());

        let test = std::fs::read_to_string(fixture.path("test/t.cpp")).unwrap();
        assert!(test.contains("return 1;"));
    }

    #[test]
    fn test_fixture_omissions() {
        let fixture = Fixture::library("demo").without_common().without_header().create();
        assert!(!fixture.path("src/Common.cpp").exists());
        assert!(!fixture.path("include/demo/Common.hpp").exists());
        assert!(!fixture.path("src/main.cpp").exists());
    }
}
