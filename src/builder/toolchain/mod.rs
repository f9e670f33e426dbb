//! Toolchain abstraction.
//!
//! A toolchain turns graph steps into concrete compiler, archiver and
//! linker invocations. The GCC/Clang driver serves the unix-like profile
//! and MSVC serves the Windows profile.

mod detect;
mod gcc;
mod msvc;

use std::path::{Path, PathBuf};

use crate::builder::graph::{ArchiveStep, CompileStep, LinkStep, PchStep};
use crate::util::environment::CapturedEnv;
use crate::util::process::ProcessBuilder;

pub use detect::detect_toolchain;
pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;

/// A command to run: program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Check if `arg` appears in the arguments.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Build a process running in `cwd` with exactly `env`.
    pub fn to_process(&self, env: &CapturedEnv, cwd: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .args(&self.args)
            .env(env)
            .cwd(cwd)
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlatform {
    Gcc,
    Clang,
    AppleClang,
    Msvc,
}

impl ToolchainPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainPlatform::Gcc => "gcc",
            ToolchainPlatform::Clang => "clang",
            ToolchainPlatform::AppleClang => "apple-clang",
            ToolchainPlatform::Msvc => "msvc",
        }
    }
}

impl std::fmt::Display for ToolchainPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of a translation unit, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cxx,
    Asm,
}

impl Language {
    pub fn of(source: &Path) -> Language {
        match source.extension().and_then(|e| e.to_str()) {
            Some("c") => Language::C,
            Some("s") | Some("S") | Some("asm") => Language::Asm,
            _ => Language::Cxx,
        }
    }
}

/// Command generation for one compiler family.
pub trait Toolchain: Send + Sync {
    fn platform(&self) -> ToolchainPlatform;

    /// Get the C++ compiler.
    fn compiler_path(&self) -> &Path;

    /// Compile one translation unit to an object file.
    fn compile_command(&self, step: &CompileStep) -> CommandSpec;

    /// Produce a standalone precompiled header.
    ///
    /// Only the explicit-artifact strategy has a standalone step.
    fn pch_command(&self, step: &PchStep) -> CommandSpec;

    /// Bundle objects into a static library.
    fn archive_command(&self, step: &ArchiveStep) -> CommandSpec;

    /// Link a shared library or executable.
    fn link_command(&self, step: &LinkStep) -> CommandSpec;
}

impl std::fmt::Debug for dyn Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("platform", &self.platform())
            .field("compiler", &self.compiler_path())
            .finish()
    }
}

fn define_value(name: &str, value: &str) -> String {
    format!("{}={}", name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of() {
        assert_eq!(Language::of(Path::new("a.cpp")), Language::Cxx);
        assert_eq!(Language::of(Path::new("a.cc")), Language::Cxx);
        assert_eq!(Language::of(Path::new("a.c")), Language::C);
        assert_eq!(Language::of(Path::new("a.s")), Language::Asm);
        assert_eq!(Language::of(Path::new("a.asm")), Language::Asm);
    }

    #[test]
    fn test_command_spec() {
        let cmd = CommandSpec::new("g++").arg("-c").args(["a.cpp", "-o", "a.o"]);
        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert_eq!(cmd.args, vec!["-c", "a.cpp", "-o", "a.o"]);
        assert!(cmd.has_arg("-o"));
        assert!(!cmd.has_arg("-O2"));
    }
}
