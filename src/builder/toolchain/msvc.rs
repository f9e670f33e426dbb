//! MSVC toolchain.

use std::path::{Path, PathBuf};

use crate::builder::graph::{ArchiveStep, CompileStep, LinkKind, LinkStep, PchStep};

use super::{define_value, CommandSpec, Language, Toolchain, ToolchainPlatform};

/// MSVC toolchain (Windows).
#[derive(Debug, Clone)]
pub struct MsvcToolchain {
    /// Path to cl.exe (compiler)
    pub cl: PathBuf,
    /// Path to lib.exe (librarian)
    pub lib: PathBuf,
    /// Path to link.exe (linker)
    pub link: PathBuf,
    /// Path to ml64.exe (assembler)
    pub ml: PathBuf,
}

impl MsvcToolchain {
    /// Create a toolchain; the assembler is expected next to cl.exe.
    pub fn new(cl: PathBuf, lib: PathBuf, link: PathBuf) -> Self {
        let ml = cl.with_file_name("ml64.exe");
        MsvcToolchain { cl, lib, link, ml }
    }

    fn assemble_command(&self, step: &CompileStep) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.ml).arg("/nologo").arg("/c");
        for dir in &step.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }
        cmd.arg(format!("/Fo{}", step.output.display()))
            .arg(step.source.display().to_string())
    }
}

impl Toolchain for MsvcToolchain {
    fn platform(&self) -> ToolchainPlatform {
        ToolchainPlatform::Msvc
    }

    fn compiler_path(&self) -> &Path {
        &self.cl
    }

    fn compile_command(&self, step: &CompileStep) -> CommandSpec {
        let lang = Language::of(&step.source);
        if lang == Language::Asm {
            return self.assemble_command(step);
        }

        let mut cmd = CommandSpec::new(&self.cl).arg("/nologo").arg("/c");
        if lang == Language::Cxx {
            cmd = cmd.arg("/TP");
        }

        for dir in &step.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }
        for (name, value) in &step.defines {
            cmd = cmd.arg(format!("/D{}", define_value(name, value)));
        }

        cmd.args(step.cxxflags.iter().cloned())
            .arg(step.source.display().to_string())
            .arg(format!("/Fo{}", step.output.display()))
    }

    fn pch_command(&self, step: &PchStep) -> CommandSpec {
        let header = step.header.display().to_string();
        let mut cmd = CommandSpec::new(&self.cl)
            .arg("/nologo")
            .arg("/c")
            .arg("/TP")
            .arg(format!("/Yc{}", header))
            .arg(format!("/Fp{}", step.output.display()));

        for dir in &step.include_dirs {
            cmd = cmd.arg(format!("/I{}", dir.display()));
        }
        for (name, value) in &step.defines {
            cmd = cmd.arg(format!("/D{}", define_value(name, value)));
        }

        cmd.args(step.cxxflags.iter().cloned())
            .arg(header)
            .arg(format!("/Fo{}.obj", step.output.display()))
    }

    fn archive_command(&self, step: &ArchiveStep) -> CommandSpec {
        CommandSpec::new(&self.lib)
            .arg("/nologo")
            .arg(format!("/OUT:{}", step.output.display()))
            .args(step.objects.iter().map(|o| o.display().to_string()))
    }

    fn link_command(&self, step: &LinkStep) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.link).arg("/nologo");

        if step.kind == LinkKind::SharedLib {
            cmd = cmd.arg("/DLL");
        }

        cmd = cmd
            .arg(format!("/OUT:{}", step.output.display()))
            .args(step.objects.iter().map(|o| o.display().to_string()));

        for dir in &step.lib_dirs {
            cmd = cmd.arg(format!("/LIBPATH:{}", dir.display()));
        }
        for lib in &step.libs {
            cmd = cmd.arg(format!("{}.lib", lib));
        }

        cmd.args(step.ldflags.iter().cloned())
    }
}
