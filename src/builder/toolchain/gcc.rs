//! GCC and Clang toolchain.

use std::path::{Path, PathBuf};

use crate::builder::graph::{ArchiveStep, CompileStep, LinkKind, LinkStep, PchStep};

use super::{define_value, CommandSpec, Language, Toolchain, ToolchainPlatform};

/// GCC-compatible driver (GCC, Clang, Apple Clang).
#[derive(Debug, Clone)]
pub struct GccToolchain {
    /// C compiler, used for `.c` and assembly sources
    pub cc: PathBuf,
    /// C++ compiler, also the link driver
    pub cxx: PathBuf,
    /// Archiver
    pub ar: PathBuf,
    pub family: ToolchainPlatform,
    /// Pass `-framework` to the linker
    pub frameworks: bool,
}

impl GccToolchain {
    pub fn new(cc: PathBuf, cxx: PathBuf, ar: PathBuf, family: ToolchainPlatform) -> Self {
        GccToolchain {
            cc,
            cxx,
            ar,
            family,
            frameworks: false,
        }
    }

    /// Enable or disable `-framework` link arguments.
    pub fn with_frameworks(mut self, enabled: bool) -> Self {
        self.frameworks = enabled;
        self
    }

    /// Infer the C++ compiler from the C compiler.
    ///
    /// - gcc, x86_64-linux-gnu-gcc -> g++, x86_64-linux-gnu-g++
    /// - clang -> clang++
    /// - cc, /usr/bin/cc -> c++, /usr/bin/c++
    pub fn infer_cxx(cc: &Path) -> PathBuf {
        let cc_str = cc.to_string_lossy();

        if cc_str.ends_with("gcc") {
            return PathBuf::from(format!("{}++", &cc_str[..cc_str.len() - 2]));
        }

        if cc_str.ends_with("clang") {
            return PathBuf::from(format!("{}++", cc_str));
        }

        // Only a complete "cc" basename, not "mycc"
        let is_standalone_cc = cc_str == "cc"
            || cc_str.ends_with("/cc")
            || cc_str.ends_with("\\cc")
            || cc_str.ends_with("-cc");

        if is_standalone_cc {
            return PathBuf::from(format!("{}++", &cc_str[..cc_str.len() - 1]));
        }

        PathBuf::from(format!("{}++", cc_str))
    }

    fn driver(&self, lang: Language) -> &Path {
        match lang {
            Language::Cxx => &self.cxx,
            Language::C | Language::Asm => &self.cc,
        }
    }

    fn preprocessor_args(
        mut cmd: CommandSpec,
        include_dirs: &[PathBuf],
        defines: &std::collections::BTreeMap<String, String>,
    ) -> CommandSpec {
        for dir in include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }
        for (name, value) in defines {
            cmd = cmd.arg(format!("-D{}", define_value(name, value)));
        }
        cmd
    }
}

impl Toolchain for GccToolchain {
    fn platform(&self) -> ToolchainPlatform {
        self.family
    }

    fn compiler_path(&self) -> &Path {
        &self.cxx
    }

    fn compile_command(&self, step: &CompileStep) -> CommandSpec {
        let cmd = CommandSpec::new(self.driver(Language::of(&step.source))).arg("-c");
        Self::preprocessor_args(cmd, &step.include_dirs, &step.defines)
            .args(step.cxxflags.iter().cloned())
            .arg(step.source.display().to_string())
            .arg("-o")
            .arg(step.output.display().to_string())
    }

    fn pch_command(&self, step: &PchStep) -> CommandSpec {
        let cmd = CommandSpec::new(&self.cxx).args(["-x", "c++-header"]);
        Self::preprocessor_args(cmd, &step.include_dirs, &step.defines)
            .args(step.cxxflags.iter().cloned())
            .arg(step.staged_header.display().to_string())
            .arg("-o")
            .arg(step.output.display().to_string())
    }

    fn archive_command(&self, step: &ArchiveStep) -> CommandSpec {
        CommandSpec::new(&self.ar)
            .arg("rcs")
            .arg(step.output.display().to_string())
            .args(step.objects.iter().map(|o| o.display().to_string()))
    }

    fn link_command(&self, step: &LinkStep) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.cxx);

        if step.kind == LinkKind::SharedLib {
            cmd = cmd.arg("-shared");
        }

        cmd = cmd
            .arg("-o")
            .arg(step.output.display().to_string())
            .args(step.objects.iter().map(|o| o.display().to_string()));

        for dir in &step.lib_dirs {
            cmd = cmd.arg(format!("-L{}", dir.display()));
        }
        for lib in &step.libs {
            cmd = cmd.arg(format!("-l{}", lib));
        }
        if self.frameworks {
            for framework in &step.frameworks {
                cmd = cmd.arg("-framework").arg(framework.clone());
            }
        }

        cmd.args(step.ldflags.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn toolchain() -> GccToolchain {
        GccToolchain::new(
            PathBuf::from("gcc"),
            PathBuf::from("g++"),
            PathBuf::from("ar"),
            ToolchainPlatform::Gcc,
        )
    }

    fn compile_step(source: &str) -> CompileStep {
        let mut defines = BTreeMap::new();
        defines.insert("VERSION".to_string(), "0.1.0".to_string());
        defines.insert("BRANCH".to_string(), String::new());

        CompileStep {
            source: PathBuf::from(source),
            output: PathBuf::from("build/src/a.o"),
            include_dirs: vec![PathBuf::from("build/pch"), PathBuf::from("include")],
            defines,
            cxxflags: vec![
                "-Wall".to_string(),
                "-include".to_string(),
                "demo/Common.hpp".to_string(),
            ],
        }
    }

    #[test]
    fn test_compile_command() {
        let cmd = toolchain().compile_command(&compile_step("src/a.cpp"));

        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert_eq!(cmd.args[0], "-c");
        assert!(cmd.has_arg("-Ibuild/pch"));
        assert!(cmd.has_arg("-DVERSION=0.1.0"));
        assert!(cmd.has_arg("-DBRANCH="));
        assert!(cmd.args.windows(2).any(|w| w == ["-include", "demo/Common.hpp"]));
        assert_eq!(cmd.args[cmd.args.len() - 2..], ["-o", "build/src/a.o"]);

        // Search order is preserved
        let pch = cmd.args.iter().position(|a| a == "-Ibuild/pch").unwrap();
        let include = cmd.args.iter().position(|a| a == "-Iinclude").unwrap();
        assert!(pch < include);
    }

    #[test]
    fn test_c_and_asm_use_c_driver() {
        let tc = toolchain();
        assert_eq!(tc.compile_command(&compile_step("src/a.c")).program, PathBuf::from("gcc"));
        assert_eq!(tc.compile_command(&compile_step("src/a.s")).program, PathBuf::from("gcc"));
    }

    #[test]
    fn test_pch_command() {
        let step = PchStep {
            header: PathBuf::from("include/demo/Common.hpp"),
            staged_header: PathBuf::from("build/pch/demo/Common.hpp"),
            output: PathBuf::from("build/pch/demo/Common.hpp.gch"),
            include_dirs: vec![PathBuf::from("include")],
            defines: BTreeMap::new(),
            cxxflags: vec!["-g".to_string()],
        };
        let cmd = toolchain().pch_command(&step);
        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert_eq!(cmd.args[..2], ["-x", "c++-header"]);
        assert!(cmd.has_arg("build/pch/demo/Common.hpp"));
        assert!(!cmd.has_arg("include/demo/Common.hpp"));
        assert!(cmd.has_arg("build/pch/demo/Common.hpp.gch"));
    }

    #[test]
    fn test_archive_command() {
        let step = ArchiveStep {
            objects: vec![PathBuf::from("a.o"), PathBuf::from("b.o")],
            output: PathBuf::from("lib/libdemo.a"),
        };
        let cmd = toolchain().archive_command(&step);
        assert_eq!(cmd.program, PathBuf::from("ar"));
        assert_eq!(cmd.args, vec!["rcs", "lib/libdemo.a", "a.o", "b.o"]);
    }

    #[test]
    fn test_link_commands() {
        let mut step = LinkStep {
            kind: LinkKind::SharedLib,
            objects: vec![PathBuf::from("a.o")],
            output: PathBuf::from("lib/libdemo.so"),
            lib_dirs: vec![PathBuf::from("/opt/lib")],
            libs: vec!["m".to_string()],
            frameworks: vec!["Cocoa".to_string()],
            ldflags: vec!["-Wl,-rpath,/x/lib".to_string()],
        };

        let cmd = toolchain().link_command(&step);
        assert_eq!(cmd.program, PathBuf::from("g++"));
        assert_eq!(cmd.args[0], "-shared");
        assert!(cmd.has_arg("-L/opt/lib"));
        assert!(cmd.has_arg("-lm"));
        assert!(!cmd.has_arg("-framework"));
        assert_eq!(cmd.args.last().unwrap(), "-Wl,-rpath,/x/lib");

        step.kind = LinkKind::Executable;
        let cmd = toolchain().with_frameworks(true).link_command(&step);
        assert!(!cmd.has_arg("-shared"));
        assert!(cmd.args.windows(2).any(|w| w == ["-framework", "Cocoa"]));
    }

    #[test]
    fn test_infer_cxx() {
        assert_eq!(GccToolchain::infer_cxx(Path::new("gcc")), PathBuf::from("g++"));
        assert_eq!(
            GccToolchain::infer_cxx(Path::new("x86_64-linux-gnu-gcc")),
            PathBuf::from("x86_64-linux-gnu-g++")
        );
        assert_eq!(GccToolchain::infer_cxx(Path::new("clang")), PathBuf::from("clang++"));
        assert_eq!(GccToolchain::infer_cxx(Path::new("/usr/bin/cc")), PathBuf::from("/usr/bin/c++"));
    }
}
