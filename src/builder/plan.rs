//! Build plan assembly.
//!
//! Composes the platform profile, library filter, discovery and the
//! precompiled-header builder into one task graph:
//!
//! ```text
//! pch -> compile* -> library -> (executable)
//!   \                   \
//!    +-----------------> build-test* -> run-test* -> check
//! ```
//!
//! Every input is resolved before the first node is declared, so a
//! configuration error never leaves a partial graph behind.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::discovery::{discover_sources, Exclusions, SourceSet};
use crate::builder::errors::BuildError;
use crate::builder::graph::{
    Action, ArchiveStep, CompileStep, GraphDescription, LinkKind, LinkStep, NodeId, RunTestStep,
    TaskGraph, TaskGraphEngine, TestBuildStep,
};
use crate::builder::pch::{build_pch, PchInputs, PchRule};
use crate::core::library::filter_libraries;
use crate::core::package::{PackageConfig, PackageKind};
use crate::core::workspace::Layout;
use crate::util::fs::mirror_path;

/// Target that compiles, runs and aggregates the tests.
pub const CHECK_TARGET: &str = "check";
/// Alias of the library artifact.
pub const LIB_TARGET: &str = "lib";
/// Alias of the executable.
pub const BIN_TARGET: &str = "bin";

/// Extensions compiled as C++ and therefore given the precompiled header.
const CXX_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];

/// Nodes of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNodes {
    /// Test name (path under `test/` without extension)
    pub name: String,
    /// Compile and link of the test program
    pub build: NodeId,
    /// Execution; present only when `check` was requested
    pub run: Option<NodeId>,
}

/// Handles to the nodes the assembler declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNodes {
    pub pch: NodeId,
    pub compiles: Vec<NodeId>,
    pub library: NodeId,
    pub executable: Option<NodeId>,
    pub tests: Vec<TestNodes>,
    pub check: Option<NodeId>,
}

/// An assembled, not yet executed, build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub graph: TaskGraph,
    pub nodes: PlanNodes,
    /// Libraries that survived platform filtering, in link order
    pub libraries: Vec<String>,
    /// Final define set
    pub defines: BTreeMap<String, String>,
}

impl BuildPlan {
    /// Check if test execution was wired.
    pub fn runs_tests(&self) -> bool {
        self.nodes.check.is_some()
    }

    pub fn test_count(&self) -> usize {
        self.nodes.tests.len()
    }

    pub fn describe(&self) -> GraphDescription {
        self.graph.describe()
    }
}

/// Assemble the build plan for the given command-line targets.
pub fn assemble(ctx: &BuildContext, config: &PackageConfig, targets: &[String]) -> Result<BuildPlan> {
    let mut graph = TaskGraph::new(targets.iter().cloned());
    let inputs = resolve_inputs(ctx, config)?;
    let nodes = wire(&mut graph, ctx, &inputs);

    tracing::debug!(
        "assembled {} nodes, {} edges for `{}`",
        graph.len(),
        graph.edge_count(),
        config.name
    );

    Ok(BuildPlan {
        graph,
        nodes,
        libraries: inputs.libraries,
        defines: inputs.defines,
    })
}

/// Assemble into an existing engine.
pub fn assemble_into(
    engine: &mut dyn TaskGraphEngine,
    ctx: &BuildContext,
    config: &PackageConfig,
) -> Result<PlanNodes> {
    let inputs = resolve_inputs(ctx, config)?;
    Ok(wire(engine, ctx, &inputs))
}

/// Get the node name of an output file: its path relative to the package
/// root with `/` separators.
pub fn node_name(layout: &Layout, path: &Path) -> String {
    layout
        .relative(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Everything the graph needs, resolved and validated.
#[derive(Debug)]
struct ResolvedInputs {
    name: String,
    defines: BTreeMap<String, String>,
    libraries: Vec<String>,
    frameworks: Vec<String>,
    include_dirs: Vec<PathBuf>,
    lib_dirs: Vec<PathBuf>,
    sources: SourceSet,
    pch: PchInputs,
    entry: Option<PathBuf>,
}

fn resolve_inputs(ctx: &BuildContext, config: &PackageConfig) -> Result<ResolvedInputs> {
    config.validate()?;

    let layout = &ctx.layout;
    let root = layout.root();
    let profile = &ctx.profile;

    let defines = config.effective_defines();
    let libraries = filter_libraries(&config.libraries, ctx.platform());

    let mut include_dirs = ctx.leading_includes();
    include_dirs.extend(config.includes.iter().map(|p| root.join(p)));
    include_dirs.extend(ctx.trailing_includes());

    let mut lib_dirs: Vec<PathBuf> = config.library_paths.iter().map(|p| root.join(p)).collect();
    lib_dirs.extend(ctx.trailing_library_paths());

    let entry = match config.kind {
        PackageKind::Executable => {
            let path = layout.src_dir().join(&config.entry);
            if !path.is_file() {
                return Err(BuildError::config(format!(
                    "entry point `{}` not found",
                    layout.relative(&path).display()
                ))
                .into());
            }
            Some(path)
        }
        PackageKind::Library => None,
    };

    let exclusions = Exclusions {
        common_source: &config.common_source,
        entry: entry.as_ref().map(|_| config.entry.as_str()),
    };
    let sources = discover_sources(layout, profile, &exclusions)?;

    let common_source = layout.src_dir().join(&config.common_source);
    let header_file = if profile.is_windows() {
        if !common_source.is_file() {
            return Err(BuildError::config(format!(
                "precompiled header source `{}` not found",
                layout.relative(&common_source).display()
            ))
            .into());
        }
        PathBuf::new()
    } else {
        include_dirs
            .iter()
            .map(|dir| dir.join(&config.pch_header))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                BuildError::config(format!(
                    "precompiled header `{}` not found on the include path",
                    config.pch_header.display()
                ))
            })?
    };

    let pch_output = if profile.is_windows() {
        layout.pch_dir().join(format!("{}.pch", config.name))
    } else {
        let mut out: OsString = layout.pch_dir().join(&config.pch_header).into_os_string();
        out.push(".gch");
        PathBuf::from(out)
    };

    let pch = PchInputs {
        header: config.pch_header.clone(),
        header_file,
        common_object: object_path(ctx, &common_source),
        common_source,
        output: pch_output,
        output_dir: layout.pch_dir(),
        include_dirs: include_dirs.clone(),
        defines: defines.clone(),
    };

    let inputs = ResolvedInputs {
        name: config.name.clone(),
        defines,
        libraries,
        frameworks: config.frameworks.clone(),
        include_dirs,
        lib_dirs,
        sources,
        pch,
        entry,
    };
    check_unique_outputs(ctx, &inputs)?;
    Ok(inputs)
}

/// Two sources mapping to one object (`a.c` and `a.cpp`) would make two
/// nodes with the same name.
fn check_unique_outputs(ctx: &BuildContext, inputs: &ResolvedInputs) -> Result<()> {
    let layout = &ctx.layout;
    let mut seen = HashSet::new();

    let mut outputs: Vec<(PathBuf, &Path)> = inputs
        .sources
        .library_sources
        .iter()
        .map(|src| (object_path(ctx, src), src.as_path()))
        .collect();
    if ctx.profile.is_windows() {
        outputs.push((inputs.pch.common_object.clone(), &inputs.pch.common_source));
    }
    if let Some(entry) = &inputs.entry {
        outputs.push((object_path(ctx, entry), entry.as_path()));
    }
    for src in &inputs.sources.test_sources {
        outputs.push((test_object_path(ctx, src), src.as_path()));
    }

    for (output, source) in outputs {
        if !seen.insert(output.clone()) {
            return Err(BuildError::config(format!(
                "`{}` maps to object `{}`, which another source already produces",
                layout.relative(source).display(),
                layout.relative(&output).display()
            ))
            .into());
        }
    }
    Ok(())
}

fn object_path(ctx: &BuildContext, source: &Path) -> PathBuf {
    mirror_path(
        source,
        &ctx.layout.src_dir(),
        &ctx.layout.build_src_dir(),
        ctx.profile.object_extension(),
    )
}

fn test_object_path(ctx: &BuildContext, source: &Path) -> PathBuf {
    mirror_path(
        source,
        &ctx.layout.test_dir(),
        &ctx.layout.build_test_dir(),
        ctx.profile.object_extension(),
    )
}

fn is_cxx(source: &Path) -> bool {
    source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| CXX_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn wire(engine: &mut dyn TaskGraphEngine, ctx: &BuildContext, inputs: &ResolvedInputs) -> PlanNodes {
    let layout = &ctx.layout;
    let profile = &ctx.profile;

    // Precompiled header
    let pch_name = if profile.is_windows() {
        node_name(layout, &inputs.pch.common_object)
    } else {
        node_name(layout, &inputs.pch.output)
    };
    let rule = build_pch(engine, profile, &pch_name, &inputs.pch);

    let compile_step = |source: &Path, output: PathBuf, rule: &PchRule| {
        let mut step = CompileStep {
            source: source.to_path_buf(),
            output,
            include_dirs: inputs.include_dirs.clone(),
            defines: inputs.defines.clone(),
            cxxflags: profile.cxxflags.clone(),
        };
        if is_cxx(source) {
            rule.apply(&mut step);
        }
        step
    };

    // Library translation units
    let mut compiles = Vec::new();
    let mut objects = Vec::new();
    for source in &inputs.sources.library_sources {
        let output = object_path(ctx, source);
        let node = engine.declare_artifact(
            &node_name(layout, &output),
            Action::Compile(compile_step(source, output.clone(), &rule)),
        );
        engine.declare_dependency(node, rule.node);
        compiles.push(node);
        objects.push(output);
    }

    // Library artifact
    let library_output = layout
        .lib_dir()
        .join(profile.library_filename(&inputs.name));
    let library_action = if profile.is_windows() {
        let mut all = objects.clone();
        all.extend(rule.link_objects.iter().cloned());
        Action::Archive(ArchiveStep {
            objects: all,
            output: library_output.clone(),
        })
    } else {
        Action::Link(LinkStep {
            kind: LinkKind::SharedLib,
            objects: objects.clone(),
            output: library_output.clone(),
            lib_dirs: inputs.lib_dirs.clone(),
            libs: inputs.libraries.clone(),
            frameworks: inputs.frameworks.clone(),
            ldflags: profile.linkflags.clone(),
        })
    };
    let library = engine.declare_artifact(&node_name(layout, &library_output), library_action);
    engine.declare_dependency(library, rule.node);
    for &compile in &compiles {
        engine.declare_dependency(library, compile);
    }
    engine.declare_alias(LIB_TARGET, library);
    engine.declare_default(library);

    // Programs link the library by path, plus the common object on Windows
    let program_link = |objects: Vec<PathBuf>, output: PathBuf| {
        let mut all = objects;
        all.push(library_output.clone());
        all.extend(rule.link_objects.iter().cloned());

        let mut ldflags = profile.linkflags.clone();
        if !profile.is_windows() {
            ldflags.push(format!("-Wl,-rpath,{}", layout.lib_dir().display()));
        }

        LinkStep {
            kind: LinkKind::Executable,
            objects: all,
            output,
            lib_dirs: inputs.lib_dirs.clone(),
            libs: inputs.libraries.clone(),
            frameworks: inputs.frameworks.clone(),
            ldflags,
        }
    };

    // Executable
    let executable = inputs.entry.as_ref().map(|entry| {
        let object = object_path(ctx, entry);
        let compile = engine.declare_artifact(
            &node_name(layout, &object),
            Action::Compile(compile_step(entry, object.clone(), &rule)),
        );
        engine.declare_dependency(compile, rule.node);

        let output = layout.bin_dir().join(profile.executable_filename(&inputs.name));
        let link = engine.declare_artifact(
            &node_name(layout, &output),
            Action::Link(program_link(vec![object], output.clone())),
        );
        engine.declare_dependency(link, compile);
        engine.declare_dependency(link, library);
        engine.declare_alias(BIN_TARGET, link);
        engine.declare_default(link);
        link
    });

    // Test programs
    let run_tests = engine.is_target_requested(CHECK_TARGET);
    let mut tests = Vec::new();
    for source in &inputs.sources.test_sources {
        let name = SourceSet::test_name(layout, source);
        let object = test_object_path(ctx, source);
        let output = layout
            .test_bin_dir()
            .join(profile.executable_filename(&name));

        let build = engine.declare_artifact(
            &node_name(layout, &output),
            Action::BuildTest(TestBuildStep {
                name: name.clone(),
                compile: compile_step(source, object.clone(), &rule),
                link: program_link(vec![object], output.clone()),
            }),
        );
        engine.declare_dependency(build, library);
        engine.declare_dependency(build, rule.node);

        let run = run_tests.then(|| {
            let run = engine.declare_artifact(
                &format!("test:{}", name),
                Action::RunTest(RunTestStep {
                    name: name.clone(),
                    executable: output.clone(),
                }),
            );
            engine.declare_dependency(run, build);
            run
        });

        tests.push(TestNodes { name, build, run });
    }

    // Aggregate
    let check = run_tests.then(|| {
        let check = engine.declare_artifact(CHECK_TARGET, Action::Alias);
        for run in tests.iter().filter_map(|t| t.run) {
            engine.declare_dependency(check, run);
        }
        engine.declare_alias(CHECK_TARGET, check);
        check
    });

    PlanNodes {
        pch: rule.node,
        compiles,
        library,
        executable,
        tests,
        check,
    }
}
