//! Implementation of `pkgboot build`, `pkgboot check` and `pkgboot plan`.

use std::path::Path;

use anyhow::Result;

use crate::builder::context::{BuildContext, BuildMode};
use crate::builder::events::BuildEvent;
use crate::builder::executor::{BuildReport, Executor};
use crate::builder::graph::GraphDescription;
use crate::builder::native::ToolchainRunner;
use crate::builder::plan::{assemble, BuildPlan, CHECK_TARGET};
use crate::builder::toolchain::detect_toolchain;
use crate::core::package::PackageConfig;
use crate::core::platform::{host_platform_id, resolve_profile};
use crate::core::workspace::Workspace;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::vcs::GitSourceControl;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Targets to build (empty = defaults)
    pub targets: Vec<String>,

    /// Build mode (None = config, then debug)
    pub mode: Option<BuildMode>,

    /// Number of parallel jobs (None = config, then one per CPU)
    pub jobs: Option<usize>,

    /// Platform identifier (None = host)
    pub platform: Option<String>,

    /// Show a progress bar
    pub progress: bool,

    /// Write JSON build events to stdout
    pub json: bool,
}

impl BuildOptions {
    /// Options for `check`: the requested targets plus `check`.
    pub fn check(mut self) -> Self {
        if !self.targets.iter().any(|t| t == CHECK_TARGET) {
            self.targets.push(CHECK_TARGET.to_string());
        }
        self
    }
}

/// A configured package, ready to execute.
#[derive(Debug)]
pub struct Configured {
    pub workspace: Workspace,
    pub config: Config,
    pub package: PackageConfig,
    pub ctx: BuildContext,
    pub plan: BuildPlan,
}

/// Configure the package containing `cwd`.
///
/// Everything that can be wrong with the inputs is reported here, before
/// any node runs.
pub fn configure(cwd: &Path, opts: &BuildOptions) -> Result<Configured> {
    let workspace = Workspace::discover(cwd)?;
    let config = load_config(
        global_config_path().as_deref(),
        &project_config_path(workspace.root()),
    );

    let platform = opts.platform.clone().unwrap_or_else(host_platform_id);
    let profile = resolve_profile(&platform, config.platform_policy())?;

    let vcs = GitSourceControl::new(workspace.root());
    let package = workspace.manifest().to_config(&vcs)?;

    let mode = opts.mode.unwrap_or_else(|| config.mode());
    let ctx = BuildContext::new(
        profile,
        workspace.layout().clone(),
        mode,
        config.toolchain_root(),
    );

    let plan = assemble(&ctx, &package, &opts.targets)?;
    plan.graph.goals()?;
    tracing::debug!(
        "planned {} nodes for {} `{}` on {} ({})",
        plan.graph.len(),
        package.kind.as_str(),
        package.name,
        ctx.platform(),
        mode
    );

    if plan.runs_tests() && plan.test_count() == 0 {
        tracing::warn!(
            "no tests found in {}",
            workspace.layout().test_dir().display()
        );
    }

    Ok(Configured {
        workspace,
        config,
        package,
        ctx,
        plan,
    })
}

/// Describe the task graph without building anything.
pub fn plan(cwd: &Path, opts: &BuildOptions) -> Result<GraphDescription> {
    let configured = configure(cwd, opts)?;
    Ok(configured.plan.describe())
}

/// Build the requested targets.
///
/// Returns the report even when nodes failed; only configuration problems
/// and a missing toolchain are errors.
pub fn build(cwd: &Path, opts: &BuildOptions) -> Result<BuildReport> {
    let configured = configure(cwd, opts)?;
    let Configured {
        workspace,
        config,
        package,
        ctx,
        plan,
    } = configured;

    workspace.ensure_output_dirs()?;

    let toolchain = detect_toolchain(&ctx.profile, &config.toolchain, &ctx.env)?;
    tracing::debug!("toolchain: {:?}", toolchain);
    let runner = ToolchainRunner::new(&ctx, toolchain);

    if opts.json {
        let goals = plan
            .graph
            .goals()?
            .into_iter()
            .map(|id| plan.graph.node(id).name.clone())
            .collect();
        println!(
            "{}",
            BuildEvent::started(&package.name, ctx.platform(), ctx.mode.as_str(), goals).to_json()
        );
    }

    let report = Executor::new(&runner)
        .jobs(opts.jobs.or(config.build.jobs))
        .progress(opts.progress && !opts.json)
        .execute(&plan.graph)?;

    if opts.json {
        for event in BuildEvent::from_report(&report) {
            println!("{}", event.to_json());
        }
    }

    Ok(report)
}
