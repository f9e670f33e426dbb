//! Native C/C++ action runner.
//!
//! Turns graph actions into toolchain commands and runs them in the package
//! root with the captured environment.

use std::path::{Path, PathBuf};

use crate::builder::check::{run_test, TestResult};
use crate::builder::context::BuildContext;
use crate::builder::errors::BuildError;
use crate::builder::executor::ActionRunner;
use crate::builder::graph::{Action, Node};
use crate::builder::toolchain::{CommandSpec, Toolchain};
use crate::util::environment::CapturedEnv;
use crate::util::fs::ensure_dir;

/// Runs actions with a real toolchain.
pub struct ToolchainRunner {
    toolchain: Box<dyn Toolchain>,
    env: CapturedEnv,
    root: PathBuf,
}

impl ToolchainRunner {
    pub fn new(ctx: &BuildContext, toolchain: Box<dyn Toolchain>) -> Self {
        ToolchainRunner {
            toolchain,
            env: ctx.env.clone(),
            root: ctx.root().to_path_buf(),
        }
    }

    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    /// Get the commands `action` runs, in order.
    pub fn commands(&self, action: &Action) -> Vec<CommandSpec> {
        let tc = self.toolchain.as_ref();
        match action {
            Action::CompilePch(step) => vec![tc.pch_command(step)],
            Action::Compile(step) => vec![tc.compile_command(step)],
            Action::Archive(step) => vec![tc.archive_command(step)],
            Action::Link(step) => vec![tc.link_command(step)],
            Action::BuildTest(step) => vec![
                tc.compile_command(&step.compile),
                tc.link_command(&step.link),
            ],
            Action::RunTest(_) | Action::Alias => Vec::new(),
        }
    }

    fn prepare_outputs(&self, node: &Node) -> Result<(), BuildError> {
        for output in node.action.outputs() {
            if let Some(parent) = output.parent() {
                ensure_dir(parent)
                    .map_err(|e| BuildError::step_failed(&node.name, format!("{:#}", e)))?;
            }
        }

        match &node.action {
            // `ar` appends to an existing archive
            Action::Archive(step) => remove_stale(&step.output)
                .map_err(|e| BuildError::step_failed(&node.name, e.to_string()))?,
            Action::CompilePch(step) => {
                std::fs::copy(&step.header, &step.staged_header).map_err(|e| {
                    BuildError::step_failed(
                        &node.name,
                        format!("failed to copy `{}`: {}", step.header.display(), e),
                    )
                })?;
            }
            _ => {}
        }

        Ok(())
    }
}

fn remove_stale(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl ActionRunner for ToolchainRunner {
    fn run(&self, node: &Node) -> Result<Option<TestResult>, BuildError> {
        if let Action::RunTest(step) = &node.action {
            return run_test(&step.name, &step.executable, &self.env, &self.root).map(Some);
        }

        self.prepare_outputs(node)?;
        for command in self.commands(&node.action) {
            let process = command.to_process(&self.env, &self.root);
            tracing::debug!("{}", process.display_command());
            process.exec_for(&node.name)?;
        }

        Ok(None)
    }
}
