//! Graph executor with progress reporting.
//!
//! Runs the requested goals and their ancestors. Nodes whose prerequisites
//! have all completed run together in a wave on a rayon pool bounded by the
//! job count. A failed node skips its dependents; unrelated branches keep
//! going. Alias nodes never run an action: they fail when any prerequisite
//! did not succeed.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::builder::check::{CheckReport, TestResult};
use crate::builder::errors::BuildError;
use crate::builder::graph::{Action, Node, NodeId, TaskGraph};

/// Performs the action of a single node.
pub trait ActionRunner: Sync {
    /// Run `node`. Test executions return their result; everything else
    /// returns `None` on success.
    fn run(&self, node: &Node) -> Result<Option<TestResult>, BuildError>;
}

/// Final state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum NodeStatus {
    Succeeded,
    Failed { message: String },
    Skipped { cause: String },
}

impl NodeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NodeStatus::Succeeded)
    }
}

/// Outcome of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub name: String,
    pub kind: String,
    #[serde(flatten)]
    pub status: NodeStatus,
}

/// Outcome of an execution.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Goals, by name
    pub goals: Vec<String>,
    /// Every node that was considered, in completion order
    pub outcomes: Vec<NodeOutcome>,
    /// Test results
    pub check: CheckReport,
    pub elapsed: Duration,
}

impl BuildReport {
    /// Get the outcome of a node.
    pub fn outcome(&self, name: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Pass iff every goal succeeded.
    pub fn success(&self) -> bool {
        self.goals.iter().all(|goal| {
            self.outcome(goal)
                .map(|o| o.status.is_success())
                .unwrap_or(false)
        })
    }

    /// Get the nodes that failed on their own.
    pub fn failures(&self) -> Vec<&NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Failed { .. }))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&NodeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Graph executor.
pub struct Executor<'a> {
    runner: &'a dyn ActionRunner,
    jobs: usize,
    progress: bool,
}

impl<'a> Executor<'a> {
    /// Create an executor using all available cores.
    pub fn new(runner: &'a dyn ActionRunner) -> Self {
        Executor {
            runner,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            progress: false,
        }
    }

    /// Bound the number of concurrently running nodes.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        if let Some(j) = jobs {
            self.jobs = j.max(1);
        }
        self
    }

    /// Show a progress bar.
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Execute the requested goals of `graph`.
    pub fn execute(&self, graph: &TaskGraph) -> Result<BuildReport> {
        let start = Instant::now();
        let goals = graph.goals()?;
        graph.topological_order()?;

        let mut selected: HashSet<NodeId> = goals.iter().copied().collect();
        for &goal in &goals {
            selected.extend(graph.ancestors(goal));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .context("failed to create worker pool")?;

        let pb = self.progress_bar(selected.len());

        let mut states: HashMap<NodeId, NodeStatus> = HashMap::new();
        let mut report = BuildReport {
            goals: goals.iter().map(|&g| graph.node(g).name.clone()).collect(),
            ..Default::default()
        };

        let mut order: Vec<NodeId> = selected.iter().copied().collect();
        order.sort();

        while states.len() < selected.len() {
            let ready: Vec<NodeId> = order
                .iter()
                .copied()
                .filter(|id| !states.contains_key(id))
                .filter(|&id| graph.dependencies(id).iter().all(|d| states.contains_key(d)))
                .collect();

            if ready.is_empty() {
                // Unreachable for an acyclic graph
                return Err(BuildError::config("execution stalled on a dependency cycle").into());
            }

            let mut runnable = Vec::new();
            for id in ready {
                let node = graph.node(id);
                let blocked: Vec<&str> = graph
                    .dependencies(id)
                    .into_iter()
                    .filter(|d| !states[d].is_success())
                    .map(|d| graph.node(d).name.as_str())
                    .collect();

                let status = match (&node.action, blocked.is_empty()) {
                    (Action::Alias, true) => Some(NodeStatus::Succeeded),
                    (Action::Alias, false) => Some(NodeStatus::Failed {
                        message: format!("{} prerequisite(s) did not succeed", blocked.len()),
                    }),
                    (_, false) => Some(NodeStatus::Skipped {
                        cause: blocked.join(", "),
                    }),
                    (_, true) => None,
                };

                match status {
                    Some(status) => {
                        self.finish(graph, id, status, None, &mut states, &mut report, &pb)
                    }
                    None => runnable.push(id),
                }
            }

            let results: Vec<(NodeId, Result<Option<TestResult>, BuildError>)> =
                pool.install(|| {
                    runnable
                        .par_iter()
                        .map(|&id| {
                            let node = graph.node(id);
                            pb.set_message(node.name.clone());
                            tracing::debug!("running `{}` ({})", node.name, node.action.kind());
                            (id, self.runner.run(node))
                        })
                        .collect()
                });

            for (id, result) in results {
                let (status, test) = match result {
                    Ok(Some(test)) if !test.passed() => (
                        NodeStatus::Failed {
                            message: format!("test exited with code {}", test.exit_code),
                        },
                        Some(test),
                    ),
                    Ok(test) => (NodeStatus::Succeeded, test),
                    Err(e) => (
                        NodeStatus::Failed {
                            message: format!("{}", e),
                        },
                        None,
                    ),
                };
                self.finish(graph, id, status, test, &mut states, &mut report, &pb);
            }
        }

        pb.finish_and_clear();
        report.elapsed = start.elapsed();
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        graph: &TaskGraph,
        id: NodeId,
        status: NodeStatus,
        test: Option<TestResult>,
        states: &mut HashMap<NodeId, NodeStatus>,
        report: &mut BuildReport,
        pb: &ProgressBar,
    ) {
        let node = graph.node(id);

        match &status {
            NodeStatus::Succeeded => tracing::debug!("finished `{}`", node.name),
            NodeStatus::Failed { message } => {
                tracing::debug!("`{}` failed: {}", node.name, message)
            }
            NodeStatus::Skipped { cause } => {
                tracing::debug!("skipped `{}` (blocked by {})", node.name, cause)
            }
        }

        if let Action::RunTest(step) = &node.action {
            match test {
                Some(result) => report.check.record(result),
                None if !status.is_success() => report.check.record_not_run(&step.name),
                None => {}
            }
        }

        report.outcomes.push(NodeOutcome {
            name: node.name.clone(),
            kind: node.action.kind().to_string(),
            status: status.clone(),
        });
        states.insert(id, status);
        pb.inc(1);
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.progress || total <= 1 {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
