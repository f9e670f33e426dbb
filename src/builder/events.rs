//! Build event types for JSON output.
//!
//! With `--message-format json` every event is written to stdout as one
//! JSON object per line. The `reason` field names the event.
//!
//! # Event Types
//!
//! - `build-started`: Goals were selected and execution is starting
//! - `node-finished`: A node succeeded, failed or was skipped
//! - `test-result`: A test program exited
//! - `build-finished`: Execution completed (success or failure)

use serde::Serialize;

use crate::builder::check::TestResult;
use crate::builder::executor::{BuildReport, NodeOutcome};

/// A build event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BuildEvent {
    BuildStarted {
        /// Package name
        package: String,
        /// Platform identifier
        platform: String,
        /// Build mode ("debug" or "release")
        mode: String,
        goals: Vec<String>,
    },

    NodeFinished(NodeOutcome),

    TestResult(TestResult),

    BuildFinished {
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of nodes that ran successfully
        succeeded: usize,
        failed: usize,
        skipped: usize,
        /// Test counts, present when tests ran
        #[serde(skip_serializing_if = "Option::is_none")]
        tests_passed: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tests_failed: Option<usize>,
    },
}

impl BuildEvent {
    /// Create a build started event.
    pub fn started(
        package: impl Into<String>,
        platform: impl Into<String>,
        mode: impl Into<String>,
        goals: Vec<String>,
    ) -> Self {
        BuildEvent::BuildStarted {
            package: package.into(),
            platform: platform.into(),
            mode: mode.into(),
            goals,
        }
    }

    /// Create a build finished event summarizing `report`.
    pub fn finished(report: &BuildReport) -> Self {
        use crate::builder::executor::NodeStatus;

        let ran_tests = !report.check.results.is_empty() || !report.check.not_run.is_empty();
        BuildEvent::BuildFinished {
            success: report.success(),
            duration_ms: report.elapsed.as_millis() as u64,
            succeeded: report.count(|s| matches!(s, NodeStatus::Succeeded)),
            failed: report.count(|s| matches!(s, NodeStatus::Failed { .. })),
            skipped: report.count(|s| matches!(s, NodeStatus::Skipped { .. })),
            tests_passed: ran_tests.then(|| report.check.passed_count()),
            tests_failed: ran_tests.then(|| report.check.failed_count()),
        }
    }

    /// Every event of an execution, in order.
    pub fn from_report(report: &BuildReport) -> Vec<BuildEvent> {
        let mut events: Vec<BuildEvent> = report
            .outcomes
            .iter()
            .cloned()
            .map(BuildEvent::NodeFinished)
            .collect();
        events.extend(report.check.results.iter().cloned().map(BuildEvent::TestResult));
        events.push(BuildEvent::finished(report));
        events
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
