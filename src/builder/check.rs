//! Test runner and aggregation.
//!
//! A test is a standalone program; it passes when it exits with code 0.
//! A failing test is recorded, never raised. Only a test that cannot be
//! launched at all is an error.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;
use crate::util::environment::CapturedEnv;
use crate::util::process::{exit_code, ProcessBuilder};

/// Outcome of one test program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub exit_code: i32,
    /// Captured stdout and stderr
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl TestResult {
    pub fn new(name: impl Into<String>, exit_code: i32) -> Self {
        TestResult {
            name: name.into(),
            exit_code,
            output: String::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a test program in `cwd` with the captured environment.
pub fn run_test(
    name: &str,
    executable: &Path,
    env: &CapturedEnv,
    cwd: &Path,
) -> Result<TestResult, BuildError> {
    tracing::debug!("running test `{}`: {}", name, executable.display());

    let output = ProcessBuilder::new(executable)
        .env(env)
        .cwd(cwd)
        .exec()?;

    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(TestResult {
        name: name.to_string(),
        exit_code: exit_code(output.status),
        output: captured,
    })
}

/// Check if every test passed; no tests pass vacuously.
pub fn aggregate(results: &[TestResult]) -> bool {
    results.iter().all(TestResult::passed)
}

/// Results of a `check` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub results: Vec<TestResult>,
    /// Tests that could not be built or launched
    pub not_run: Vec<String>,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn record_not_run(&mut self, name: impl Into<String>) {
        self.not_run.push(name.into());
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// Get the names of failed tests.
    pub fn failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Pass iff every test ran and passed.
    pub fn success(&self) -> bool {
        self.not_run.is_empty() && aggregate(&self.results)
    }

    /// Render the human-readable summary.
    pub fn render(&self) -> String {
        let mut results = self.results.clone();
        results.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = String::new();
        for result in &results {
            if result.passed() {
                let _ = writeln!(out, "test {} ... ok", result.name);
            } else {
                let _ = writeln!(
                    out,
                    "test {} ... FAILED (exit code {})",
                    result.name, result.exit_code
                );
            }
        }
        for name in &self.not_run {
            let _ = writeln!(out, "test {} ... not run", name);
        }

        let failures: Vec<&TestResult> = results.iter().filter(|r| !r.passed()).collect();
        if !failures.is_empty() {
            out.push_str("\nfailures:\n");
            for failure in &failures {
                let _ = writeln!(out, "\n---- {} ----", failure.name);
                if !failure.output.is_empty() {
                    out.push_str(failure.output.trim_end());
                    out.push('\n');
                }
            }
        }

        let _ = write!(
            out,
            "\ntest result: {}. {} passed; {} failed",
            if self.success() { "ok" } else { "FAILED" },
            self.passed_count(),
            self.failed_count()
        );
        if !self.not_run.is_empty() {
            let _ = write!(out, "; {} not run", self.not_run.len());
        }
        out.push('\n');
        out
    }
}
