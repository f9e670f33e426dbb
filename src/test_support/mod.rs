//! Test utilities and mocks for pkgboot unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use pkgboot::test_support::{fixtures::Fixture, ScriptedRunner};
//!
//! let fixture = Fixture::library("demo").source("a.cpp").test("t.cpp", 1).create();
//! let runner = ScriptedRunner::new().with_test_exit("t", 1);
//! ```

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::builder::check::TestResult;
use crate::builder::errors::BuildError;
use crate::builder::executor::ActionRunner;
use crate::builder::graph::{Action, Node};

/// Action runner that performs no work.
///
/// Every node succeeds unless it was named in [`with_failure`], and every
/// test exits 0 unless given a code with [`with_test_exit`]. Calls are
/// recorded in the order they started.
///
/// [`with_failure`]: ScriptedRunner::with_failure
/// [`with_test_exit`]: ScriptedRunner::with_test_exit
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    failures: HashSet<String>,
    test_exits: HashMap<String, i32>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named node fail.
    pub fn with_failure(mut self, node: &str) -> Self {
        self.failures.insert(node.to_string());
        self
    }

    /// Make the named test exit with `code`.
    pub fn with_test_exit(mut self, test: &str, code: i32) -> Self {
        self.test_exits.insert(test.to_string(), code);
        self
    }

    /// Get the nodes run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ActionRunner for ScriptedRunner {
    fn run(&self, node: &Node) -> Result<Option<TestResult>, BuildError> {
        self.calls.lock().unwrap().push(node.name.clone());

        if self.failures.contains(&node.name) {
            return Err(BuildError::step_failed(&node.name, "scripted failure"));
        }

        match &node.action {
            Action::RunTest(step) => {
                let code = self.test_exits.get(&step.name).copied().unwrap_or(0);
                Ok(Some(TestResult::new(&step.name, code)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::graph::RunTestStep;
    use std::path::PathBuf;

    #[test]
    fn test_scripted_runner() {
        let runner = ScriptedRunner::new()
            .with_failure("a.o")
            .with_test_exit("t", 3);

        let compile = Node {
            name: "a.o".to_string(),
            action: Action::Alias,
        };
        assert!(runner.run(&compile).is_err());

        let test = Node {
            name: "test:t".to_string(),
            action: Action::RunTest(RunTestStep {
                name: "t".to_string(),
                executable: PathBuf::from("bin/test/t"),
            }),
        };
        assert_eq!(runner.run(&test).unwrap().unwrap().exit_code, 3);
        assert_eq!(runner.calls(), vec!["a.o", "test:t"]);
    }
}
