//! Build error types and diagnostics.
//!
//! Configuration-time errors abort before any node runs. Per-node failures
//! are recorded by the executor and only skip the failing node's dependents.
//! A failing test is not an error at all: it is a [`TestResult`] with a
//! non-zero exit code.
//!
//! [`TestResult`]: crate::builder::check::TestResult

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while configuring or executing a package build.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// Malformed or missing package input.
    #[error("invalid package configuration: {message}")]
    #[diagnostic(
        code(pkgboot::config),
        help("Check Pkgboot.toml and the src/ and test/ layout")
    )]
    Configuration { message: String },

    /// The host platform identifier is not recognized.
    #[error("unsupported platform `{platform}`")]
    #[diagnostic(
        code(pkgboot::platform),
        help("Set `build.platform-policy = \"fallback\"` to treat it as unix-like")
    )]
    UnsupportedPlatform { platform: String },

    /// A compiler, linker or PCH invocation failed.
    #[error("build step `{node}` failed\n{message}")]
    #[diagnostic(code(pkgboot::step_failed))]
    BuildStepFailed { node: String, message: String },

    /// A compiler or test executable could not be spawned at all.
    #[error("failed to launch `{}`", program.display())]
    #[diagnostic(
        code(pkgboot::launch),
        help("Make sure the program exists and is executable")
    )]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        BuildError::Configuration {
            message: message.into(),
        }
    }

    /// Create a failed-step error for the named node.
    pub fn step_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::BuildStepFailed {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Whether this error is raised before the graph executes.
    pub fn is_configuration_time(&self) -> bool {
        matches!(
            self,
            BuildError::Configuration { .. } | BuildError::UnsupportedPlatform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message() {
        let err = BuildError::config("common source `src/Common.cpp` not found");
        assert_eq!(
            err.to_string(),
            "invalid package configuration: common source `src/Common.cpp` not found"
        );
        assert!(err.is_configuration_time());
    }

    #[test]
    fn test_step_failed_is_not_configuration_time() {
        let err = BuildError::step_failed("build/src/a.o", "exit code 1");
        assert!(err.to_string().contains("build/src/a.o"));
        assert!(!err.is_configuration_time());
    }

    #[test]
    fn test_launch_error_names_program() {
        let err = BuildError::ProcessLaunch {
            program: PathBuf::from("bin/test/missing"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("bin/test/missing"));
    }
}
