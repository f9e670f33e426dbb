//! Build planning and execution.
//!
//! The plan assembler turns a package configuration into a task graph
//! (precompiled header, library, executable, tests, `check`). The executor
//! runs the requested part of that graph with a toolchain.

pub mod check;
pub mod context;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod executor;
pub mod graph;
pub mod native;
pub mod pch;
pub mod plan;
pub mod toolchain;

pub use check::{CheckReport, TestResult};
pub use context::{BuildContext, BuildMode};
pub use errors::BuildError;
pub use events::BuildEvent;
pub use executor::{ActionRunner, BuildReport, Executor};
pub use graph::{Action, TaskGraph, TaskGraphEngine};
pub use native::ToolchainRunner;
pub use plan::{assemble, BuildPlan};
pub use toolchain::{detect_toolchain, CommandSpec, GccToolchain, MsvcToolchain, Toolchain};
