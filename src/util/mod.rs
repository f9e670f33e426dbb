//! Shared utilities

pub mod config;
pub mod environment;
pub mod fs;
pub mod process;
pub mod vcs;

pub use config::Config;
pub use environment::CapturedEnv;
