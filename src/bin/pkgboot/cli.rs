//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use pkgboot::builder::BuildMode;
use pkgboot::ops::BuildOptions;

/// pkgboot - build configuration for small C/C++ packages
#[derive(Parser)]
#[command(name = "pkgboot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Build mode (debug or release)
    #[arg(long, global = true)]
    pub mode: Option<BuildMode>,

    /// Number of parallel jobs
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Platform identifier to configure for (defaults to the host)
    #[arg(long, global = true, env = "PKGBOOT_PLATFORM")]
    pub platform: Option<String>,

    /// Output format for build messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,
}

impl GlobalArgs {
    pub fn build_options(&self, targets: Vec<String>) -> BuildOptions {
        BuildOptions {
            targets,
            mode: self.mode,
            jobs: self.jobs,
            platform: self.platform.clone(),
            progress: self.message_format == MessageFormat::Human,
            json: self.message_format == MessageFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the current package
    Build(BuildArgs),

    /// Build the package and its tests, then run every test
    Check,

    /// Print the task graph as JSON without building
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Targets to build: `lib`, `bin`, `check` or a node name
    /// (defaults to the library and executable)
    pub targets: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Include the test nodes and the `check` target
    #[arg(long)]
    pub check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    // =========================================================================
    // Global Options Tests
    // =========================================================================

    #[test]
    fn test_global_defaults() {
        let cli = parse(&["pkgboot", "build"]);
        assert!(!cli.global.verbose);
        assert!(cli.global.mode.is_none());
        assert!(cli.global.jobs.is_none());
        assert_eq!(cli.global.message_format, MessageFormat::Human);

        let opts = cli.global.build_options(Vec::new());
        assert!(opts.progress);
        assert!(!opts.json);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&[
            "pkgboot",
            "check",
            "--mode",
            "release",
            "-j",
            "4",
            "--message-format",
            "json",
        ]);
        assert!(matches!(cli.command, Commands::Check));
        assert_eq!(cli.global.mode, Some(BuildMode::Release));
        assert_eq!(cli.global.jobs, Some(4));

        let opts = cli.global.build_options(Vec::new());
        assert!(opts.json);
        assert!(!opts.progress);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(Cli::try_parse_from(["pkgboot", "build", "--mode", "fast"]).is_err());
    }

    // =========================================================================
    // Subcommand Tests
    // =========================================================================

    #[test]
    fn test_build_targets() {
        let cli = parse(&["pkgboot", "build", "lib", "check"]);
        match cli.command {
            Commands::Build(args) => assert_eq!(args.targets, vec!["lib", "check"]),
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_plan_check_flag() {
        let cli = parse(&["pkgboot", "plan", "--check"]);
        match cli.command {
            Commands::Plan(args) => assert!(args.check),
            _ => panic!("expected plan"),
        }
    }
}
