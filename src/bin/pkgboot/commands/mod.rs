//! Command implementations

pub mod build;
pub mod check;
pub mod plan;

use anyhow::{bail, Result};

use pkgboot::builder::executor::NodeStatus;
use pkgboot::builder::plan::CHECK_TARGET;
use pkgboot::builder::BuildReport;
use pkgboot::ops::BuildOptions;

/// Print the outcome of a build and fail when a goal failed.
pub fn finish(report: &BuildReport, opts: &BuildOptions) -> Result<()> {
    let ran_check = opts.targets.iter().any(|t| t == CHECK_TARGET);

    if !opts.json {
        for outcome in report.failures() {
            if let NodeStatus::Failed { message } = &outcome.status {
                if outcome.kind != "run-test" && outcome.kind != "alias" {
                    eprintln!("error: `{}` failed: {}", outcome.name, message.trim_end());
                }
            }
        }

        if ran_check {
            println!();
            print!("{}", report.check.render());
        }
    }

    if report.success() {
        if !opts.json {
            eprintln!(
                "    Finished in {:.2}s",
                report.elapsed.as_secs_f64()
            );
        }
        return Ok(());
    }

    if ran_check && !report.check.success() && report.check.not_run.is_empty() {
        let failures = report.check.failures();
        bail!(
            "{} test(s) failed: {}",
            failures.len(),
            failures.join(", ")
        );
    }

    let failed: Vec<&str> = report
        .failures()
        .into_iter()
        .filter(|o| o.kind != "alias")
        .map(|o| o.name.as_str())
        .collect();
    bail!("build failed: {}", failed.join(", "))
}
