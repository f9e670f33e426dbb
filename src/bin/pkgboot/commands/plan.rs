//! `pkgboot plan` command

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, PlanArgs};
use pkgboot::ops::plan;

pub fn execute(global: &GlobalArgs, args: PlanArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let mut opts = global.build_options(Vec::new());
    if args.check {
        opts = opts.check();
    }

    let description = plan(&cwd, &opts)?;
    let json =
        serde_json::to_string_pretty(&description).context("failed to serialize the plan")?;
    println!("{}", json);
    Ok(())
}
