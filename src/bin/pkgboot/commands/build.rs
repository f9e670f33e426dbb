//! `pkgboot build` command

use anyhow::Result;

use crate::cli::{BuildArgs, GlobalArgs};
use pkgboot::ops::build;

pub fn execute(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let opts = global.build_options(args.targets);

    let report = build(&cwd, &opts)?;
    super::finish(&report, &opts)
}
