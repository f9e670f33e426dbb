//! `pkgboot check` command

use anyhow::Result;

use crate::cli::GlobalArgs;
use pkgboot::ops::build;

pub fn execute(global: &GlobalArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let opts = global.build_options(Vec::new()).check();

    let report = build(&cwd, &opts)?;
    super::finish(&report, &opts)
}
