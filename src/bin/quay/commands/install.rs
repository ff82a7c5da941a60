//! `quay install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use crate::GlobalOptions;
use quay::ops::{install, InstallOptions};
use quay::ProjectContext;

pub fn execute(args: InstallArgs, global: &GlobalOptions) -> Result<i32> {
    let ctx = ProjectContext::discover_from_cwd()?;

    install(
        &ctx,
        &global.shell,
        InstallOptions {
            frozen: args.frozen,
            skip_verify: args.skip_verify,
        },
    )?;

    Ok(0)
}
