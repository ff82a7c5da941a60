//! `quay update` command

use anyhow::Result;

use crate::cli::UpdateArgs;
use crate::GlobalOptions;
use quay::ops::update;
use quay::ProjectContext;

pub fn execute(_args: UpdateArgs, global: &GlobalOptions) -> Result<i32> {
    let ctx = ProjectContext::discover_from_cwd()?;
    update(&ctx, &global.shell)?;
    Ok(0)
}
