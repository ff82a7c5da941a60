//! `quay diff` command

use anyhow::Result;

use crate::cli::{DiffArgs, DiffFormat};
use crate::commands::emit_output;
use crate::GlobalOptions;
use quay::diff::{diff_with, refspec, DiffReport};
use quay::ProjectContext;

pub fn execute(args: DiffArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let from = refspec::resolve(&ctx, &args.from)?;
    let to = refspec::resolve(&ctx, &args.to)?;

    let changes = diff_with(&from, &to, |pkg| pkg.declared_license(&ctx));
    let report = DiffReport::new(args.from.clone(), args.to.clone(), changes);

    let rendered = match args.format {
        DiffFormat::Terminal => report.render_terminal(args.unchanged),
        DiffFormat::Json => report.to_json()?,
        DiffFormat::Markdown => report.render_markdown(),
    };
    emit_output(shell, &rendered, args.output.as_deref())?;

    Ok(0)
}
