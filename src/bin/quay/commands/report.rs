//! `quay compliance-report` command

use anyhow::Result;

use crate::cli::ReportArgs;
use crate::GlobalOptions;
use quay::report::compose::{compose, ComposeOptions};
use quay::report::render::{render, write_report, ReportFormat};
use quay::util::Status;
use quay::ProjectContext;

pub fn execute(args: ReportArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let format: ReportFormat = args.format.parse()?;

    shell.status(Status::Checking, "composing compliance report");
    let mut report = compose(
        &ctx,
        shell,
        &ComposeOptions {
            reviewer: args.reviewer.clone(),
            offline: global.offline,
        },
    )?;

    if args.sign {
        if let Some(output) = &args.output {
            report.signature = Some(format!("{}.sig", output.display()));
        } else {
            shell.warn("--sign requires --output; skipping signature");
        }
    }

    let rendered = render(&report, format)?;
    write_report(
        &ctx,
        shell,
        &rendered,
        args.output.as_deref(),
        format,
        args.sign && args.output.is_some(),
    )?;

    Ok(0)
}
