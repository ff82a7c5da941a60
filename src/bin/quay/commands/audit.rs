//! `quay audit` command

use anyhow::Result;

use crate::cli::{AuditArgs, OutputFormat};
use crate::commands::emit_output;
use crate::GlobalOptions;
use quay::audit::report::AuditReport;
use quay::audit::{ignore, scanner};
use quay::core::lockfile::Lockfile;
use quay::util::Status;
use quay::ProjectContext;

pub fn execute(args: AuditArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let lockfile = Lockfile::load(&ctx.lockfile_path())?;
    let packages = lockfile.to_packages()?;

    shell.status(Status::Auditing, format!("{} package(s)", packages.len()));

    let results = scanner::scan_packages(
        &ctx,
        &packages,
        scanner::ScanOptions {
            offline: global.offline,
            update_db: args.update_db,
        },
        shell,
    )?;

    let ignores = ignore::load(&ctx, args.ignore_file.as_deref())?;
    let report = AuditReport::build(&results, &ignores, args.min_severity, args.fail_above);

    let rendered = match args.format {
        OutputFormat::Terminal => report.render_terminal(),
        OutputFormat::Json => report.to_json()?,
    };
    emit_output(shell, &rendered, args.output.as_deref())?;

    Ok(report.exit_code())
}
