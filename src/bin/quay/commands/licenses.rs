//! `quay licenses` command

use anyhow::Result;

use crate::cli::{LicensesArgs, OutputFormat};
use crate::commands::emit_output;
use crate::GlobalOptions;
use quay::core::lockfile::Lockfile;
use quay::core::manifest::Manifest;
use quay::licenses::policy::{LicensePolicy, LicenseReport, PackageLicense};
use quay::util::Status;
use quay::ProjectContext;

pub fn execute(args: LicensesArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let manifest = Manifest::load(&ctx.manifest_path())?;
    let lockfile = Lockfile::load(&ctx.lockfile_path())?;
    let packages = lockfile.to_packages()?;

    shell.status(Status::Scanning, format!("{} package(s)", packages.len()));

    let policy = LicensePolicy::load(&ctx)?;
    let report = LicenseReport::build(&ctx, &manifest, &packages, policy.as_ref(), !args.no_detect);

    let rendered = match args.format {
        OutputFormat::Terminal => render_terminal(&report),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };
    emit_output(shell, &rendered, args.output.as_deref())?;

    if args.check {
        report.check()?;
    }

    Ok(0)
}

fn render_terminal(report: &LicenseReport) -> String {
    let mut out = format!(
        "{} v{} ({})\n\n",
        report.root_name,
        report.root_version,
        report.root_license.as_deref().unwrap_or("no license")
    );

    for dep in &report.dependencies {
        out.push_str(&describe(dep));
        out.push('\n');
    }

    let s = &report.summary;
    out.push_str(&format!(
        "\n{} package(s): {} allowed, {} denied, {} unlicensed, {} unknown, {} overridden",
        s.total, s.allowed, s.denied, s.unlicensed, s.unknown, s.overridden
    ));
    if !report.policy_used {
        out.push_str(" (no license policy; reporting only)");
    }
    out.push('\n');
    out
}

fn describe(dep: &PackageLicense) -> String {
    let license = dep.license.as_deref().unwrap_or("none");
    let mut line = format!(
        "  {:<30} {:<24} {:?}",
        format!("{} v{}", dep.name, dep.version),
        license,
        dep.verdict
    );
    if let Some(reason) = &dep.reason {
        line.push_str(&format!(" ({})", reason));
    }
    if !dep.spdx_valid && dep.license.is_some() {
        line.push_str(" [not valid SPDX]");
    }
    line
}
