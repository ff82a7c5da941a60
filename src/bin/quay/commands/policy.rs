//! `quay policy` subcommands

use anyhow::Result;

use crate::cli::{OutputFormat, PolicyArgs, PolicyCheckArgs, PolicyCommands, PolicyInitArgs};
use crate::commands::emit_output;
use crate::GlobalOptions;
use quay::core::lockfile::Lockfile;
use quay::policy::config::POLICY_TEMPLATE;
use quay::policy::{evaluate, PolicyConfig};
use quay::util::Status;
use quay::ProjectContext;

pub fn execute(args: PolicyArgs, global: &GlobalOptions) -> Result<i32> {
    match args.command {
        PolicyCommands::Check(args) => check(args, global),
        PolicyCommands::Init(args) => init(args, global),
        PolicyCommands::Show => show(global),
    }
}

fn check(args: PolicyCheckArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let Some(config) = PolicyConfig::load(&ctx)? else {
        shell.status(
            Status::Info,
            "no policy file found; run `quay policy init` to create one",
        );
        return Ok(0);
    };

    let lockfile = Lockfile::load(&ctx.lockfile_path())?;
    let packages = lockfile.to_packages()?;

    shell.status(Status::Checking, format!("{} package(s)", packages.len()));
    let report = evaluate(&ctx, &config, &packages)?;

    let rendered = match args.format {
        OutputFormat::Terminal => report.render_terminal(),
        OutputFormat::Json => report.to_json()?,
    };
    emit_output(shell, &rendered, args.output.as_deref())?;

    Ok(report.exit_code(args.strict))
}

fn init(args: PolicyInitArgs, global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let path = ctx.policy_path();
    if path.exists() && !args.force {
        anyhow::bail!(
            "policy file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    quay::util::fs::write_atomic_string(&path, POLICY_TEMPLATE)?;
    shell.status(Status::Generated, path.display().to_string());
    Ok(0)
}

fn show(global: &GlobalOptions) -> Result<i32> {
    let shell = &global.shell;
    let ctx = ProjectContext::discover_from_cwd()?;

    let Some(config) = PolicyConfig::load(&ctx)? else {
        shell.status(Status::Info, "no policy file found");
        return Ok(0);
    };

    let rules = &config.rules;
    let mut out = format!("policy version {}\n", config.version);
    out.push_str(&format!(
        "  allowed hosts: {}\n",
        if rules.sources.allowed_hosts.is_empty() {
            "any".to_string()
        } else {
            rules.sources.allowed_hosts.join(", ")
        }
    ));
    for (host, orgs) in &rules.sources.allowed_orgs {
        out.push_str(&format!("  allowed orgs on {}: {}\n", host, orgs.join(", ")));
    }
    out.push_str(&format!(
        "  path dependencies: {}\n",
        if rules.sources.deny_path_dependencies {
            "denied"
        } else {
            "allowed"
        }
    ));
    out.push_str(&format!(
        "  blocked packages: {}\n",
        rules.dependencies.blocked.len()
    ));
    out.push_str(&format!(
        "  minimum versions: {}\n",
        rules.dependencies.minimum_versions.len()
    ));
    out.push_str(&format!(
        "  security: require_license={} require_checksum={} block_postinstall={} audit_postinstall={}\n",
        rules.security.require_license,
        rules.security.require_checksum,
        rules.security.block_postinstall,
        rules.security.audit_postinstall
    ));
    out.push_str(&format!("  custom rules: {}\n", rules.custom.len()));
    if rules.freshness.is_some() {
        out.push_str("  freshness: configured (not enforced)\n");
    }

    shell.print(out.trim_end());
    Ok(0)
}
