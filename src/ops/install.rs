//! Implementation of `quay install`.
//!
//! Resolution is the solver's job; install consumes the lockfile it wrote.
//! Pipeline order is fixed: policy gate before any side effect, checksum
//! verification after sources are on disk, changelog append after the
//! lockfile write so the log reflects on-disk state.

use anyhow::{Context, Result};

use crate::audit::changelog::{self, Action, ChangeSet};
use crate::core::lockfile::Lockfile;
use crate::core::package::Package;
use crate::diff;
use crate::integrity::{self, VerifyOptions};
use crate::policy::PolicyConfig;
use crate::sources;
use crate::util::context::ProjectContext;
use crate::util::diagnostic::PolicyBlockedError;
use crate::util::{Shell, Status};

/// Options for the install pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Require the lockfile to be usable as-is; path dependencies are
    /// verified too.
    pub frozen: bool,

    /// Skip checksum verification (migration still computes missing ones).
    pub skip_verify: bool,
}

/// Run the install pipeline.
pub fn install(ctx: &ProjectContext, shell: &Shell, opts: InstallOptions) -> Result<()> {
    let lockfile = Lockfile::load(&ctx.lockfile_path())?;

    if opts.frozen && lockfile.needs_checksum_migration() {
        anyhow::bail!(
            "lockfile has entries without checksums; run `quay install` without --frozen first"
        );
    }

    let mut packages = lockfile.to_packages()?;

    // The changelog diffs against the last known installed state when one
    // exists, so solver-driven lockfile changes are attributed to this
    // install.
    let prior = read_prior_state(ctx, &packages);

    run_policy_gate(ctx, shell, &packages)?;

    for pkg in &packages {
        sources::ensure_installed(ctx, shell, pkg)?;
    }

    let verify_opts = VerifyOptions {
        frozen: opts.frozen,
        skip_verify: opts.skip_verify,
    };
    let dirty = integrity::verify_or_compute(ctx, &mut packages, verify_opts, shell)?;

    if dirty {
        write_lockfile_and_log(ctx, &lockfile, &packages, &prior, Action::Install)?;
    }

    write_install_state(ctx, &lockfile, &packages)?;

    shell.status(Status::Installed, format!("{} package(s)", packages.len()));
    Ok(())
}

/// The policy gate: evaluate when a policy file exists, surface warnings,
/// abort on errors before any side effect.
pub fn run_policy_gate(ctx: &ProjectContext, shell: &Shell, packages: &[Package]) -> Result<()> {
    let Some(config) = PolicyConfig::load(ctx)? else {
        return Ok(());
    };

    shell.status(Status::Checking, "dependency policy");
    let report = crate::policy::evaluate(ctx, &config, packages)?;

    for note in &report.notes {
        shell.warn(note);
    }
    for warning in report.warnings() {
        shell.warn(format!(
            "[{}] {}: {}",
            warning.rule, warning.package, warning.message
        ));
    }

    if report.has_errors() {
        for error in report.errors() {
            shell.error(format!(
                "[{}] {}: {}",
                error.rule, error.package, error.message
            ));
        }
        return Err(PolicyBlockedError {
            violations: report.errors().count(),
        }
        .into());
    }

    Ok(())
}

fn read_prior_state(ctx: &ProjectContext, fallback: &[Package]) -> Vec<Package> {
    let info = ctx.install_info_path();
    if info.exists() {
        if let Ok(content) = std::fs::read_to_string(&info) {
            if let Ok(lockfile) = Lockfile::parse(&content) {
                if let Ok(packages) = lockfile.to_packages() {
                    return packages;
                }
            }
        }
        tracing::warn!("unreadable installation state at {}", info.display());
    }
    fallback.to_vec()
}

/// Rewrite the lockfile and append the changelog entry for it.
pub fn write_lockfile_and_log(
    ctx: &ProjectContext,
    old_lockfile: &Lockfile,
    packages: &[Package],
    prior: &[Package],
    action: Action,
) -> Result<()> {
    let updated = Lockfile::from_packages(packages, |pkg| old_lockfile.dependencies_of(pkg.name()));
    updated.save(&ctx.lockfile_path())?;

    let new_bytes = std::fs::read(ctx.lockfile_path())
        .context("failed to re-read lockfile for changelog digest")?;
    let changes = diff::diff(prior, packages);
    let change_set = ChangeSet::from_changes(&changes);

    if let Err(err) = changelog::append(ctx, action, change_set, &new_bytes) {
        // The install already succeeded; a logging failure must not revert
        // it.
        tracing::warn!("failed to append changelog entry: {:#}", err);
    }

    Ok(())
}

/// Snapshot the installed state for `quay diff last-install`.
pub fn write_install_state(
    ctx: &ProjectContext,
    old_lockfile: &Lockfile,
    packages: &[Package],
) -> Result<()> {
    let snapshot = Lockfile::from_packages(packages, |pkg| old_lockfile.dependencies_of(pkg.name()));
    crate::util::fs::ensure_dir(&ctx.lib_dir())?;
    snapshot.save(&ctx.install_info_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// A project whose lockfile points at an already-installed tree, so the
    /// pipeline runs without touching the network.
    fn project_with_installed_dep(checksum: Option<String>) -> (TempDir, ProjectContext) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("Quay.toml"),
            "[package]\nname = \"app\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();

        let checksum_line = checksum
            .map(|c| format!("checksum = \"{}\"\n", c))
            .unwrap_or_default();
        std::fs::write(
            tmp.path().join("Quay.lock"),
            format!(
                "version = 1\n\n[[package]]\nname = \"dep\"\nversion = \"1.0.0\"\nresolver = \"git\"\nsource = \"https://github.com/acme/dep\"\n{}",
                checksum_line
            ),
        )
        .unwrap();

        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let install = ctx.install_path("dep");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(install.join("dep.c"), "int dep;\n").unwrap();

        (tmp, ctx)
    }

    #[test]
    fn test_checksum_migration_rewrites_lockfile() {
        let (_tmp, ctx) = project_with_installed_dep(None);
        let shell = Shell::default();

        install(&ctx, &shell, InstallOptions::default()).unwrap();

        let lockfile = Lockfile::load(&ctx.lockfile_path()).unwrap();
        assert!(!lockfile.needs_checksum_migration());
        let checksum = lockfile.packages[0].checksum.clone().unwrap();
        assert_eq!(
            checksum,
            integrity::compute(&ctx.install_path("dep")).unwrap()
        );

        // The migration produced a changelog entry and an install snapshot.
        assert_eq!(changelog::read(&ctx).len(), 1);
        assert!(ctx.install_info_path().exists());
    }

    #[test]
    fn test_second_install_is_a_noop() {
        let (_tmp, ctx) = project_with_installed_dep(None);
        let shell = Shell::default();

        install(&ctx, &shell, InstallOptions::default()).unwrap();
        let first = std::fs::read_to_string(ctx.lockfile_path()).unwrap();

        install(&ctx, &shell, InstallOptions::default()).unwrap();
        let second = std::fs::read_to_string(ctx.lockfile_path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(changelog::read(&ctx).len(), 1);
    }

    #[test]
    fn test_tampered_checksum_fails() {
        let bogus = format!("sha256:{}", "0".repeat(64));
        let (_tmp, ctx) = project_with_installed_dep(Some(bogus));
        let shell = Shell::default();

        let err = install(&ctx, &shell, InstallOptions::default()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("dep"), "error should name the package: {}", message);
    }

    #[test]
    fn test_skip_verify_bypasses_mismatch() {
        let bogus = format!("sha256:{}", "0".repeat(64));
        let (_tmp, ctx) = project_with_installed_dep(Some(bogus));
        let shell = Shell::default();

        install(
            &ctx,
            &shell,
            InstallOptions {
                frozen: false,
                skip_verify: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_policy_gate_blocks_before_fetch() {
        let (tmp, ctx) = project_with_installed_dep(None);
        std::fs::write(
            tmp.path().join(".quay-policy.yml"),
            "version: \"1\"\nrules:\n  dependencies:\n    blocked:\n      - name: dep\n",
        )
        .unwrap();
        let shell = Shell::default();

        let err = install(&ctx, &shell, InstallOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("policy"));

        // Blocked before the lockfile rewrite: no checksum was recorded.
        let lockfile = Lockfile::load(&ctx.lockfile_path()).unwrap();
        assert!(lockfile.needs_checksum_migration());
        assert!(changelog::read(&ctx).is_empty());
    }

    #[test]
    fn test_path_dependency_skipped_outside_frozen() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("Quay.toml"),
            "[package]\nname = \"app\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();

        let dep_dir = tmp.path().join("localdep");
        std::fs::create_dir_all(&dep_dir).unwrap();
        std::fs::write(dep_dir.join("x.c"), "int x;").unwrap();
        std::fs::write(
            dep_dir.join("Quay.toml"),
            "[package]\nname = \"localdep\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();

        std::fs::write(
            tmp.path().join("Quay.lock"),
            format!(
                "version = 1\n\n[[package]]\nname = \"localdep\"\nversion = \"0.1.0\"\nresolver = \"path\"\nsource = \"{}\"\n",
                dep_dir.display()
            ),
        )
        .unwrap();

        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let shell = Shell::default();

        install(&ctx, &shell, InstallOptions::default()).unwrap();

        // The first install records a checksum for the path dependency too.
        let lockfile = Lockfile::load(&ctx.lockfile_path()).unwrap();
        assert!(lockfile.packages[0].checksum.is_some());
        assert!(Path::new(&ctx.install_path("localdep")).exists());

        // Editing the dependency is fine outside frozen mode: verification
        // is skipped for path packages.
        std::fs::write(dep_dir.join("x.c"), "int y;").unwrap();
        install(&ctx, &shell, InstallOptions::default()).unwrap();

        // A frozen install holds the path dependency to its checksum.
        let err = install(
            &ctx,
            &shell,
            InstallOptions {
                frozen: true,
                skip_verify: false,
            },
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("localdep"));
    }

    #[test]
    fn test_missing_lockfile() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("Quay.toml"),
            "[package]\nname = \"app\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let shell = Shell::default();

        let err = install(&ctx, &shell, InstallOptions::default()).unwrap_err();
        assert!(format!("{}", err).contains("Missing lockfile"));
    }

    #[test]
    fn test_changelog_records_solver_changes() {
        let (_tmp, ctx) = project_with_installed_dep(None);
        let shell = Shell::default();

        // First install writes the snapshot.
        install(&ctx, &shell, InstallOptions::default()).unwrap();

        // The solver adds a package and the next install picks it up.
        std::fs::write(
            ctx.lockfile_path(),
            "version = 1\n\n[[package]]\nname = \"dep\"\nversion = \"1.0.0\"\nresolver = \"git\"\nsource = \"https://github.com/acme/dep\"\n\n[[package]]\nname = \"extra\"\nversion = \"2.0.0\"\nresolver = \"git\"\nsource = \"https://github.com/acme/extra\"\n",
        )
        .unwrap();
        let install_dir = ctx.install_path("extra");
        std::fs::create_dir_all(&install_dir).unwrap();
        std::fs::write(install_dir.join("extra.c"), "int extra;\n").unwrap();

        install(&ctx, &shell, InstallOptions::default()).unwrap();

        let entries = changelog::read(&ctx);
        let last = entries.last().unwrap();
        assert_eq!(last.changes.added.len(), 1);
        assert_eq!(last.changes.added[0].name, "extra");
    }
}
