//! Implementation of `quay update`.
//!
//! Re-resolution is the solver's job; update re-materializes the locked
//! sources, regenerates every checksum, rewrites the lockfile, and records
//! the operation in the changelog.

use anyhow::{Context, Result};

use crate::audit::changelog::Action;
use crate::core::lockfile::Lockfile;
use crate::core::package::Package;
use crate::integrity;
use crate::ops::install::{run_policy_gate, write_install_state, write_lockfile_and_log};
use crate::sources;
use crate::util::context::ProjectContext;
use crate::util::{Shell, Status};

/// Run the update pipeline.
pub fn update(ctx: &ProjectContext, shell: &Shell) -> Result<()> {
    let lockfile = Lockfile::load(&ctx.lockfile_path())?;
    let mut packages = lockfile.to_packages()?;

    let prior = read_install_state(ctx).unwrap_or_else(|| packages.clone());

    run_policy_gate(ctx, shell, &packages)?;

    // Refetch remote sources so pinned-commit changes take effect, then
    // regenerate every checksum from what is on disk.
    for pkg in &packages {
        refetch(ctx, shell, pkg)?;
    }

    for pkg in packages.iter_mut() {
        let computed = integrity::compute(&pkg.install_path(ctx))
            .with_context(|| format!("failed to checksum {}", pkg.name()))?;
        pkg.set_checksum(computed);
    }

    write_lockfile_and_log(ctx, &lockfile, &packages, &prior, Action::Update)?;
    write_install_state(ctx, &lockfile, &packages)?;

    shell.status(Status::Updated, format!("{} package(s)", packages.len()));
    Ok(())
}

fn refetch(ctx: &ProjectContext, shell: &Shell, pkg: &Package) -> Result<()> {
    let dest = pkg.install_path(ctx);
    if dest.exists() && !pkg.resolver().is_path() {
        std::fs::remove_dir_all(&dest)
            .with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    sources::ensure_installed(ctx, shell, pkg)
}

fn read_install_state(ctx: &ProjectContext) -> Option<Vec<Package>> {
    let info = ctx.install_info_path();
    if !info.exists() {
        return None;
    }
    let content = std::fs::read_to_string(&info).ok()?;
    Lockfile::parse(&content).ok()?.to_packages().ok()
}
