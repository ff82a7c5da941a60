//! Package sources.
//!
//! Sources are responsible for materializing resolved packages under the
//! project's `lib/` directory: git via libgit2, hg and fossil through their
//! command-line tools, and path dependencies as symlinks.

pub mod git;
pub mod path;
pub mod vcs;

use anyhow::Result;

use crate::core::package::{Package, ResolverKind};
use crate::util::context::ProjectContext;
use crate::util::{Shell, Status};

/// Ensure a package's sources are present at its install path.
///
/// Already-installed trees are left alone; the integrity layer decides
/// whether they are trustworthy.
pub fn ensure_installed(ctx: &ProjectContext, shell: &Shell, pkg: &Package) -> Result<()> {
    let dest = pkg.install_path(ctx);
    if dest.exists() {
        tracing::debug!("{} already present at {}", pkg.name(), dest.display());
        return Ok(());
    }

    shell.status(Status::Fetching, format!("{} ({})", pkg, pkg.source()));
    crate::util::fs::ensure_dir(&ctx.lib_dir())?;

    match pkg.resolver() {
        ResolverKind::Git => git::fetch(pkg, &dest),
        ResolverKind::Path => path::link(pkg, &dest),
        ResolverKind::Hg => vcs::fetch_hg(pkg, &dest),
        ResolverKind::Fossil => vcs::fetch_fossil(pkg, &dest),
    }
}
