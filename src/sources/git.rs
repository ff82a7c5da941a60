//! Git source - dependencies from git repositories.

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Repository, ResetType};

use crate::core::package::Package;

/// Clone a package's repository into its install path, honoring a pinned
/// commit from the version's `+git.commit.<hex>` suffix.
pub fn fetch(pkg: &Package, dest: &Path) -> Result<()> {
    tracing::info!("cloning {} from {}", pkg.name(), pkg.source());

    let repo = Repository::clone(pkg.source(), dest)
        .with_context(|| format!("failed to clone {}", pkg.source()))?;

    if let Some(commit) = pkg.commit_component() {
        checkout_commit(&repo, &commit)
            .with_context(|| format!("failed to check out commit {} for {}", commit, pkg.name()))?;
    }

    Ok(())
}

fn checkout_commit(repo: &Repository, commit: &str) -> Result<()> {
    let object = repo.revparse_single(commit)?;
    let commit_obj = object.peel_to_commit()?;

    repo.set_head_detached(commit_obj.id())?;
    repo.reset(commit_obj.as_object(), ResetType::Hard, None)?;

    Ok(())
}
