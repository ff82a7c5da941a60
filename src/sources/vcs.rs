//! Mercurial and Fossil sources, fetched through their command-line tools.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::package::Package;
use crate::util::process::ProcessBuilder;

/// Clone a Mercurial repository, updating to the pinned commit when the
/// version carries one.
pub fn fetch_hg(pkg: &Package, dest: &Path) -> Result<()> {
    tracing::info!("cloning {} from {} (hg)", pkg.name(), pkg.source());

    let mut clone = ProcessBuilder::new("hg")
        .arg("clone")
        .arg("--quiet")
        .arg(pkg.source());
    if let Some(commit) = pkg.commit_component() {
        clone = clone.arg("--updaterev").arg(commit);
    }
    clone
        .arg(dest)
        .exec_with_output()
        .with_context(|| format!("failed to clone {} with hg", pkg.source()))?;

    Ok(())
}

/// Clone and open a Fossil repository. The repository file lives next to
/// the checkout so the checkout directory stays hashable.
pub fn fetch_fossil(pkg: &Package, dest: &Path) -> Result<()> {
    tracing::info!("cloning {} from {} (fossil)", pkg.name(), pkg.source());

    let repo_file = dest.with_extension("fossil");
    ProcessBuilder::new("fossil")
        .arg("clone")
        .arg(pkg.source())
        .arg(&repo_file)
        .exec_with_output()
        .with_context(|| format!("failed to clone {} with fossil", pkg.source()))?;

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;

    let mut open = ProcessBuilder::new("fossil").cwd(dest).arg("open").arg(&repo_file);
    if let Some(commit) = pkg.commit_component() {
        open = open.arg(commit);
    }
    open.exec_with_output()
        .with_context(|| format!("failed to open fossil repository for {}", pkg.name()))?;

    Ok(())
}
