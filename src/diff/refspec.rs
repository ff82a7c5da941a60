//! Resolving diff endpoints.
//!
//! A diff endpoint is one of: `current` (the working lockfile),
//! `last-install` (the installation-state snapshot), a filesystem path to a
//! lockfile, or a git ref whose tree contains the lockfile.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::lockfile::Lockfile;
use crate::core::package::Package;
use crate::util::context::{ProjectContext, LOCKFILE_FILE};

/// Resolve a ref argument to the package list it describes.
pub fn resolve(ctx: &ProjectContext, spec: &str) -> Result<Vec<Package>> {
    match spec {
        "current" => Lockfile::load(&ctx.lockfile_path())?.to_packages(),
        "last-install" => {
            let path = ctx.install_info_path();
            if !path.exists() {
                bail!("no installation state found; run `quay install` first");
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Lockfile::parse(&content)?.to_packages()
        }
        other if Path::new(other).is_file() => {
            let content = std::fs::read_to_string(other)
                .with_context(|| format!("failed to read {}", other))?;
            Lockfile::parse(&content)?.to_packages()
        }
        git_ref => from_git_ref(ctx, git_ref)?.to_packages(),
    }
}

/// Extract the lockfile blob at a git ref.
fn from_git_ref(ctx: &ProjectContext, git_ref: &str) -> Result<Lockfile> {
    let repo = git2::Repository::discover(ctx.root())
        .with_context(|| format!("`{}` is not a file, and the project is not in a git repository", git_ref))?;

    let object = repo
        .revparse_single(git_ref)
        .with_context(|| format!("failed to resolve git ref `{}`", git_ref))?;
    let commit = object
        .peel_to_commit()
        .with_context(|| format!("`{}` does not name a commit", git_ref))?;
    let tree = commit.tree()?;

    let entry = tree
        .get_name(LOCKFILE_FILE)
        .ok_or_else(|| anyhow::anyhow!("no {} at ref `{}`", LOCKFILE_FILE, git_ref))?;
    let blob = entry
        .to_object(&repo)?
        .peel_to_blob()
        .with_context(|| format!("{} at `{}` is not a file", LOCKFILE_FILE, git_ref))?;

    let content = std::str::from_utf8(blob.content())
        .with_context(|| format!("{} at `{}` is not valid UTF-8", LOCKFILE_FILE, git_ref))?;
    Lockfile::parse(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCK: &str = "version = 1\n\n[[package]]\nname = \"dep\"\nversion = \"1.0.0\"\nresolver = \"git\"\nsource = \"https://github.com/acme/dep\"\n";

    #[test]
    fn test_resolve_current() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        std::fs::write(ctx.lockfile_path(), LOCK).unwrap();

        let packages = resolve(&ctx, "current").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name(), "dep");
    }

    #[test]
    fn test_resolve_path() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let other = tmp.path().join("old.lock");
        std::fs::write(&other, LOCK).unwrap();

        let packages = resolve(&ctx, other.to_str().unwrap()).unwrap();
        assert_eq!(packages.len(), 1);
    }

    #[test]
    fn test_resolve_last_install_missing() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        assert!(resolve(&ctx, "last-install").is_err());
    }

    #[test]
    fn test_resolve_git_ref() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();

        let repo = git2::Repository::init(tmp.path()).unwrap();
        std::fs::write(tmp.path().join(LOCKFILE_FILE), LOCK).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(LOCKFILE_FILE)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let packages = resolve(&ctx, "HEAD").unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name(), "dep");
    }

    #[test]
    fn test_unresolvable_ref_errors() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        git2::Repository::init(tmp.path()).unwrap();
        assert!(resolve(&ctx, "does-not-exist").is_err());
    }
}
