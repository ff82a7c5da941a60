//! Path source - local filesystem dependencies.
//!
//! Path dependencies stay editable in place: the install path is a symlink
//! into the source directory rather than a copy.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::package::Package;
use crate::util::fs;

/// Link a path dependency into the install directory.
pub fn link(pkg: &Package, dest: &Path) -> Result<()> {
    let source = fs::normalize_path(Path::new(pkg.source()));
    if !source.is_dir() {
        bail!(
            "path dependency `{}` points at `{}`, which is not a directory",
            pkg.name(),
            pkg.source()
        );
    }

    fs::symlink(&source, dest).map_err(|err| {
        anyhow::anyhow!(
            "failed to link {} -> {}: {}",
            dest.display(),
            source.display(),
            err
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package::ResolverKind;
    use semver::Version;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn test_link_creates_symlink() {
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("file.c"), "int x;").unwrap();

        let dest_dir = TempDir::new().unwrap();
        let dest = dest_dir.path().join("local");

        let pkg = Package::new(
            "local",
            ResolverKind::Path,
            source.path().to_string_lossy(),
            Version::new(0, 1, 0),
        );

        link(&pkg, &dest).unwrap();
        assert!(dest.join("file.c").exists());
        assert!(std::fs::symlink_metadata(&dest).unwrap().is_symlink());
    }

    #[test]
    fn test_link_rejects_missing_directory() {
        let dest_dir = TempDir::new().unwrap();
        let pkg = Package::new(
            "ghost",
            ResolverKind::Path,
            "/definitely/not/here",
            Version::new(0, 1, 0),
        );
        assert!(link(&pkg, &dest_dir.path().join("ghost")).is_err());
    }
}
