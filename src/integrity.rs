//! Content integrity checksums over installed source trees.
//!
//! The checksum is a single SHA-256 streamed over every file in the tree in
//! lexicographic relative-path order, with the path and file size mixed into
//! the input (`<path> NUL <size> NUL <bytes>`), so renames are detected even
//! when content is unchanged. VCS state directories are excluded at any
//! depth; a nested library directory is excluded at the top level only, and
//! symlinked directories are never recursed, which keeps the lib
//! back-symlink of path dependencies from creating cycles.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::core::package::Package;
use crate::util::context::{ProjectContext, LIB_DIR};
use crate::util::diagnostic::ChecksumMismatchError;
use crate::util::hash::SHA256_PREFIX;
use crate::util::Shell;

/// Entry names belonging to version-control state, excluded at any depth.
const VCS_NAMES: &[&str] = &[".git", ".hg", ".fossil", ".fslckout", "_FOSSIL_"];

/// Compute the content checksum of a source tree.
pub fn compute(root: &Path) -> Result<String> {
    // Resolve the root so a symlinked install path (path dependencies) is
    // hashed through rather than treated as a single link entry.
    let root = &root
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    let files = collect_files(root)?;

    let mut hasher = Sha256::new();
    for rel in &files {
        let abs = root.join(rel);
        let metadata = abs
            .metadata()
            .with_context(|| format!("failed to stat {}", abs.display()))?;

        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(metadata.len().to_string().as_bytes());
        hasher.update(b"\0");

        let mut file = std::fs::File::open(&abs)
            .with_context(|| format!("failed to open {} for hashing", abs.display()))?;
        io::copy(&mut file, &mut hasher)
            .with_context(|| format!("failed to read {} for hashing", abs.display()))?;
    }

    Ok(format!("{}{}", SHA256_PREFIX, hex::encode(hasher.finalize())))
}

/// Compute and compare against an expected checksum.
pub fn verify(root: &Path, expected: &str) -> Result<bool> {
    Ok(compute(root)? == expected)
}

/// Enumerate hashable files as sorted relative paths.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if VCS_NAMES.contains(&name.as_ref()) {
                return false;
            }
            // The project's own install directory may be symlinked back into
            // a path dependency; skip it at the top level.
            if entry.depth() == 1 && name == LIB_DIR && entry.path().is_dir() {
                return false;
            }
            true
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        let path = entry.path();

        // Symlinks to files are hashed through; symlinked directories are
        // left alone (walkdir does not recurse into them with
        // follow_links(false)).
        let is_file = if entry.file_type().is_symlink() {
            path.metadata().map(|m| m.is_file()).unwrap_or(false)
        } else {
            entry.file_type().is_file()
        };

        if is_file {
            let rel = path
                .strip_prefix(root)
                .expect("walked path is under root")
                .to_path_buf();
            files.push(rel);
        }
    }

    files.sort();
    Ok(files)
}

/// Outcome of checking one locked package against its installed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Computed checksum equals the locked one.
    Match,
    /// Computed checksum disagrees with the locked one.
    Mismatch { expected: String, actual: String },
    /// The lockfile has no checksum for this package yet.
    NoChecksum,
    /// The package's install directory does not exist.
    NotInstalled,
    /// The tree exists but could not be hashed.
    ComputeFailed,
}

/// Check a single locked package without mutating anything (used by the
/// compliance report's integrity section).
pub fn check_package(ctx: &ProjectContext, pkg: &Package) -> IntegrityStatus {
    let install_path = pkg.install_path(ctx);
    if !install_path.exists() {
        return IntegrityStatus::NotInstalled;
    }

    let Some(expected) = pkg.checksum() else {
        return IntegrityStatus::NoChecksum;
    };

    match compute(&install_path) {
        Ok(actual) if actual == expected => IntegrityStatus::Match,
        Ok(actual) => IntegrityStatus::Mismatch {
            expected: expected.to_string(),
            actual,
        },
        Err(err) => {
            tracing::warn!("failed to hash {}: {:#}", pkg.name(), err);
            IntegrityStatus::ComputeFailed
        }
    }
}

/// Options for install-time verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Frozen installs also verify path dependencies.
    pub frozen: bool,
    /// Skip verification of locked checksums (migration still computes
    /// missing ones).
    pub skip_verify: bool,
}

/// Install-time policy: verify every locked checksum and compute the missing
/// ones, recording them on the in-memory packages.
///
/// Returns true when any checksum was newly computed, i.e. the lockfile must
/// be rewritten.
pub fn verify_or_compute(
    ctx: &ProjectContext,
    packages: &mut [Package],
    opts: VerifyOptions,
    shell: &Shell,
) -> Result<bool> {
    let mut dirty = false;

    for pkg in packages.iter_mut() {
        let install_path = pkg.install_path(ctx);

        match pkg.checksum() {
            Some(expected) => {
                // A path dependency can be edited in place; only frozen
                // installs hold it to its recorded checksum.
                if pkg.resolver().is_path() && !opts.frozen {
                    tracing::debug!(
                        "skipping checksum verification for editable path dependency {}",
                        pkg.name()
                    );
                    continue;
                }

                if opts.skip_verify {
                    shell.warn(format!(
                        "skipping checksum verification for {} (--skip-verify)",
                        pkg.name()
                    ));
                    continue;
                }

                let actual = compute(&install_path)
                    .with_context(|| format!("failed to checksum {}", pkg.name()))?;
                if actual != expected {
                    return Err(ChecksumMismatchError {
                        package: pkg.name().to_string(),
                        expected: expected.to_string(),
                        actual,
                    }
                    .into());
                }
            }
            None => {
                let computed = compute(&install_path)
                    .with_context(|| format!("failed to checksum {}", pkg.name()))?;
                pkg.set_checksum(computed);
                dirty = true;
            }
        }
    }

    Ok(dirty)
}
