//! Project context for Quay operations.
//!
//! Centralizes the well-known project-relative paths: the manifest and
//! lockfile, the `lib/` install directory, the `.quay/` state directory, and
//! the optional compliance configuration files.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "Quay.toml";

/// Lockfile file name.
pub const LOCKFILE_FILE: &str = "Quay.lock";

/// Directory dependencies are installed into, relative to the project root.
pub const LIB_DIR: &str = "lib";

/// Installation-state file inside the lib directory.
pub const INSTALL_INFO_FILE: &str = ".quay.info";

/// Project directories for Quay
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("dev", "quay", "quay"));

/// Context for a single project, rooted at the directory holding `Quay.toml`.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Project root directory
    root: PathBuf,

    /// Home directory for global Quay data (~/.quay/)
    home: PathBuf,
}

impl ProjectContext {
    /// Locate the project root by searching upward from `start` for a
    /// `Quay.toml`.
    pub fn discover(start: &Path) -> Result<Self> {
        let mut current = start.to_path_buf();
        loop {
            if current.join(MANIFEST_FILE).exists() {
                return Self::at(&current);
            }
            if !current.pop() {
                anyhow::bail!(
                    "could not find `{}` in `{}` or any parent directory",
                    MANIFEST_FILE,
                    start.display()
                );
            }
        }
    }

    /// Locate the project root starting from the current directory.
    pub fn discover_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::discover(&cwd)
    }

    /// Create a context rooted at a known project directory.
    pub fn at(root: &Path) -> Result<Self> {
        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            dirs_fallback()
        };

        Ok(ProjectContext {
            root: root.to_path_buf(),
            home,
        })
    }

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Global Quay home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Path to the project manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Path to the lockfile.
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_FILE)
    }

    /// Directory dependencies are installed into.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join(LIB_DIR)
    }

    /// Install path of a named dependency.
    pub fn install_path(&self, name: &str) -> PathBuf {
        self.lib_dir().join(name)
    }

    /// Installation-state file written after a successful install.
    pub fn install_info_path(&self) -> PathBuf {
        self.lib_dir().join(INSTALL_INFO_FILE)
    }

    /// Project-local state directory (`.quay/`).
    pub fn quay_dir(&self) -> PathBuf {
        self.root.join(".quay")
    }

    /// Audit state directory (`.quay/audit/`).
    pub fn audit_dir(&self) -> PathBuf {
        self.quay_dir().join("audit")
    }

    /// Per-purl vulnerability cache directory.
    pub fn audit_cache_dir(&self) -> PathBuf {
        self.audit_dir().join("cache")
    }

    /// Change audit log file.
    pub fn changelog_path(&self) -> PathBuf {
        self.audit_dir().join("changelog.json")
    }

    /// Archived compliance reports directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.audit_dir().join("reports")
    }

    /// Dependency policy file (`.quay-policy.yml`).
    pub fn policy_path(&self) -> PathBuf {
        self.root.join(".quay-policy.yml")
    }

    /// License policy file (`.quay-license-policy.yml`).
    pub fn license_policy_path(&self) -> PathBuf {
        self.root.join(".quay-license-policy.yml")
    }

    /// Audit ignore file (`.quay-audit-ignore.yml`).
    pub fn audit_ignore_path(&self) -> PathBuf {
        self.root.join(".quay-audit-ignore.yml")
    }

    /// Global cache directory for fetched git repositories.
    pub fn git_cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("git")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".quay"))
        .unwrap_or_else(|| PathBuf::from(".quay"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_walks_upward() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILE), "[package]\n").unwrap();
        let nested = tmp.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = ProjectContext::discover(&nested).unwrap();
        assert_eq!(ctx.root(), tmp.path());
    }

    #[test]
    fn test_discover_fails_without_manifest() {
        let tmp = TempDir::new().unwrap();
        assert!(ProjectContext::discover(tmp.path()).is_err());
    }

    #[test]
    fn test_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();

        assert_eq!(ctx.lockfile_path(), tmp.path().join("Quay.lock"));
        assert_eq!(ctx.install_path("dep"), tmp.path().join("lib/dep"));
        assert_eq!(
            ctx.changelog_path(),
            tmp.path().join(".quay/audit/changelog.json")
        );
        assert!(ctx.policy_path().ends_with(".quay-policy.yml"));
    }
}
