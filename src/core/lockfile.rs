//! Quay.lock encoding and decoding.
//!
//! The lockfile is the authoritative record of the resolved graph. The
//! compliance layer adds one optional field per package: `checksum`. Readers
//! accept its absence (lockfiles predating the feature); writers emit it on
//! every entry where it is known.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::package::{Package, ResolverKind};
use crate::util::diagnostic::MissingLockfileError;
use crate::util::fs::write_atomic_string;

/// Lockfile representation for serialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct Lockfile {
    /// Lockfile format version
    pub version: u32,

    /// Locked packages
    #[serde(rename = "package", default)]
    pub packages: Vec<LockedPackage>,
}

/// A locked package entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPackage {
    /// Package name
    pub name: String,

    /// Exact version, optionally suffixed `+<vcs>.commit.<hex>`
    pub version: String,

    /// Resolver kind (git, path, hg, fossil)
    pub resolver: ResolverKind,

    /// Source URL, or filesystem path for path dependencies
    pub source: String,

    /// Content checksum (`sha256:<hex>`), absent on lockfiles written
    /// before the integrity feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Names of this package's own dependencies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Lockfile {
    /// Load a lockfile from a path, failing with the canonical "Missing
    /// lockfile" diagnostic when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MissingLockfileError.into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse lockfile content (used for on-disk files and for blobs
    /// extracted from VCS history).
    pub fn parse(content: &str) -> Result<Self> {
        let lockfile: Lockfile =
            toml::from_str(content).with_context(|| "failed to parse lockfile")?;

        if lockfile.version != 1 {
            anyhow::bail!(
                "lockfile version {} is not compatible with this version of Quay",
                lockfile.version
            );
        }

        Ok(lockfile)
    }

    /// Save the lockfile atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        let with_header = format!(
            "# This file is automatically generated by Quay.\n\
             # It is not intended for manual editing.\n\n\
             {content}"
        );

        write_atomic_string(path, &with_header)
            .with_context(|| format!("failed to write lockfile: {}", path.display()))
    }

    /// Build a lockfile from resolved packages.
    ///
    /// `dependencies` edges come from each package's spec when available and
    /// are restricted to the locked set.
    pub fn from_packages(packages: &[Package], edges: impl Fn(&Package) -> Vec<String>) -> Self {
        let locked_names: Vec<&str> = packages.iter().map(|p| p.name()).collect();

        let mut entries: Vec<LockedPackage> = packages
            .iter()
            .map(|pkg| {
                let mut deps: Vec<String> = edges(pkg)
                    .into_iter()
                    .filter(|d| locked_names.contains(&d.as_str()))
                    .collect();
                deps.sort();

                LockedPackage {
                    name: pkg.name().to_string(),
                    version: pkg.version_string(),
                    resolver: pkg.resolver(),
                    source: pkg.source().to_string(),
                    checksum: pkg.checksum().map(|s| s.to_string()),
                    dependencies: deps,
                }
            })
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Lockfile {
            version: 1,
            packages: entries,
        }
    }

    /// Decode the locked entries into the in-memory package model.
    pub fn to_packages(&self) -> Result<Vec<Package>> {
        self.packages
            .iter()
            .map(|entry| {
                let version = Version::from_str(&entry.version).with_context(|| {
                    format!("invalid version `{}` for `{}`", entry.version, entry.name)
                })?;

                Ok(
                    Package::new(&entry.name, entry.resolver, &entry.source, version)
                        .with_checksum(entry.checksum.clone()),
                )
            })
            .collect()
    }

    /// True when any locked package has no checksum yet. An install must
    /// rewrite the lockfile in that case so migration happens transparently.
    pub fn needs_checksum_migration(&self) -> bool {
        self.packages.iter().any(|p| p.checksum.is_none())
    }

    /// Dependency names recorded for a given package.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.packages
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dependencies.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Lockfile {
        Lockfile {
            version: 1,
            packages: vec![
                LockedPackage {
                    name: "zlib-src".into(),
                    version: "1.3.1".into(),
                    resolver: ResolverKind::Git,
                    source: "https://github.com/acme/zlib-src".into(),
                    checksum: Some(format!("sha256:{}", "a".repeat(64))),
                    dependencies: vec![],
                },
                LockedPackage {
                    name: "localdep".into(),
                    version: "0.1.0".into(),
                    resolver: ResolverKind::Path,
                    source: "../localdep".into(),
                    checksum: None,
                    dependencies: vec!["zlib-src".into()],
                },
            ],
        }
    }

    #[test]
    fn test_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Quay.lock");

        sample().save(&path).unwrap();
        let loaded = Lockfile::load(&path).unwrap();

        assert_eq!(loaded.packages.len(), 2);
        assert_eq!(loaded.packages[0].name, "zlib-src");
        assert!(loaded.packages[0].checksum.is_some());
        assert!(loaded.packages[1].checksum.is_none());
    }

    #[test]
    fn test_missing_lockfile_error() {
        let tmp = TempDir::new().unwrap();
        let err = Lockfile::load(&tmp.path().join("Quay.lock")).unwrap_err();
        assert!(err.to_string().contains("Missing lockfile"));
    }

    #[test]
    fn test_incompatible_version() {
        let result = Lockfile::parse("version = 9\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_needs_checksum_migration() {
        assert!(sample().needs_checksum_migration());

        let mut all_present = sample();
        for p in &mut all_present.packages {
            p.checksum = Some(format!("sha256:{}", "b".repeat(64)));
        }
        assert!(!all_present.needs_checksum_migration());
    }

    #[test]
    fn test_to_packages_preserves_commit_suffix() {
        let mut lf = sample();
        lf.packages[0].version = "1.3.1+git.commit.0abc123".into();

        let pkgs = lf.to_packages().unwrap();
        assert_eq!(pkgs[0].commit_component().as_deref(), Some("0abc123"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = "version = 1\n\n[[package]]\nname = \"x\"\nversion = \"1.0.0\"\nresolver = \"git\"\nsource = \"https://example.com/x\"\nfuture_field = true\n";
        let lf = Lockfile::parse(content).unwrap();
        assert_eq!(lf.packages.len(), 1);
    }
}
