//! Quay.toml manifest parsing and schema.
//!
//! The same schema serves the root project and each dependency: the
//! compliance layer only reads `package.{name,version,license}`, the
//! dependency table, and `scripts.postinstall`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A parsed Quay.toml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: PackageMeta,

    /// Declared dependencies, keyed by name.
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyDecl>,

    /// Lifecycle scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Scripts>,
}

/// The `[package]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMeta {
    pub name: String,

    pub version: String,

    /// SPDX license expression, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Language standard the project targets (e.g. `c11`, `c17`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<String>,
}

/// Lifecycle scripts (`[scripts]` table).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scripts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postinstall: Option<String>,
}

/// A single dependency declaration.
///
/// Exactly one of `git`, `path`, `hg`, `fossil` names the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fossil: Option<String>,

    /// Version requirement for remote sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Branch, tag, or commit for VCS sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse a manifest from a string.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Names of the declared direct dependencies.
    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    /// The postinstall script, if declared.
    pub fn postinstall(&self) -> Option<&str> {
        self.scripts.as_ref()?.postinstall.as_deref()
    }
}
