//! Package - a resolved dependency as recorded in the lockfile.
//!
//! Identity is (name, resolver kind, source, version); the checksum is
//! metadata and never participates in equality. A package's own manifest
//! (its "spec") is loaded lazily from the installed tree, and a load failure
//! is treated as "no spec" by every consumer.

use std::path::PathBuf;
use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use semver::Version;

use crate::core::manifest::Manifest;
use crate::util::context::ProjectContext;

/// Matches a version with a pinned-commit build suffix,
/// e.g. `1.2.3+git.commit.0a1b2c3d`.
static COMMIT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<semver>.+)\+(?:git|hg|fossil)\.commit\.(?<hex>[0-9a-fA-F]+)$")
        .expect("static regex is valid")
});

/// The kind of source a dependency is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Git repository
    Git,
    /// Local filesystem directory
    Path,
    /// Mercurial repository
    Hg,
    /// Fossil repository
    Fossil,
}

impl ResolverKind {
    /// Remote kinds carry a URL in `source`; `Path` carries a directory.
    pub fn is_path(&self) -> bool {
        matches!(self, ResolverKind::Path)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverKind::Git => "git",
            ResolverKind::Path => "path",
            ResolverKind::Hg => "hg",
            ResolverKind::Fossil => "fossil",
        }
    }
}

impl std::str::FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(ResolverKind::Git),
            "path" => Ok(ResolverKind::Path),
            "hg" => Ok(ResolverKind::Hg),
            "fossil" => Ok(ResolverKind::Fossil),
            _ => Err(format!("unknown resolver kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved dependency.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name, unique within a lockfile
    name: String,

    /// Where the package comes from
    resolver: ResolverKind,

    /// URL for remote kinds, filesystem path for `path`
    source: String,

    /// Resolved version. Build metadata of the form `+<vcs>.commit.<hex>`
    /// pins a specific commit.
    version: Version,

    /// Content checksum (`sha256:<hex>`), absent for fresh installs and for
    /// lockfiles predating the integrity feature
    checksum: Option<String>,

    /// Lazily-loaded manifest of the dependency itself
    spec: OnceLock<Option<Manifest>>,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        resolver: ResolverKind,
        source: impl Into<String>,
        version: Version,
    ) -> Self {
        Package {
            name: name.into(),
            resolver,
            source: source.into(),
            version,
            checksum: None,
            spec: OnceLock::new(),
        }
    }

    /// Attach a known checksum (builder form, used by the lockfile decoder).
    pub fn with_checksum(mut self, checksum: Option<String>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolver(&self) -> ResolverKind {
        self.resolver
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Full version string including any commit suffix.
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// The version with any pinned-commit build metadata stripped.
    pub fn semver_component(&self) -> String {
        match COMMIT_SUFFIX_RE.captures(&self.version.to_string()) {
            Some(caps) => caps["semver"].to_string(),
            None => self.version.to_string(),
        }
    }

    /// The pinned commit hex, when the version carries a
    /// `+<vcs>.commit.<hex>` suffix.
    pub fn commit_component(&self) -> Option<String> {
        COMMIT_SUFFIX_RE
            .captures(&self.version.to_string())
            .map(|caps| caps["hex"].to_string())
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn set_checksum(&mut self, checksum: String) {
        self.checksum = Some(checksum);
    }

    /// Where this package's sources live once installed.
    pub fn install_path(&self, ctx: &ProjectContext) -> PathBuf {
        ctx.install_path(&self.name)
    }

    /// The package's own manifest, loaded on first access from the installed
    /// tree (falling back to the source directory for path dependencies).
    /// A missing or unparseable manifest yields `None`.
    pub fn spec(&self, ctx: &ProjectContext) -> Option<&Manifest> {
        self.spec
            .get_or_init(|| {
                let installed = self
                    .install_path(ctx)
                    .join(crate::util::context::MANIFEST_FILE);
                let manifest = Manifest::load(&installed).ok().or_else(|| {
                    if self.resolver.is_path() {
                        let direct =
                            PathBuf::from(&self.source).join(crate::util::context::MANIFEST_FILE);
                        Manifest::load(&direct).ok()
                    } else {
                        None
                    }
                });
                if manifest.is_none() {
                    tracing::debug!("no spec available for {}", self.name);
                }
                manifest
            })
            .as_ref()
    }

    /// The declared license, treating an empty string as absent.
    pub fn declared_license(&self, ctx: &ProjectContext) -> Option<String> {
        self.spec(ctx)
            .and_then(|spec| spec.package.license.clone())
            .filter(|l| !l.trim().is_empty())
    }

    /// Whether the package's spec declares a postinstall script.
    pub fn has_postinstall(&self, ctx: &ProjectContext) -> bool {
        self.spec(ctx)
            .map(|spec| spec.postinstall().is_some())
            .unwrap_or(false)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.resolver == other.resolver
            && self.source == other.source
            && self.version == other.version
    }
}

impl Eq for Package {}

impl std::hash::Hash for Package {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.resolver.hash(state);
        self.source.hash(state);
        self.version.hash(state);
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}
