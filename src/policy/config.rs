//! Policy file schema and loading.
//!
//! Unknown keys are skipped at every level so older Quay versions keep
//! working as the schema grows.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::context::ProjectContext;

/// Starter policy written by `quay policy init`.
pub const POLICY_TEMPLATE: &str = r#"# Quay dependency policy.
#
# Evaluated on every install and update; `quay policy check` runs it
# standalone. Rules with severity "error" block the operation, warnings are
# reported but do not.
version: "1"

rules:
  sources:
    # Hosts dependencies may be fetched from. An empty list disables the
    # check.
    allowed_hosts: []
    #  - github.com
    #  - gitlab.com

    # Per-host owner allowlists, checked only for allowed hosts.
    allowed_orgs: {}
    #  github.com:
    #    - my-org

    # Reject dependencies that point at local directories.
    deny_path_dependencies: false

  dependencies:
    # Packages that may never appear in the graph.
    blocked: []
    #  - name: leftpad
    #    reason: unmaintained

    # Version floors, as semver requirements.
    minimum_versions: {}
    #  openssl-src: ">=3.0.0"

  security:
    # Warn when a dependency declares no license.
    require_license: false
    # Warn when a locked dependency has no content checksum yet.
    require_checksum: false
    # Block dependencies that declare a postinstall script.
    block_postinstall: false
    # Warn (instead of blocking) on postinstall scripts.
    audit_postinstall: true

  # Custom rules matched against package names (case-insensitive).
  custom: []
  #  - name: no-forks
  #    pattern: "-fork$"
  #    action: warn
  #    reason: prefer upstream releases
"#;

/// The parsed `.quay-policy.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub rules: Rules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default)]
    pub sources: SourceRules,

    #[serde(default)]
    pub dependencies: DependencyRules,

    /// Reserved: parsed but not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<FreshnessRules>,

    #[serde(default)]
    pub security: SecurityRules,

    #[serde(default)]
    pub custom: Vec<CustomRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRules {
    /// Allowlist of hosts; empty disables the check.
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Owner allowlists per host.
    #[serde(default)]
    pub allowed_orgs: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub deny_path_dependencies: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyRules {
    #[serde(default)]
    pub blocked: Vec<BlockedDependency>,

    /// Version floors as semver requirements.
    #[serde(default)]
    pub minimum_versions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDependency {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Declared but not evaluated; commit dates are not cheaply available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreshnessRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_recent_commit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityRules {
    #[serde(default)]
    pub require_license: bool,

    #[serde(default)]
    pub require_checksum: bool,

    #[serde(default)]
    pub block_postinstall: bool,

    #[serde(default)]
    pub audit_postinstall: bool,
}

/// What a matching custom rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomAction {
    Warn,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,

    /// Regex matched against package names, case-insensitive.
    pub pattern: String,

    pub action: CustomAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PolicyConfig {
    /// Load the policy file at the well-known path. `Ok(None)` when absent:
    /// install and update proceed unchanged.
    pub fn load(ctx: &ProjectContext) -> Result<Option<Self>> {
        Self::load_from(&ctx.policy_path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file: {}", path.display()))?;
        let config: PolicyConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse policy file: {}", path.display()))?;

        Ok(Some(config))
    }
}
