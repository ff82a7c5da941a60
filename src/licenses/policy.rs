//! License policy: allow/deny evaluation over declared and detected
//! licenses.
//!
//! The policy file is optional; without one every package evaluates to
//! Allowed/Unknown for reporting only. Deny always dominates: a denied
//! identifier anywhere in the expression forces the Denied verdict even
//! when an OR alternative would satisfy the allowlist.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::package::Package;
use crate::licenses::scanner;
use crate::spdx::expression::Expression;
use crate::util::context::ProjectContext;

/// Per-package verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseVerdict {
    Allowed,
    Denied,
    Unlicensed,
    Unknown,
    Overridden,
}

/// Where the effective license string came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseSource {
    Declared,
    Detected,
    Override,
    None,
}

/// A manual override for one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseOverride {
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The `policy:` document in `.quay-license-policy.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicensePolicy {
    /// Allowlist; empty means "no allowlist filter".
    #[serde(default)]
    pub allowed: BTreeSet<String>,

    #[serde(default)]
    pub denied: BTreeSet<String>,

    #[serde(default)]
    pub require_license: bool,

    #[serde(default)]
    pub overrides: BTreeMap<String, LicenseOverride>,
}

#[derive(Debug, Deserialize)]
struct LicensePolicyFile {
    #[serde(default)]
    policy: LicensePolicy,
}

impl LicensePolicy {
    /// Load the policy file at the well-known path. `Ok(None)` when absent
    /// (reporting-only mode).
    pub fn load(ctx: &ProjectContext) -> Result<Option<Self>> {
        Self::load_from(&ctx.license_policy_path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read license policy: {}", path.display()))?;
        let file: LicensePolicyFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse license policy: {}", path.display()))?;
        Ok(Some(file.policy))
    }
}

/// Evaluation result for one package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageLicense {
    pub name: String,
    pub version: String,

    /// The license string that was evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    pub source: LicenseSource,
    pub verdict: LicenseVerdict,

    /// False when the license string did not parse as an SPDX expression
    /// and was checked as a plain identifier instead.
    pub spdx_valid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Evaluate a single package against the policy.
///
/// `detect` enables the on-disk scanner for installed packages; declared
/// licenses always win over detection.
pub fn evaluate_package(
    ctx: &ProjectContext,
    policy: &LicensePolicy,
    pkg: &Package,
    detect: bool,
) -> PackageLicense {
    let name = pkg.name().to_string();
    let version = pkg.semver_component();

    if let Some(override_) = policy.overrides.get(&name) {
        return PackageLicense {
            name,
            version,
            license: Some(override_.license.clone()),
            source: LicenseSource::Override,
            verdict: LicenseVerdict::Overridden,
            spdx_valid: crate::spdx::valid_id(&override_.license)
                || Expression::parse(&override_.license).is_ok(),
            reason: override_.reason.clone(),
        };
    }

    let declared = pkg.declared_license(ctx);
    let (effective, source) = match declared {
        Some(license) => (Some(license), LicenseSource::Declared),
        None if detect => {
            let install_path = pkg.install_path(ctx);
            let scanned = if install_path.exists() {
                scanner::scan(&install_path).id
            } else {
                None
            };
            match scanned {
                Some(id) => (Some(id), LicenseSource::Detected),
                None => (None, LicenseSource::None),
            }
        }
        None => (None, LicenseSource::None),
    };

    let Some(license) = effective else {
        let verdict = if policy.require_license {
            LicenseVerdict::Unlicensed
        } else {
            LicenseVerdict::Unknown
        };
        return PackageLicense {
            name,
            version,
            license: None,
            source,
            verdict,
            spdx_valid: false,
            reason: None,
        };
    };

    let (verdict, spdx_valid) = evaluate_expression(&license, policy);
    PackageLicense {
        name,
        version,
        license: Some(license),
        source,
        verdict,
        spdx_valid,
        reason: None,
    }
}

/// Evaluate a license string against the policy sets.
///
/// Returns the verdict plus whether the string parsed as a valid SPDX
/// expression.
pub fn evaluate_expression(license: &str, policy: &LicensePolicy) -> (LicenseVerdict, bool) {
    match Expression::parse(license) {
        Ok(expr) => {
            let ids = expr.license_ids();

            if ids.iter().any(|id| policy.denied.contains(id)) {
                return (LicenseVerdict::Denied, true);
            }
            if policy.allowed.is_empty() {
                return (LicenseVerdict::Allowed, true);
            }
            if expr.satisfied_by(&policy.allowed) {
                (LicenseVerdict::Allowed, true)
            } else {
                (LicenseVerdict::Unknown, true)
            }
        }
        Err(err) => {
            tracing::debug!("license `{}` is not valid SPDX: {}", license, err);
            // Fall back to plain-identifier membership.
            let verdict = if policy.denied.contains(license) {
                LicenseVerdict::Denied
            } else if policy.allowed.is_empty() || policy.allowed.contains(license) {
                LicenseVerdict::Allowed
            } else {
                LicenseVerdict::Unknown
            };
            (verdict, false)
        }
    }
}

/// Summary counts over all evaluated packages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LicenseSummary {
    pub total: usize,
    pub allowed: usize,
    pub denied: usize,
    pub unlicensed: usize,
    pub unknown: usize,
    pub overridden: usize,
}

/// The aggregate license report.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseReport {
    pub root_name: String,
    pub root_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_license: Option<String>,
    pub dependencies: Vec<PackageLicense>,
    pub summary: LicenseSummary,
    pub policy_used: bool,
}

impl LicenseReport {
    /// Evaluate every locked package.
    pub fn build(
        ctx: &ProjectContext,
        root: &crate::core::manifest::Manifest,
        packages: &[Package],
        policy: Option<&LicensePolicy>,
        detect: bool,
    ) -> Self {
        let default_policy = LicensePolicy::default();
        let effective_policy = policy.unwrap_or(&default_policy);

        let dependencies: Vec<PackageLicense> = packages
            .iter()
            .map(|pkg| evaluate_package(ctx, effective_policy, pkg, detect))
            .collect();

        let mut summary = LicenseSummary {
            total: dependencies.len(),
            ..Default::default()
        };
        for dep in &dependencies {
            match dep.verdict {
                LicenseVerdict::Allowed => summary.allowed += 1,
                LicenseVerdict::Denied => summary.denied += 1,
                LicenseVerdict::Unlicensed => summary.unlicensed += 1,
                LicenseVerdict::Unknown => summary.unknown += 1,
                LicenseVerdict::Overridden => summary.overridden += 1,
            }
        }

        LicenseReport {
            root_name: root.package.name.clone(),
            root_version: root.package.version.clone(),
            root_license: root.package.license.clone(),
            dependencies,
            summary,
            policy_used: policy.is_some(),
        }
    }

    /// Fatal error for `--check` mode when denied or unlicensed packages
    /// exist.
    pub fn check(&self) -> Result<()> {
        if self.summary.denied > 0 || self.summary.unlicensed > 0 {
            anyhow::bail!(
                "license check failed: {} denied, {} unlicensed",
                self.summary.denied,
                self.summary.unlicensed
            );
        }
        Ok(())
    }
}
