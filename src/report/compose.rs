//! Report composition.
//!
//! Collects each section through an exception barrier, computes the summary,
//! and records the optional attestation. Collection is in-process; every
//! collector produces the same JSON its `--format=json` command would emit.

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;

use crate::audit::report::{AuditReport, SeverityCounts};
use crate::audit::{changelog, ignore, scanner, Severity};
use crate::core::lockfile::Lockfile;
use crate::core::manifest::Manifest;
use crate::core::package::Package;
use crate::integrity::{self, IntegrityStatus};
use crate::licenses::policy::{LicensePolicy, LicenseReport};
use crate::policy::{self, PolicyConfig};
use crate::report::{sbom, Attestation, ProjectInfo, ReportData, Sections, Summary, REPORT_VERSION};
use crate::util::context::ProjectContext;
use crate::util::Shell;

/// Options for composing a report.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Recorded in the attestation block.
    pub reviewer: Option<String>,

    /// Passed through to the vulnerability scan.
    pub offline: bool,
}

/// Compose the full report for the current project.
pub fn compose(ctx: &ProjectContext, shell: &Shell, opts: &ComposeOptions) -> Result<ReportData> {
    let manifest = Manifest::load(&ctx.manifest_path())?;
    let lockfile = Lockfile::load(&ctx.lockfile_path())?;
    let packages = lockfile.to_packages()?;

    let sections = Sections {
        sbom: try_collect("sbom", || {
            Ok(sbom::build(ctx, &manifest, &packages))
        }),
        vulnerability_audit: try_collect("vulnerability_audit", || {
            collect_audit(ctx, shell, &packages, opts.offline)
        }),
        license_audit: try_collect("license_audit", || {
            collect_licenses(ctx, &manifest, &packages)
        }),
        policy_compliance: collect_policy(ctx, &packages),
        integrity: try_collect("integrity", || Ok(collect_integrity(ctx, &packages))),
        change_history: collect_change_history(ctx),
    };

    let mut summary = build_summary(&manifest, &packages, &sections);
    summary.derive_overall_status();

    let attestation = opts.reviewer.as_ref().map(|reviewer| Attestation {
        reviewer: reviewer.clone(),
        reviewed_at: Utc::now(),
        notes: None,
    });

    Ok(ReportData {
        version: REPORT_VERSION.to_string(),
        generated_at: Utc::now(),
        generator: format!("quay {}", env!("CARGO_PKG_VERSION")),
        project: ProjectInfo {
            name: manifest.package.name.clone(),
            version: manifest.package.version.clone(),
            language_version: manifest
                .package
                .std
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        },
        summary,
        sections,
        reviewer: opts.reviewer.clone(),
        attestation,
        signature: None,
    })
}

/// The exception barrier around a section collector: a failure logs a
/// warning and yields an absent section.
fn try_collect(name: &str, collect: impl FnOnce() -> Result<Value>) -> Option<Value> {
    match collect() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("could not collect report section {}: {:#}", name, err);
            None
        }
    }
}

fn collect_audit(
    ctx: &ProjectContext,
    shell: &Shell,
    packages: &[Package],
    offline: bool,
) -> Result<Value> {
    let results = scanner::scan_packages(
        ctx,
        packages,
        scanner::ScanOptions {
            offline,
            update_db: false,
        },
        shell,
    )?;
    let ignores = ignore::load(ctx, None)?;
    let report = AuditReport::build(&results, &ignores, None, Severity::Low);
    Ok(serde_json::to_value(report)?)
}

fn collect_licenses(
    ctx: &ProjectContext,
    manifest: &Manifest,
    packages: &[Package],
) -> Result<Value> {
    let policy = LicensePolicy::load(ctx)?;
    let report = LicenseReport::build(ctx, manifest, packages, policy.as_ref(), true);
    Ok(serde_json::to_value(report)?)
}

/// Policy is only collected when a policy file exists.
fn collect_policy(ctx: &ProjectContext, packages: &[Package]) -> Option<Value> {
    let config = match PolicyConfig::load(ctx) {
        Ok(Some(config)) => config,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!("could not collect report section policy_compliance: {:#}", err);
            return None;
        }
    };

    try_collect("policy_compliance", || {
        let report = policy::evaluate(ctx, &config, packages)?;
        Ok(serde_json::to_value(report)?)
    })
}

fn collect_integrity(ctx: &ProjectContext, packages: &[Package]) -> Value {
    let mut entries = Vec::new();
    let mut all_verified = true;

    for pkg in packages {
        let status = integrity::check_package(ctx, pkg);
        let (verified, reason) = match &status {
            IntegrityStatus::Match => (true, "checksum match"),
            IntegrityStatus::Mismatch { .. } => (false, "checksum mismatch"),
            IntegrityStatus::NoChecksum => (false, "no checksum in lock"),
            IntegrityStatus::NotInstalled => (false, "not installed"),
            IntegrityStatus::ComputeFailed => (false, "could not compute checksum"),
        };

        // Packages still awaiting checksum migration do not count against
        // the verdict.
        if !verified && !matches!(status, IntegrityStatus::NoChecksum) {
            all_verified = false;
        }

        entries.push(serde_json::json!({
            "name": pkg.name(),
            "version": pkg.semver_component(),
            "verified": verified,
            "reason": reason,
        }));
    }

    serde_json::json!({
        "packages": entries,
        "all_verified": all_verified,
    })
}

/// The change history section is only present when the log file exists.
fn collect_change_history(ctx: &ProjectContext) -> Option<Value> {
    if !ctx.changelog_path().exists() {
        return None;
    }
    try_collect("change_history", || {
        Ok(serde_json::to_value(changelog::read(ctx))?)
    })
}

fn build_summary(manifest: &Manifest, packages: &[Package], sections: &Sections) -> Summary {
    let total = packages.len();
    let direct = manifest.dependencies.len();

    let vulnerabilities = sections
        .vulnerability_audit
        .as_ref()
        .map(count_severities)
        .unwrap_or_default();

    let status_of = |section: &Option<Value>| -> String {
        if section.is_some() {
            "pass".to_string()
        } else {
            "unavailable".to_string()
        }
    };

    let integrity_verified = sections
        .integrity
        .as_ref()
        .and_then(|v| v.get("all_verified"))
        .and_then(Value::as_bool);

    Summary {
        total_dependencies: total,
        direct_dependencies: direct,
        transitive_dependencies: total.saturating_sub(direct),
        vulnerabilities,
        license_status: status_of(&sections.license_audit),
        policy_status: status_of(&sections.policy_compliance),
        integrity_verified,
        overall_status: String::new(),
    }
}

/// Walk the audit section JSON and tally every recognizable severity
/// string attached to a vulnerability entry.
fn count_severities(audit: &Value) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    walk_vulnerabilities(audit, &mut counts);
    counts
}

fn walk_vulnerabilities(value: &Value, counts: &mut SeverityCounts) {
    match value {
        Value::Object(map) => {
            let looks_like_vulnerability = map.contains_key("id") && map.contains_key("severity");
            if looks_like_vulnerability {
                if let Some(label) = map.get("severity").and_then(Value::as_str) {
                    if let Ok(severity) = label.parse::<Severity>() {
                        counts.record(severity);
                        return;
                    }
                }
            }
            for nested in map.values() {
                walk_vulnerabilities(nested, counts);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_vulnerabilities(item, counts);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package::ResolverKind;
    use semver::Version;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectContext) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("Quay.toml"),
            "[package]\nname = \"myapp\"\nversion = \"1.0.0\"\n\n[dependencies]\ndep = { git = \"https://github.com/acme/dep\" }\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("Quay.lock"),
            "version = 1\n\n[[package]]\nname = \"dep\"\nversion = \"1.0.0\"\nresolver = \"git\"\nsource = \"https://github.com/acme/dep\"\n",
        )
        .unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        (tmp, ctx)
    }

    #[test]
    fn test_graceful_degradation() {
        let (_tmp, ctx) = project();
        let shell = Shell::default();

        // Offline with a cold cache, no policy files, no changelog: sbom and
        // integrity must still be present.
        let report = compose(
            &ctx,
            &shell,
            &ComposeOptions {
                reviewer: None,
                offline: true,
            },
        )
        .unwrap();

        assert!(report.sections.sbom.is_some());
        assert!(report.sections.integrity.is_some());
        assert!(report.sections.policy_compliance.is_none());
        assert!(report.sections.change_history.is_none());
        assert_eq!(report.summary.overall_status, "pass");
        assert_eq!(report.summary.policy_status, "unavailable");
    }

    #[test]
    fn test_summary_dependency_counts() {
        let (_tmp, ctx) = project();
        let shell = Shell::default();

        let report = compose(
            &ctx,
            &shell,
            &ComposeOptions {
                reviewer: None,
                offline: true,
            },
        )
        .unwrap();

        assert_eq!(report.summary.total_dependencies, 1);
        assert_eq!(report.summary.direct_dependencies, 1);
        assert_eq!(report.summary.transitive_dependencies, 0);
    }

    #[test]
    fn test_attestation_recorded() {
        let (_tmp, ctx) = project();
        let shell = Shell::default();

        let report = compose(
            &ctx,
            &shell,
            &ComposeOptions {
                reviewer: Some("sec-team".into()),
                offline: true,
            },
        )
        .unwrap();

        let attestation = report.attestation.unwrap();
        assert_eq!(attestation.reviewer, "sec-team");
        assert_eq!(report.reviewer.as_deref(), Some("sec-team"));
    }

    #[test]
    fn test_count_severities_from_audit_json() {
        let audit = serde_json::json!({
            "packages": [
                {
                    "name": "a",
                    "vulnerabilities": [
                        {"id": "ADV-1", "severity": "high"},
                        {"id": "ADV-2", "severity": "medium"},
                    ]
                },
                {
                    "name": "b",
                    "vulnerabilities": [{"id": "ADV-3", "severity": "high"}]
                }
            ]
        });

        let counts = count_severities(&audit);
        assert_eq!(counts.high, 2);
        assert_eq!(counts.medium, 1);
        assert_eq!(counts.critical, 0);
    }

    #[test]
    fn test_integrity_section_reasons() {
        let (_tmp, ctx) = project();

        let uninstalled = Package::new(
            "dep",
            ResolverKind::Git,
            "https://github.com/acme/dep",
            Version::new(1, 0, 0),
        );
        let value = collect_integrity(&ctx, &[uninstalled]);

        assert_eq!(value["packages"][0]["reason"], "not installed");
        assert_eq!(value["all_verified"], false);
    }

    #[test]
    fn test_no_checksum_does_not_fail_integrity() {
        let (_tmp, ctx) = project();

        let pkg = Package::new(
            "dep",
            ResolverKind::Git,
            "https://github.com/acme/dep",
            Version::new(1, 0, 0),
        );
        std::fs::create_dir_all(ctx.install_path("dep")).unwrap();

        let value = collect_integrity(&ctx, &[pkg]);
        assert_eq!(value["packages"][0]["reason"], "no checksum in lock");
        assert_eq!(value["all_verified"], true);
    }
}
