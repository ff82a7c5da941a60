//! Policy evaluation.
//!
//! Runs every configured rule over every resolved package, in a stable
//! order. Source URLs that do not parse skip the host/org checks rather
//! than failing the run.

use anyhow::Result;
use regex::RegexBuilder;
use semver::{Version, VersionReq};
use url::Url;

use crate::core::package::Package;
use crate::policy::config::{CustomAction, PolicyConfig};
use crate::policy::report::{PolicyReport, RuleSeverity};
use crate::util::context::ProjectContext;

/// Evaluate the resolved packages against the policy.
pub fn evaluate(
    ctx: &ProjectContext,
    config: &PolicyConfig,
    packages: &[Package],
) -> Result<PolicyReport> {
    let mut report = PolicyReport::default();

    if config.rules.freshness.is_some() {
        report
            .notes
            .push("freshness rules are parsed but not enforced".to_string());
    }

    // Compile custom patterns once; a bad pattern is a configuration error.
    let custom_rules: Vec<(regex::Regex, &crate::policy::config::CustomRule)> = config
        .rules
        .custom
        .iter()
        .map(|rule| {
            RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map(|re| (re, rule))
                .map_err(|err| {
                    anyhow::anyhow!("invalid pattern in custom rule `{}`: {}", rule.name, err)
                })
        })
        .collect::<Result<_>>()?;

    for pkg in packages {
        check_blocked(config, pkg, &mut report);
        check_sources(config, pkg, &mut report);
        check_minimum_version(config, pkg, &mut report);
        check_security(ctx, config, pkg, &mut report);

        for (re, rule) in &custom_rules {
            if re.is_match(pkg.name()) {
                let severity = match rule.action {
                    CustomAction::Block => RuleSeverity::Error,
                    CustomAction::Warn => RuleSeverity::Warning,
                };
                let message = rule
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("matches pattern `{}`", rule.pattern));
                report.push(pkg.name(), format!("custom:{}", rule.name), severity, message);
            }
        }
    }

    Ok(report)
}

fn check_blocked(config: &PolicyConfig, pkg: &Package, report: &mut PolicyReport) {
    if let Some(blocked) = config
        .rules
        .dependencies
        .blocked
        .iter()
        .find(|b| b.name == pkg.name())
    {
        let message = match &blocked.reason {
            Some(reason) => format!("dependency is blocked: {}", reason),
            None => "dependency is blocked".to_string(),
        };
        report.push(pkg.name(), "blocked_dependency", RuleSeverity::Error, message);
    }
}

fn check_sources(config: &PolicyConfig, pkg: &Package, report: &mut PolicyReport) {
    let sources = &config.rules.sources;

    if pkg.resolver().is_path() {
        if sources.deny_path_dependencies {
            report.push(
                pkg.name(),
                "deny_path_dependencies",
                RuleSeverity::Error,
                format!("path dependency `{}` is not allowed", pkg.source()),
            );
        }
        return;
    }

    let Some((host, owner)) = host_and_owner(pkg.source()) else {
        tracing::debug!(
            "source `{}` of {} is not a parseable URL; skipping host checks",
            pkg.source(),
            pkg.name()
        );
        return;
    };

    if !sources.allowed_hosts.is_empty() {
        if !sources.allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            report.push(
                pkg.name(),
                "allowed_hosts",
                RuleSeverity::Error,
                format!("host `{}` is not in the allowed hosts list", host),
            );
            return;
        }
    }

    if let Some(orgs) = lookup_orgs(sources, &host) {
        match owner {
            Some(owner) if orgs.iter().any(|o| o.eq_ignore_ascii_case(&owner)) => {}
            Some(owner) => report.push(
                pkg.name(),
                "allowed_orgs",
                RuleSeverity::Error,
                format!("owner `{}` is not allowed for host `{}`", owner, host),
            ),
            None => report.push(
                pkg.name(),
                "allowed_orgs",
                RuleSeverity::Error,
                format!("could not determine owner for host `{}`", host),
            ),
        }
    }
}

fn lookup_orgs<'a>(
    sources: &'a crate::policy::config::SourceRules,
    host: &str,
) -> Option<&'a Vec<String>> {
    sources
        .allowed_orgs
        .iter()
        .find(|(h, _)| h.eq_ignore_ascii_case(host))
        .map(|(_, orgs)| orgs)
}

fn check_minimum_version(config: &PolicyConfig, pkg: &Package, report: &mut PolicyReport) {
    let Some(requirement) = config.rules.dependencies.minimum_versions.get(pkg.name()) else {
        return;
    };

    let req = match VersionReq::parse(requirement) {
        Ok(req) => req,
        Err(err) => {
            tracing::warn!(
                "invalid minimum version requirement `{}` for {}: {}",
                requirement,
                pkg.name(),
                err
            );
            return;
        }
    };

    // Compare against the semver component; build metadata never satisfies
    // requirements.
    let version = Version::parse(&pkg.semver_component()).unwrap_or_else(|_| pkg.version().clone());
    if !req.matches(&version) {
        report.push(
            pkg.name(),
            "minimum_version",
            RuleSeverity::Error,
            format!("version {} does not satisfy required `{}`", version, requirement),
        );
    }
}

fn check_security(
    ctx: &ProjectContext,
    config: &PolicyConfig,
    pkg: &Package,
    report: &mut PolicyReport,
) {
    let security = &config.rules.security;

    if security.require_license {
        if pkg.declared_license(ctx).is_none() {
            report.push(
                pkg.name(),
                "require_license",
                RuleSeverity::Warning,
                "no license declared in the package manifest",
            );
        }
    }

    if security.require_checksum && pkg.checksum().is_none() {
        report.push(
            pkg.name(),
            "require_checksum",
            RuleSeverity::Warning,
            "no content checksum recorded in the lockfile",
        );
    }

    if security.block_postinstall || security.audit_postinstall {
        if pkg.has_postinstall(ctx) {
            if security.block_postinstall {
                report.push(
                    pkg.name(),
                    "block_postinstall",
                    RuleSeverity::Error,
                    "declares a postinstall script",
                );
            } else {
                report.push(
                    pkg.name(),
                    "audit_postinstall",
                    RuleSeverity::Warning,
                    "declares a postinstall script",
                );
            }
        }
    }
}

/// Extract (host, first path segment) from a source URL. The owner has any
/// trailing `.git` stripped.
fn host_and_owner(source: &str) -> Option<(String, Option<String>)> {
    let url = Url::parse(source).ok()?;
    let host = url.host_str()?.to_lowercase();

    let owner = url.path_segments().and_then(|mut segments| {
        segments
            .find(|s| !s.is_empty())
            .map(|s| s.strip_suffix(".git").unwrap_or(s).to_string())
    });

    Some((host, owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package::ResolverKind;
    use tempfile::TempDir;

    fn ctx() -> (TempDir, ProjectContext) {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        (tmp, ctx)
    }

    fn git_pkg(name: &str, source: &str, version: &str) -> Package {
        Package::new(name, ResolverKind::Git, source, Version::parse(version).unwrap())
    }

    fn path_pkg(name: &str) -> Package {
        Package::new(name, ResolverKind::Path, "../local", Version::new(0, 1, 0))
    }

    fn config(yaml: &str) -> PolicyConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_blocked_dependency() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  dependencies:\n    blocked:\n      - name: leftpad\n        reason: unmaintained\n",
        );
        let pkg = git_pkg("leftpad", "https://github.com/acme/leftpad", "1.0.0");

        let report = evaluate(&ctx, &config, &[pkg]).unwrap();
        assert!(report.has_errors());
        assert_eq!(report.violations[0].rule, "blocked_dependency");
        assert!(report.violations[0].message.contains("unmaintained"));
    }

    #[test]
    fn test_deny_path_dependencies() {
        let (_tmp, ctx) = ctx();
        let config = config("rules:\n  sources:\n    deny_path_dependencies: true\n");

        let report = evaluate(&ctx, &config, &[path_pkg("local")]).unwrap();
        assert!(report.has_errors());
        assert_eq!(report.violations[0].rule, "deny_path_dependencies");

        // Path packages never hit the host checks.
        let config = config_with_hosts();
        let report = evaluate(&ctx, &config, &[path_pkg("local")]).unwrap();
        assert!(!report.violations.iter().any(|v| v.rule == "allowed_hosts"));
    }

    fn config_with_hosts() -> PolicyConfig {
        config("rules:\n  sources:\n    allowed_hosts: [github.com]\n")
    }

    #[test]
    fn test_allowed_hosts() {
        let (_tmp, ctx) = ctx();
        let config = config_with_hosts();

        let ok = git_pkg("a", "https://github.com/acme/a", "1.0.0");
        let bad = git_pkg("b", "https://evil.example.com/acme/b", "1.0.0");

        let report = evaluate(&ctx, &config, &[ok, bad]).unwrap();
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.violations[0].package, "b");
        assert_eq!(report.violations[0].rule, "allowed_hosts");
    }

    #[test]
    fn test_empty_allowed_hosts_disables_check() {
        let (_tmp, ctx) = ctx();
        let config = config("rules:\n  sources:\n    allowed_hosts: []\n");
        let pkg = git_pkg("a", "https://anywhere.example.com/x/a", "1.0.0");

        let report = evaluate(&ctx, &config, &[pkg]).unwrap();
        assert!(!report.has_errors());
    }

    #[test]
    fn test_allowed_orgs() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  sources:\n    allowed_hosts: [github.com]\n    allowed_orgs:\n      github.com: [acme]\n",
        );

        let ok = git_pkg("a", "https://github.com/acme/a.git", "1.0.0");
        let bad = git_pkg("b", "https://github.com/stranger/b", "1.0.0");

        let report = evaluate(&ctx, &config, &[ok, bad]).unwrap();
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.violations[0].rule, "allowed_orgs");
        assert!(report.violations[0].message.contains("stranger"));
    }

    #[test]
    fn test_unparseable_source_skips_host_checks() {
        let (_tmp, ctx) = ctx();
        let config = config_with_hosts();
        let pkg = git_pkg("a", "not a url at all", "1.0.0");

        let report = evaluate(&ctx, &config, &[pkg]).unwrap();
        assert!(!report.has_errors());
    }

    #[test]
    fn test_minimum_version() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  dependencies:\n    minimum_versions:\n      zlib-src: \">=1.3.0\"\n",
        );

        let old = git_pkg("zlib-src", "https://github.com/acme/zlib-src", "1.2.9");
        let report = evaluate(&ctx, &config, &[old]).unwrap();
        assert!(report.has_errors());
        assert_eq!(report.violations[0].rule, "minimum_version");

        let new = git_pkg("zlib-src", "https://github.com/acme/zlib-src", "1.3.1");
        let report = evaluate(&ctx, &config, &[new]).unwrap();
        assert!(!report.has_errors());
    }

    #[test]
    fn test_minimum_version_ignores_commit_suffix() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  dependencies:\n    minimum_versions:\n      dep: \">=1.0.0\"\n",
        );
        let pkg = git_pkg("dep", "https://github.com/acme/dep", "1.2.0+git.commit.abcd123");

        let report = evaluate(&ctx, &config, &[pkg]).unwrap();
        assert!(!report.has_errors());
    }

    #[test]
    fn test_require_license_warns() {
        let (_tmp, ctx) = ctx();
        let config = config("rules:\n  security:\n    require_license: true\n");
        let pkg = git_pkg("nolicense", "https://github.com/acme/nolicense", "1.0.0");

        let report = evaluate(&ctx, &config, &[pkg]).unwrap();
        assert!(!report.has_errors());
        assert!(report.has_warnings());
        assert_eq!(report.violations[0].rule, "require_license");
        assert_eq!(report.exit_code(false), 2);
        assert_eq!(report.exit_code(true), 1);
    }

    #[test]
    fn test_postinstall_rules() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();

        // Install a spec that declares a postinstall script.
        let install = ctx.install_path("scripted");
        std::fs::create_dir_all(&install).unwrap();
        std::fs::write(
            install.join("Quay.toml"),
            "[package]\nname = \"scripted\"\nversion = \"1.0.0\"\n\n[scripts]\npostinstall = \"make\"\n",
        )
        .unwrap();

        let pkg = || git_pkg("scripted", "https://github.com/acme/scripted", "1.0.0");

        let block = config("rules:\n  security:\n    block_postinstall: true\n");
        let report = evaluate(&ctx, &block, &[pkg()]).unwrap();
        assert!(report.has_errors());
        assert_eq!(report.violations[0].rule, "block_postinstall");

        let audit = config("rules:\n  security:\n    audit_postinstall: true\n");
        let report = evaluate(&ctx, &audit, &[pkg()]).unwrap();
        assert!(!report.has_errors());
        assert_eq!(report.violations[0].rule, "audit_postinstall");
    }

    #[test]
    fn test_custom_rules() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  custom:\n    - name: no-forks\n      pattern: \"-FORK$\"\n      action: block\n      reason: prefer upstream\n    - name: beta-warning\n      pattern: \"^beta-\"\n      action: warn\n",
        );

        let fork = git_pkg("zlib-fork", "https://github.com/acme/zlib-fork", "1.0.0");
        let beta = git_pkg("beta-widget", "https://github.com/acme/beta-widget", "0.1.0");

        let report = evaluate(&ctx, &config, &[fork, beta]).unwrap();
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.violations[0].rule, "custom:no-forks");
        assert!(report.violations[0].message.contains("prefer upstream"));
        assert_eq!(report.violations[1].rule, "custom:beta-warning");
    }

    #[test]
    fn test_invalid_custom_pattern_is_fatal() {
        let (_tmp, ctx) = ctx();
        let config = config(
            "rules:\n  custom:\n    - name: broken\n      pattern: \"(unclosed\"\n      action: warn\n",
        );
        assert!(evaluate(&ctx, &config, &[]).is_err());
    }

    #[test]
    fn test_freshness_note() {
        let (_tmp, ctx) = ctx();
        let config = config("rules:\n  freshness:\n    max_age_days: 180\n");
        let report = evaluate(&ctx, &config, &[]).unwrap();
        assert!(!report.notes.is_empty());
        assert_eq!(report.exit_code(false), 0);
    }

    #[test]
    fn test_host_and_owner_extraction() {
        let (host, owner) = host_and_owner("https://GitHub.com/Acme/repo.git").unwrap();
        assert_eq!(host, "github.com");
        assert_eq!(owner.as_deref(), Some("Acme"));

        assert!(host_and_owner("not a url at all").is_none());
    }
}
