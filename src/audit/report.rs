//! Audit report aggregation and rendering.
//!
//! Applies ignore rules and the minimum-severity filter to raw scan
//! results, tallies what remains, and decides the exit code against the
//! fail-above threshold.

use serde::Serialize;

use crate::audit::ignore::IgnoreRule;
use crate::audit::{PackageScanResult, Severity, Vulnerability};
use crate::util::shell::color_enabled;

/// Vulnerabilities attributed to one package, post-filtering.
#[derive(Debug, Clone, Serialize)]
pub struct PackageAudit {
    pub name: String,
    pub version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,

    pub vulnerabilities: Vec<Vulnerability>,
}

/// Counts per severity level.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub total_packages: usize,
    /// Packages that have a purl and were eligible for lookup.
    pub scanned_packages: usize,
    pub total_vulnerabilities: usize,
    pub ignored_count: usize,
    pub filtered_count: usize,
    pub severities: SeverityCounts,
}

/// The aggregate audit report.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub packages: Vec<PackageAudit>,
    pub summary: AuditSummary,

    #[serde(skip)]
    fail_above: Severity,
}

impl AuditReport {
    /// Build the report from raw scan results.
    pub fn build(
        results: &[PackageScanResult],
        ignores: &[IgnoreRule],
        min_severity: Option<Severity>,
        fail_above: Severity,
    ) -> Self {
        let active: Vec<&IgnoreRule> = ignores.iter().filter(|r| r.is_active()).collect();

        let mut ignored_count = 0;
        let mut filtered_count = 0;
        let mut severities = SeverityCounts::default();
        let mut total_vulnerabilities = 0;
        let scanned_packages = results.iter().filter(|r| r.purl.is_some()).count();

        let packages: Vec<PackageAudit> = results
            .iter()
            .map(|result| {
                let vulnerabilities: Vec<Vulnerability> = result
                    .vulnerabilities
                    .iter()
                    .filter(|vuln| {
                        if active.iter().any(|rule| rule.matches(vuln)) {
                            ignored_count += 1;
                            return false;
                        }
                        if let Some(min) = min_severity {
                            if vuln.severity < min {
                                filtered_count += 1;
                                return false;
                            }
                        }
                        true
                    })
                    .cloned()
                    .collect();

                for vuln in &vulnerabilities {
                    severities.record(vuln.severity);
                }
                total_vulnerabilities += vulnerabilities.len();

                PackageAudit {
                    name: result.package.name().to_string(),
                    version: result.package.semver_component(),
                    purl: result.purl.clone(),
                    vulnerabilities,
                }
            })
            .collect();

        AuditReport {
            packages,
            summary: AuditSummary {
                total_packages: results.len(),
                scanned_packages,
                total_vulnerabilities,
                ignored_count,
                filtered_count,
                severities,
            },
            fail_above,
        }
    }

    /// 1 when any remaining vulnerability reaches the fail-above threshold.
    pub fn exit_code(&self) -> i32 {
        let failing = self
            .packages
            .iter()
            .flat_map(|p| p.vulnerabilities.iter())
            .any(|v| v.severity >= self.fail_above);
        if failing {
            1
        } else {
            0
        }
    }

    /// Pretty JSON for `--format=json`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering.
    pub fn render_terminal(&self) -> String {
        let mut out = String::new();

        for pkg in &self.packages {
            if pkg.vulnerabilities.is_empty() {
                continue;
            }
            out.push_str(&format!("{} v{}\n", pkg.name, pkg.version));
            for vuln in &pkg.vulnerabilities {
                out.push_str(&format!(
                    "  {} {} {}\n",
                    severity_label(vuln.severity),
                    vuln.id,
                    vuln.summary
                ));
                for range in &vuln.affected_versions {
                    out.push_str(&format!("      {}\n", range));
                }
            }
        }

        let s = &self.summary;
        out.push_str(&format!(
            "\n{} vulnerabilit{} across {} scanned package(s)",
            s.total_vulnerabilities,
            if s.total_vulnerabilities == 1 { "y" } else { "ies" },
            s.scanned_packages
        ));
        if s.total_vulnerabilities > 0 {
            out.push_str(&format!(
                " ({} critical, {} high, {} medium, {} low, {} unknown)",
                s.severities.critical,
                s.severities.high,
                s.severities.medium,
                s.severities.low,
                s.severities.unknown
            ));
        }
        if s.ignored_count > 0 {
            out.push_str(&format!(", {} ignored", s.ignored_count));
        }
        if s.filtered_count > 0 {
            out.push_str(&format!(", {} below severity filter", s.filtered_count));
        }
        out.push('\n');
        out
    }
}

fn severity_label(severity: Severity) -> String {
    if !color_enabled() {
        return format!("[{}]", severity);
    }
    let code = match severity {
        Severity::Critical => "\x1b[1;31m",
        Severity::High => "\x1b[31m",
        Severity::Medium => "\x1b[33m",
        Severity::Low => "\x1b[36m",
        Severity::Unknown => "\x1b[37m",
    };
    format!("{}[{}]\x1b[0m", code, severity)
}
