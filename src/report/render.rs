//! Report rendering, archiving, and the optional detached signature.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::report::ReportData;
use crate::util::context::ProjectContext;
use crate::util::diagnostic::UnknownFormatError;
use crate::util::fs::write_atomic_string;
use crate::util::process::ProcessBuilder;
use crate::util::{Shell, Status};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => ".json",
            ReportFormat::Html => ".html",
            ReportFormat::Markdown => ".md",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(UnknownFormatError {
                format: other.to_string(),
                supported: "json, html, markdown".to_string(),
            }),
        }
    }
}

/// Render the report in the requested format.
pub fn render(report: &ReportData, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => render_json(report),
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Html => Ok(render_html(report)),
    }
}

fn render_json(report: &ReportData) -> Result<String> {
    let wrapped = serde_json::json!({ "report": report });
    Ok(serde_json::to_string_pretty(&wrapped)?)
}

fn render_markdown(report: &ReportData) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Compliance report: {} {}\n\n",
        report.project.name, report.project.version
    ));
    out.push_str(&format!(
        "Generated {} by {}\n\n",
        report.generated_at.to_rfc3339(),
        report.generator
    ));

    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    let s = &report.summary;
    out.push_str(&format!("| Overall status | **{}** |\n", s.overall_status));
    out.push_str(&format!("| Dependencies | {} ({} direct, {} transitive) |\n",
        s.total_dependencies, s.direct_dependencies, s.transitive_dependencies));
    out.push_str(&format!(
        "| Vulnerabilities | {} critical, {} high, {} medium, {} low, {} unknown |\n",
        s.vulnerabilities.critical,
        s.vulnerabilities.high,
        s.vulnerabilities.medium,
        s.vulnerabilities.low,
        s.vulnerabilities.unknown
    ));
    out.push_str(&format!("| License audit | {} |\n", s.license_status));
    out.push_str(&format!("| Policy compliance | {} |\n", s.policy_status));
    out.push_str(&format!(
        "| Integrity verified | {} |\n",
        match s.integrity_verified {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unavailable",
        }
    ));

    out.push_str("\n## Sections\n\n");
    out.push_str("| Section | Collected |\n|---------|-----------|\n");
    for (name, value) in [
        ("sbom", &report.sections.sbom),
        ("vulnerability_audit", &report.sections.vulnerability_audit),
        ("license_audit", &report.sections.license_audit),
        ("policy_compliance", &report.sections.policy_compliance),
        ("integrity", &report.sections.integrity),
        ("change_history", &report.sections.change_history),
    ] {
        out.push_str(&format!(
            "| {} | {} |\n",
            name,
            if value.is_some() { "yes" } else { "no" }
        ));
    }

    if let Some(attestation) = &report.attestation {
        out.push_str(&format!(
            "\n## Attestation\n\nReviewed by {} at {}\n",
            attestation.reviewer,
            attestation.reviewed_at.to_rfc3339()
        ));
    }

    out
}

/// Embedded HTML template; `{{NAME}}` placeholders are substituted with
/// escaped values.
const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Compliance report: {{PROJECT_NAME}} {{PROJECT_VERSION}}</title>
<style>
  body { font-family: sans-serif; margin: 2rem auto; max-width: 60rem; }
  table { border-collapse: collapse; margin: 1rem 0; }
  th, td { border: 1px solid #ccc; padding: 0.4rem 0.8rem; text-align: left; }
  .status-pass { color: #1a7f37; font-weight: bold; }
  .status-action_required { color: #9a6700; font-weight: bold; }
  .status-fail { color: #cf222e; font-weight: bold; }
</style>
</head>
<body>
<h1>Compliance report: {{PROJECT_NAME}} {{PROJECT_VERSION}}</h1>
<p>Generated {{GENERATED_AT}} by {{GENERATOR}}</p>
<h2>Summary</h2>
<p>Overall status: <span class="status-{{OVERALL_STATUS}}">{{OVERALL_STATUS}}</span></p>
<table>
<tr><th>Metric</th><th>Value</th></tr>
<tr><td>Dependencies</td><td>{{DEPENDENCY_COUNTS}}</td></tr>
<tr><td>Vulnerabilities</td><td>{{VULNERABILITY_COUNTS}}</td></tr>
<tr><td>License audit</td><td>{{LICENSE_STATUS}}</td></tr>
<tr><td>Policy compliance</td><td>{{POLICY_STATUS}}</td></tr>
<tr><td>Integrity verified</td><td>{{INTEGRITY}}</td></tr>
</table>
<h2>Sections</h2>
<table>
<tr><th>Section</th><th>Collected</th></tr>
{{SECTION_ROWS}}
</table>
{{ATTESTATION}}
</body>
</html>
"#;

fn render_html(report: &ReportData) -> String {
    let s = &report.summary;

    let section_rows: String = [
        ("sbom", report.sections.sbom.is_some()),
        (
            "vulnerability_audit",
            report.sections.vulnerability_audit.is_some(),
        ),
        ("license_audit", report.sections.license_audit.is_some()),
        (
            "policy_compliance",
            report.sections.policy_compliance.is_some(),
        ),
        ("integrity", report.sections.integrity.is_some()),
        ("change_history", report.sections.change_history.is_some()),
    ]
    .iter()
    .map(|(name, present)| {
        format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            name,
            if *present { "yes" } else { "no" }
        )
    })
    .collect();

    let attestation = match &report.attestation {
        Some(a) => format!(
            "<h2>Attestation</h2>\n<p>Reviewed by {} at {}</p>",
            escape(&a.reviewer),
            escape(&a.reviewed_at.to_rfc3339())
        ),
        None => String::new(),
    };

    HTML_TEMPLATE
        .replace("{{PROJECT_NAME}}", &escape(&report.project.name))
        .replace("{{PROJECT_VERSION}}", &escape(&report.project.version))
        .replace("{{GENERATED_AT}}", &escape(&report.generated_at.to_rfc3339()))
        .replace("{{GENERATOR}}", &escape(&report.generator))
        .replace("{{OVERALL_STATUS}}", &escape(&s.overall_status))
        .replace(
            "{{DEPENDENCY_COUNTS}}",
            &escape(&format!(
                "{} ({} direct, {} transitive)",
                s.total_dependencies, s.direct_dependencies, s.transitive_dependencies
            )),
        )
        .replace(
            "{{VULNERABILITY_COUNTS}}",
            &escape(&format!(
                "{} critical, {} high, {} medium, {} low",
                s.vulnerabilities.critical,
                s.vulnerabilities.high,
                s.vulnerabilities.medium,
                s.vulnerabilities.low
            )),
        )
        .replace("{{LICENSE_STATUS}}", &escape(&s.license_status))
        .replace("{{POLICY_STATUS}}", &escape(&s.policy_status))
        .replace(
            "{{INTEGRITY}}",
            match s.integrity_verified {
                Some(true) => "yes",
                Some(false) => "no",
                None => "unavailable",
            },
        )
        .replace("{{SECTION_ROWS}}", &section_rows)
        .replace("{{ATTESTATION}}", &attestation)
}

/// Minimal HTML escaping for user-provided strings.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Write the rendered report, archive a copy, and optionally sign.
pub fn write_report(
    ctx: &ProjectContext,
    shell: &Shell,
    content: &str,
    output: Option<&Path>,
    format: ReportFormat,
    sign: bool,
) -> Result<()> {
    let Some(output) = output else {
        shell.print(content);
        return Ok(());
    };

    write_atomic_string(output, content)
        .with_context(|| format!("failed to write report: {}", output.display()))?;
    shell.status(Status::Generated, output.display().to_string());

    match archive(ctx, output, format) {
        Ok(archived) => tracing::debug!(
            "archived report to {}",
            crate::util::fs::relative_path(ctx.root(), &archived).display()
        ),
        Err(err) => shell.warn(format!("failed to archive report: {:#}", err)),
    }

    if sign {
        match sign_detached(output) {
            Ok(signature_path) => {
                shell.status(Status::Generated, signature_path.display().to_string())
            }
            Err(err) => shell.warn(format!("failed to sign report: {:#}", err)),
        }
    }

    Ok(())
}

/// Copy the report to the timestamped archive directory.
fn archive(ctx: &ProjectContext, output: &Path, format: ReportFormat) -> Result<PathBuf> {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let archived = ctx.reports_dir().join(format!(
        "{}-{}{}",
        stem,
        Utc::now().format("%Y%m%d-%H%M%S"),
        format.extension()
    ));

    crate::util::fs::ensure_dir(&ctx.reports_dir())?;
    std::fs::copy(output, &archived)
        .with_context(|| format!("failed to copy report to {}", archived.display()))?;
    Ok(archived)
}

/// Produce `<output>.sig` with an external signer.
fn sign_detached(output: &Path) -> Result<PathBuf> {
    let signature_path = PathBuf::from(format!("{}.sig", output.display()));

    ProcessBuilder::new("gpg")
        .arg("--batch")
        .arg("--yes")
        .arg("--detach-sign")
        .arg("--output")
        .arg(&signature_path)
        .arg(output)
        .exec_with_output()?;

    Ok(signature_path)
}
