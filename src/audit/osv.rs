//! Vulnerability database client and advisory parsing.
//!
//! Speaks the OSV batch protocol: one POST with every uncached purl, one
//! result object per query in the same order. Severity resolution prefers a
//! `database_specific.severity` scalar, then any numeric CVSS score in the
//! `severity` array, then Unknown.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{Severity, Vulnerability};

/// Batch query endpoint.
pub const OSV_API_URL: &str = "https://api.osv.dev/v1/querybatch";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("quay/", env!("CARGO_PKG_VERSION"));

/// How much of an error body to keep in diagnostics.
const BODY_TRUNCATE: usize = 400;

#[derive(Debug, Serialize)]
struct QueryBatch<'a> {
    queries: Vec<Query<'a>>,
}

#[derive(Debug, Serialize)]
struct Query<'a> {
    package: QueryPackage<'a>,
}

#[derive(Debug, Serialize)]
struct QueryPackage<'a> {
    purl: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    vulns: Vec<RawVulnerability>,
}

/// The subset of an OSV advisory the parser reads. Unknown fields are
/// skipped for forward compatibility.
#[derive(Debug, Deserialize)]
struct RawVulnerability {
    id: String,

    #[serde(default)]
    summary: String,

    #[serde(default)]
    details: String,

    #[serde(default)]
    aliases: Vec<String>,

    #[serde(default)]
    references: Vec<RawReference>,

    #[serde(default)]
    severity: Vec<RawSeverity>,

    #[serde(default)]
    affected: Vec<RawAffected>,

    #[serde(default)]
    database_specific: Option<serde_json::Value>,

    #[serde(default)]
    published: Option<String>,

    #[serde(default)]
    modified: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawReference {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawSeverity {
    #[serde(default)]
    score: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawAffected {
    #[serde(default)]
    ranges: Vec<RawRange>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRange {
    #[serde(default)]
    events: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Blocking client for the vulnerability database.
pub struct OsvClient {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl OsvClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(OSV_API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(OsvClient {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Query the database for a batch of purls. The returned vector is
    /// parallel to `purls`.
    pub fn query_batch(&self, purls: &[String]) -> Result<Vec<Vec<Vulnerability>>> {
        if purls.is_empty() {
            return Ok(Vec::new());
        }

        let body = QueryBatch {
            queries: purls
                .iter()
                .map(|purl| Query {
                    package: QueryPackage { purl },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .with_context(|| format!("vulnerability database request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let truncated: String = body.chars().take(BODY_TRUNCATE).collect();
            bail!(
                "vulnerability database returned HTTP {}: {}",
                status,
                truncated
            );
        }

        let parsed: BatchResponse = response
            .json()
            .context("failed to parse vulnerability database response")?;

        let mut results: Vec<Vec<Vulnerability>> = parsed
            .results
            .into_iter()
            .map(|result| result.vulns.into_iter().map(parse_vulnerability).collect())
            .collect();

        // The protocol answers in request order; tolerate a short reply.
        results.resize_with(purls.len(), Vec::new);
        Ok(results)
    }
}

fn parse_vulnerability(raw: RawVulnerability) -> Vulnerability {
    let cvss_score = extract_cvss_score(&raw.severity);
    let severity = resolve_severity(&raw, cvss_score);

    let affected_versions = raw
        .affected
        .iter()
        .flat_map(|a| a.ranges.iter())
        .flat_map(|r| r.events.iter())
        .flat_map(|event| {
            event.iter().filter_map(|(key, value)| {
                value.as_str().map(|v| format!("{}: {}", key, v))
            })
        })
        .collect();

    Vulnerability {
        id: raw.id,
        summary: raw.summary,
        details: raw.details,
        severity,
        cvss_score,
        aliases: raw.aliases,
        references: raw
            .references
            .into_iter()
            .map(|r| r.url)
            .filter(|u| !u.is_empty())
            .collect(),
        published: parse_timestamp(raw.published.as_deref()),
        modified: parse_timestamp(raw.modified.as_deref()),
        affected_versions,
    }
}

fn resolve_severity(raw: &RawVulnerability, cvss_score: Option<f64>) -> Severity {
    if let Some(db) = &raw.database_specific {
        if let Some(label) = db.get("severity").and_then(|v| v.as_str()) {
            if let Ok(severity) = label.parse() {
                return severity;
            }
        }
    }

    match cvss_score {
        Some(score) => Severity::from_cvss(score),
        None => Severity::Unknown,
    }
}

/// Find a numeric CVSS score in the severity array. Scores arrive either as
/// JSON numbers or as numeric strings.
fn extract_cvss_score(severities: &[RawSeverity]) -> Option<f64> {
    severities.iter().find_map(|s| match &s.score {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
