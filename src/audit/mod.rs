//! Vulnerability auditing and the change audit trail.
//!
//! Locked packages are mapped to purls and batched against a public
//! vulnerability database, with a per-purl filesystem cache and an offline
//! mode. The changelog submodule persists a timestamped record of every
//! lockfile mutation.

pub mod cache;
pub mod changelog;
pub mod ignore;
pub mod osv;
pub mod report;
pub mod scanner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::package::Package;

/// Vulnerability severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map a CVSS base score (0.0..10.0) to a severity level.
    pub fn from_cvss(score: f64) -> Self {
        match score {
            s if s >= 9.0 => Severity::Critical,
            s if s >= 7.0 => Severity::High,
            s if s >= 4.0 => Severity::Medium,
            s if s >= 0.0 => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Severity::Unknown),
            "low" => Ok(Severity::Low),
            "medium" | "moderate" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vulnerability advisory as parsed from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_score: Option<f64>,

    /// Alternate identifiers (CVE, GHSA, ...).
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub references: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,

    /// Opaque range descriptors (`introduced: X` / `fixed: Y`), preserved
    /// verbatim for display.
    #[serde(default)]
    pub affected_versions: Vec<String>,
}

/// Scan outcome for one package: its purl (absent for path dependencies)
/// and any vulnerabilities the database reported.
#[derive(Debug, Clone)]
pub struct PackageScanResult {
    pub package: Package,
    pub purl: Option<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}
