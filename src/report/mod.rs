//! The unified compliance report.
//!
//! Composes SBOM, vulnerability audit, licenses, policy, integrity, and
//! change history into one artifact with a computed summary and optional
//! attestation. Every section degrades gracefully: a collector failure logs
//! a warning and records the section as absent.

pub mod compose;
pub mod render;
pub mod sbom;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::report::SeverityCounts;

/// Report schema version.
pub const REPORT_VERSION: &str = "1.0";

/// The composed report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub version: String,
    pub generated_at: DateTime<Utc>,

    /// Tool identifier and version.
    pub generator: String,

    pub project: ProjectInfo,
    pub summary: Summary,
    pub sections: Sections,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,

    /// Path of a detached signature over the rendered report, when one was
    /// produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
    pub language_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_dependencies: usize,
    pub direct_dependencies: usize,
    pub transitive_dependencies: usize,

    pub vulnerabilities: SeverityCounts,

    /// "pass" | "unavailable"
    pub license_status: String,
    pub policy_status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_verified: Option<bool>,

    /// "pass" | "action_required" | "fail"
    pub overall_status: String,
}

/// Collected section payloads; `None` marks a section that could not be
/// produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Sections {
    pub sbom: Option<serde_json::Value>,
    pub vulnerability_audit: Option<serde_json::Value>,
    pub license_audit: Option<serde_json::Value>,
    pub policy_compliance: Option<serde_json::Value>,
    pub integrity: Option<serde_json::Value>,
    pub change_history: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attestation {
    pub reviewer: String,
    pub reviewed_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Summary {
    /// The overall verdict.
    ///
    /// Fail on any critical/high vulnerability or failed section; require
    /// action on medium vulnerabilities, section warnings, or unverified
    /// integrity; pass otherwise.
    pub fn derive_overall_status(&mut self) {
        let fail = self.vulnerabilities.critical > 0
            || self.vulnerabilities.high > 0
            || self.license_status == "fail"
            || self.policy_status == "fail";

        let action_required = !fail
            && (self.vulnerabilities.medium > 0
                || self.license_status == "warning"
                || self.policy_status == "warning"
                || self.integrity_verified == Some(false));

        self.overall_status = if fail {
            "fail".to_string()
        } else if action_required {
            "action_required".to_string()
        } else {
            "pass".to_string()
        };
    }
}
