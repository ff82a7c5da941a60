//! Audit ignore rules.
//!
//! `.quay-audit-ignore.yml` lists advisory ids to suppress, each with an
//! optional reason and expiry date. An expired rule is inactive and its
//! vulnerabilities resurface.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::Vulnerability;
use crate::util::context::ProjectContext;

/// One suppression rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Advisory id this rule matches (by id or any alias).
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Expiry date (YYYY-MM-DD); absent means never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<NaiveDate>,
}

impl IgnoreRule {
    /// Active iff not yet expired.
    pub fn is_active(&self) -> bool {
        match self.expires {
            Some(date) => date >= Utc::now().date_naive(),
            None => true,
        }
    }

    /// Whether this rule suppresses the given vulnerability.
    pub fn matches(&self, vuln: &Vulnerability) -> bool {
        vuln.id == self.id || vuln.aliases.iter().any(|a| *a == self.id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct IgnoreFile {
    #[serde(default)]
    ignores: Vec<IgnoreRule>,
}

/// Load ignore rules from the default or an explicit path. A missing file
/// yields no rules.
pub fn load(ctx: &ProjectContext, explicit: Option<&Path>) -> Result<Vec<IgnoreRule>> {
    let default = ctx.audit_ignore_path();
    let path = explicit.unwrap_or(&default);

    if !path.exists() {
        if explicit.is_some() {
            anyhow::bail!("ignore file not found: {}", path.display());
        }
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ignore file: {}", path.display()))?;
    let file: IgnoreFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse ignore file: {}", path.display()))?;

    Ok(file.ignores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Severity;
    use chrono::Duration;
    use tempfile::TempDir;

    fn vuln(id: &str, aliases: &[&str]) -> Vulnerability {
        Vulnerability {
            id: id.into(),
            summary: String::new(),
            details: String::new(),
            severity: Severity::Low,
            cvss_score: None,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            references: vec![],
            published: None,
            modified: None,
            affected_versions: vec![],
        }
    }

    #[test]
    fn test_matches_id_and_alias() {
        let rule = IgnoreRule {
            id: "CVE-2024-0001".into(),
            reason: None,
            expires: None,
        };
        assert!(rule.matches(&vuln("CVE-2024-0001", &[])));
        assert!(rule.matches(&vuln("GHSA-xxxx", &["CVE-2024-0001"])));
        assert!(!rule.matches(&vuln("CVE-2024-0002", &[])));
    }

    #[test]
    fn test_expiry() {
        let yesterday = (Utc::now() - Duration::days(1)).date_naive();
        let tomorrow = (Utc::now() + Duration::days(1)).date_naive();

        let expired = IgnoreRule {
            id: "X".into(),
            reason: None,
            expires: Some(yesterday),
        };
        let live = IgnoreRule {
            id: "X".into(),
            reason: None,
            expires: Some(tomorrow),
        };
        let forever = IgnoreRule {
            id: "X".into(),
            reason: None,
            expires: None,
        };

        assert!(!expired.is_active());
        assert!(live.is_active());
        assert!(forever.is_active());
    }

    #[test]
    fn test_load_file() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        std::fs::write(
            ctx.audit_ignore_path(),
            "ignores:\n  - id: ADV-1\n    reason: accepted risk\n    expires: 2099-01-01\n  - id: ADV-2\n",
        )
        .unwrap();

        let rules = load(&ctx, None).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].reason.as_deref(), Some("accepted risk"));
        assert!(rules[0].is_active());
    }

    #[test]
    fn test_missing_default_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        assert!(load(&ctx, None).unwrap().is_empty());
    }

    #[test]
    fn test_missing_explicit_file_errors() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        assert!(load(&ctx, Some(&tmp.path().join("nope.yml"))).is_err());
    }
}
