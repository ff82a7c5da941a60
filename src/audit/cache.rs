//! Per-purl vulnerability cache.
//!
//! Each purl gets one JSON file under `.quay/audit/cache/`, named by the
//! SHA-256 of the purl. Validity is judged by file modification time; a
//! stale or unreadable entry is simply a miss.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::audit::Vulnerability;
use crate::util::context::ProjectContext;
use crate::util::fs::write_atomic;
use crate::util::hash::sha256_str;

/// Entries older than this are invalid.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache file for a purl.
pub fn entry_path(ctx: &ProjectContext, purl: &str) -> PathBuf {
    ctx.audit_cache_dir().join(format!("{}.json", sha256_str(purl)))
}

/// Look up a purl, honoring the TTL.
pub fn lookup(ctx: &ProjectContext, purl: &str) -> Option<Vec<Vulnerability>> {
    let path = entry_path(ctx, purl);

    let metadata = path.metadata().ok()?;
    let age = metadata.modified().ok()?.elapsed().ok()?;
    if age > CACHE_TTL {
        tracing::debug!("cache entry for {} expired ({}s old)", purl, age.as_secs());
        return None;
    }

    let content = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(vulns) => Some(vulns),
        Err(err) => {
            tracing::debug!("discarding unreadable cache entry {}: {}", path.display(), err);
            None
        }
    }
}

/// Persist the result for a purl (possibly an empty list).
pub fn store(ctx: &ProjectContext, purl: &str, vulns: &[Vulnerability]) -> Result<()> {
    let path = entry_path(ctx, purl);
    let content = serde_json::to_vec_pretty(vulns)?;
    write_atomic(&path, &content)
        .with_context(|| format!("failed to write audit cache entry for {}", purl))
}

/// Remove every cached entry (`--update-db`).
pub fn clear(ctx: &ProjectContext) -> Result<()> {
    let dir = ctx.audit_cache_dir();
    if dir.exists() {
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to clear audit cache: {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Severity;
    use tempfile::TempDir;

    fn vuln(id: &str) -> Vulnerability {
        Vulnerability {
            id: id.into(),
            summary: String::new(),
            details: String::new(),
            severity: Severity::High,
            cvss_score: None,
            aliases: vec![],
            references: vec![],
            published: None,
            modified: None,
            affected_versions: vec![],
        }
    }

    #[test]
    fn test_store_and_lookup() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let purl = "pkg:github/acme/lib@1.0.0";

        assert!(lookup(&ctx, purl).is_none());

        store(&ctx, purl, &[vuln("ADV-1")]).unwrap();
        let cached = lookup(&ctx, purl).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "ADV-1");
    }

    #[test]
    fn test_empty_result_is_cached() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let purl = "pkg:github/acme/clean@1.0.0";

        store(&ctx, purl, &[]).unwrap();
        assert_eq!(lookup(&ctx, purl).unwrap().len(), 0);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let purl = "pkg:github/acme/bad@1.0.0";

        let path = entry_path(&ctx, purl);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(lookup(&ctx, purl).is_none());
    }

    #[test]
    fn test_clear() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let purl = "pkg:github/acme/lib@1.0.0";

        store(&ctx, purl, &[]).unwrap();
        clear(&ctx).unwrap();
        assert!(lookup(&ctx, purl).is_none());
    }

    #[test]
    fn test_entry_names_are_hashed() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();
        let path = entry_path(&ctx, "pkg:github/acme/lib@1.0.0");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), 64 + ".json".len());
    }
}
