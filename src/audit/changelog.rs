//! Change audit trail.
//!
//! Every successful lockfile write during install/update appends one entry
//! to `.quay/audit/changelog.json`: who changed the dependency set, what
//! changed, and a digest of the new lockfile. The log is append-only; a
//! corrupt file is logged and replaced rather than aborting the operation
//! that already succeeded.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{Change, ChangeStatus};
use crate::util::context::ProjectContext;
use crate::util::fs::write_atomic;
use crate::util::hash;

/// The operation that mutated the lockfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Update,
}

/// An added or removed package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
}

/// An updated package with both versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageUpdate {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// The changes recorded in one entry (Unchanged omitted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub added: Vec<PackageRef>,

    #[serde(default)]
    pub removed: Vec<PackageRef>,

    #[serde(default)]
    pub updated: Vec<PackageUpdate>,
}

impl ChangeSet {
    /// Derive a change set from a lockfile diff.
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut set = ChangeSet::default();
        for change in changes {
            match change.status {
                ChangeStatus::Added => set.added.push(PackageRef {
                    name: change.name.clone(),
                    version: change.to_version.clone().unwrap_or_default(),
                }),
                ChangeStatus::Removed => set.removed.push(PackageRef {
                    name: change.name.clone(),
                    version: change.from_version.clone().unwrap_or_default(),
                }),
                ChangeStatus::Updated => set.updated.push(PackageUpdate {
                    name: change.name.clone(),
                    from: change.from_version.clone().unwrap_or_default(),
                    to: change.to_version.clone().unwrap_or_default(),
                }),
                ChangeStatus::Unchanged => {}
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// One changelog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub user: String,
    pub changes: ChangeSet,
    pub lockfile_checksum: String,
}

/// Append an entry for a completed lockfile write.
pub fn append(
    ctx: &ProjectContext,
    action: Action,
    changes: ChangeSet,
    new_lockfile_bytes: &[u8],
) -> Result<()> {
    let entry = ChangeLogEntry {
        timestamp: Utc::now(),
        action,
        user: detect_user(ctx.root()),
        changes,
        lockfile_checksum: hash::prefixed_sha256(new_lockfile_bytes),
    };

    let path = ctx.changelog_path();
    let mut entries = read_entries(&path);
    entries.push(entry);

    let content = serde_json::to_vec_pretty(&entries)?;
    write_atomic(&path, &content)
        .with_context(|| format!("failed to write changelog: {}", path.display()))
}

/// Read the changelog, treating a corrupt file as empty (the history resets
/// but the operation that produced it is preserved).
pub fn read(ctx: &ProjectContext) -> Vec<ChangeLogEntry> {
    read_entries(&ctx.changelog_path())
}

fn read_entries(path: &Path) -> Vec<ChangeLogEntry> {
    if !path.exists() {
        return Vec::new();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    "changelog {} is corrupt ({}); starting a fresh log",
                    path.display(),
                    err
                );
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!("failed to read changelog {}: {}", path.display(), err);
            Vec::new()
        }
    }
}

/// Who is making the change: VCS identity, then environment, then unknown.
fn detect_user(project_root: &Path) -> String {
    if let Some(email) = git_user_email(project_root) {
        return email;
    }

    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn git_user_email(project_root: &Path) -> Option<String> {
    let config = match git2::Repository::discover(project_root) {
        Ok(repo) => repo.config().ok()?,
        Err(_) => git2::Config::open_default().ok()?,
    };
    config.get_string("user.email").ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn change(name: &str, status: ChangeStatus, from: Option<&str>, to: Option<&str>) -> Change {
        Change {
            name: name.into(),
            status,
            from_version: from.map(String::from),
            to_version: to.map(String::from),
            from_commit: None,
            to_commit: None,
            from_source: None,
            to_source: None,
            from_license: None,
            to_license: None,
            from_resolver: None,
            to_resolver: None,
        }
    }

    #[test]
    fn test_changeset_from_changes_omits_unchanged() {
        let changes = vec![
            change("a", ChangeStatus::Added, None, Some("1.0.0")),
            change("b", ChangeStatus::Removed, Some("0.9.0"), None),
            change("c", ChangeStatus::Updated, Some("1.0.0"), Some("1.1.0")),
            change("d", ChangeStatus::Unchanged, Some("2.0.0"), Some("2.0.0")),
        ];
        let set = ChangeSet::from_changes(&changes);
        assert_eq!(set.added.len(), 1);
        assert_eq!(set.removed.len(), 1);
        assert_eq!(set.updated.len(), 1);
        assert_eq!(set.updated[0].from, "1.0.0");
        assert_eq!(set.updated[0].to, "1.1.0");
    }

    #[test]
    fn test_append_grows_log() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();

        let set = ChangeSet {
            added: vec![PackageRef {
                name: "a".into(),
                version: "1.0.0".into(),
            }],
            ..Default::default()
        };

        append(&ctx, Action::Install, set.clone(), b"lockfile one").unwrap();
        append(&ctx, Action::Update, set, b"lockfile two").unwrap();

        let entries = read(&ctx);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, Action::Install);
        assert_eq!(entries[1].action, Action::Update);
        assert!(entries[0].timestamp <= entries[1].timestamp);
        assert_ne!(entries[0].lockfile_checksum, entries[1].lockfile_checksum);
        assert!(entries[0].lockfile_checksum.starts_with("sha256:"));
    }

    #[test]
    fn test_corrupt_log_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let ctx = ProjectContext::at(tmp.path()).unwrap();

        std::fs::create_dir_all(ctx.audit_dir()).unwrap();
        std::fs::write(ctx.changelog_path(), "{{{ not json").unwrap();

        append(&ctx, Action::Install, ChangeSet::default(), b"bytes").unwrap();
        assert_eq!(read(&ctx).len(), 1);
    }

    #[test]
    fn test_user_is_never_empty() {
        let tmp = TempDir::new().unwrap();
        let user = detect_user(tmp.path());
        assert!(!user.is_empty());
    }
}
