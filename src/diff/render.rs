//! Diff presentation: terminal, JSON, and markdown.

use serde::Serialize;

use crate::diff::{Change, ChangeStatus};
use crate::util::shell::color_enabled;

/// A labelled diff ready for rendering.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub from_label: String,
    pub to_label: String,
    pub changes: Vec<Change>,
}

#[derive(Debug, Serialize)]
struct JsonDiff<'a> {
    from_label: &'a str,
    to_label: &'a str,
    changes: JsonChanges<'a>,
    summary: JsonSummary,
}

#[derive(Debug, Serialize)]
struct JsonChanges<'a> {
    added: Vec<&'a Change>,
    removed: Vec<&'a Change>,
    updated: Vec<&'a Change>,
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    added: usize,
    removed: usize,
    updated: usize,
    unchanged: usize,
    license_change_count: usize,
}

impl DiffReport {
    pub fn new(from_label: impl Into<String>, to_label: impl Into<String>, changes: Vec<Change>) -> Self {
        DiffReport {
            from_label: from_label.into(),
            to_label: to_label.into(),
            changes,
        }
    }

    fn count(&self, status: ChangeStatus) -> usize {
        self.changes.iter().filter(|c| c.status == status).count()
    }

    /// Whether anything actually changed.
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.status != ChangeStatus::Unchanged)
    }

    /// Terminal rendering with status glyphs.
    pub fn render_terminal(&self, show_unchanged: bool) -> String {
        let mut out = format!("Changes from {} to {}:\n", self.from_label, self.to_label);

        for change in &self.changes {
            if change.status == ChangeStatus::Unchanged && !show_unchanged {
                continue;
            }
            out.push_str(&format!(
                "  {} {} {}\n",
                glyph(change.status),
                change.name,
                describe(change)
            ));
        }

        if !self.has_changes() {
            out.push_str("  no changes\n");
        }

        out.push_str(&format!(
            "\n{} added, {} updated, {} removed, {} unchanged\n",
            self.count(ChangeStatus::Added),
            self.count(ChangeStatus::Updated),
            self.count(ChangeStatus::Removed),
            self.count(ChangeStatus::Unchanged),
        ));
        out
    }

    /// JSON rendering with grouped changes and summary counts.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let by_status = |status: ChangeStatus| -> Vec<&Change> {
            self.changes.iter().filter(|c| c.status == status).collect()
        };

        let doc = JsonDiff {
            from_label: &self.from_label,
            to_label: &self.to_label,
            changes: JsonChanges {
                added: by_status(ChangeStatus::Added),
                removed: by_status(ChangeStatus::Removed),
                updated: by_status(ChangeStatus::Updated),
            },
            summary: JsonSummary {
                added: self.count(ChangeStatus::Added),
                removed: self.count(ChangeStatus::Removed),
                updated: self.count(ChangeStatus::Updated),
                unchanged: self.count(ChangeStatus::Unchanged),
                license_change_count: self
                    .changes
                    .iter()
                    .filter(|c| c.status != ChangeStatus::Unchanged && c.license_changed())
                    .count(),
            },
        };

        serde_json::to_string_pretty(&doc)
    }

    /// Markdown table suitable for pull-request descriptions.
    pub fn render_markdown(&self) -> String {
        let mut out = format!(
            "## Dependency changes ({} → {})\n\n",
            self.from_label, self.to_label
        );

        if !self.has_changes() {
            out.push_str("No dependency changes.\n");
            return out;
        }

        out.push_str("| Status | Package | From | To |\n");
        out.push_str("|--------|---------|------|----|\n");
        for change in &self.changes {
            if change.status == ChangeStatus::Unchanged {
                continue;
            }
            out.push_str(&format!(
                "| {:?} | {} | {} | {} |\n",
                change.status,
                change.name,
                side(change.from_version.as_deref(), change.from_commit.as_deref()),
                side(change.to_version.as_deref(), change.to_commit.as_deref()),
            ));
        }
        out
    }
}

fn side(version: Option<&str>, commit: Option<&str>) -> String {
    match (version, commit) {
        (Some(v), Some(c)) => format!("{} ({})", v, short(c)),
        (Some(v), None) => v.to_string(),
        (None, _) => "—".to_string(),
    }
}

fn short(commit: &str) -> &str {
    &commit[..commit.len().min(8)]
}

fn describe(change: &Change) -> String {
    match change.status {
        ChangeStatus::Added => side(change.to_version.as_deref(), change.to_commit.as_deref()),
        ChangeStatus::Removed => side(change.from_version.as_deref(), change.from_commit.as_deref()),
        ChangeStatus::Updated | ChangeStatus::Unchanged => {
            let mut text = format!(
                "{} -> {}",
                side(change.from_version.as_deref(), change.from_commit.as_deref()),
                side(change.to_version.as_deref(), change.to_commit.as_deref()),
            );
            if change.license_changed() {
                text.push_str(&format!(
                    " [license: {} -> {}]",
                    change.from_license.as_deref().unwrap_or("none"),
                    change.to_license.as_deref().unwrap_or("none"),
                ));
            }
            text
        }
    }
}

fn glyph(status: ChangeStatus) -> String {
    if !color_enabled() {
        return status.glyph().to_string();
    }
    let code = match status {
        ChangeStatus::Added => "\x1b[32m",
        ChangeStatus::Removed => "\x1b[31m",
        ChangeStatus::Updated => "\x1b[33m",
        ChangeStatus::Unchanged => "\x1b[37m",
    };
    format!("{}{}\x1b[0m", code, status.glyph())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str, status: ChangeStatus) -> Change {
        Change {
            name: name.into(),
            status,
            from_version: Some("1.0.0".into()),
            to_version: Some("1.1.0".into()),
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
    fn test_json_groups_changes() {
        let report = DiffReport::new(
            "old",
            "new",
            vec![
                change("a", ChangeStatus::Added),
                change("b", ChangeStatus::Updated),
                change("c", ChangeStatus::Unchanged),
            ],
        );
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["changes"]["added"][0]["name"], "a");
        assert_eq!(json["changes"]["updated"][0]["name"], "b");
        assert_eq!(json["summary"]["unchanged"], 1);
    }

    #[test]
    fn test_license_change_count() {
        let mut c = change("a", ChangeStatus::Updated);
        c.from_license = Some("MIT".into());
        c.to_license = Some("GPL-3.0-only".into());
        let report = DiffReport::new("old", "new", vec![c]);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["license_change_count"], 1);
    }

    #[test]
    fn test_terminal_hides_unchanged_by_default() {
        let report = DiffReport::new(
            "old",
            "new",
            vec![change("a", ChangeStatus::Updated), change("b", ChangeStatus::Unchanged)],
        );
        let text = report.render_terminal(false);
        assert!(text.contains("a"));
        assert!(!text.contains("  = b"));

        let text = report.render_terminal(true);
        assert!(text.contains("b"));
    }

    #[test]
    fn test_markdown_table() {
        let report = DiffReport::new("old", "new", vec![change("a", ChangeStatus::Updated)]);
        let md = report.render_markdown();
        assert!(md.contains("| Status | Package |"));
        assert!(md.contains("| Updated | a |"));
    }

    #[test]
    fn test_markdown_no_changes() {
        let report = DiffReport::new("old", "new", vec![change("a", ChangeStatus::Unchanged)]);
        assert!(report.render_markdown().contains("No dependency changes."));
    }
}
