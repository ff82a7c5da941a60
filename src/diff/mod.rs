//! Lockfile diffing.
//!
//! Computes an ordered change set between two package lists, splitting
//! pinned-commit versions so a force-pushed tag shows up as an update even
//! when the semver component is unchanged.

pub mod differ;
pub mod refspec;
pub mod render;

use serde::{Deserialize, Serialize};

/// What happened to a package between two lockfile states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Removed,
    Updated,
    Unchanged,
}

impl ChangeStatus {
    /// Ordering rank for report output.
    pub fn rank(&self) -> u8 {
        match self {
            ChangeStatus::Added => 0,
            ChangeStatus::Updated => 1,
            ChangeStatus::Removed => 2,
            ChangeStatus::Unchanged => 3,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "+",
            ChangeStatus::Removed => "-",
            ChangeStatus::Updated => "~",
            ChangeStatus::Unchanged => "=",
        }
    }
}

/// One package's change between two lockfile states.
///
/// The `from_*` fields describe the old side, `to_*` the new side; each is
/// absent when the package does not exist on that side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Change {
    pub name: String,
    pub status: ChangeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_commit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_license: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_resolver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_resolver: Option<String>,
}

impl Change {
    /// Whether the license differs between the two sides.
    pub fn license_changed(&self) -> bool {
        self.from_license != self.to_license
    }
}

pub use differ::{diff, diff_with};
pub use render::DiffReport;
