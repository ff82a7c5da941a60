//! The diff computation.

use std::collections::BTreeMap;

use crate::core::package::Package;
use crate::diff::{Change, ChangeStatus};

/// Diff two package lists without license information.
pub fn diff(from: &[Package], to: &[Package]) -> Vec<Change> {
    diff_with(from, to, |_| None)
}

/// Diff two package lists. `license_of` supplies each package's license
/// (from its spec) when the caller has one available.
pub fn diff_with(
    from: &[Package],
    to: &[Package],
    license_of: impl Fn(&Package) -> Option<String>,
) -> Vec<Change> {
    let from_by_name: BTreeMap<&str, &Package> =
        from.iter().map(|p| (p.name(), p)).collect();
    let to_by_name: BTreeMap<&str, &Package> = to.iter().map(|p| (p.name(), p)).collect();

    let mut names: Vec<&str> = from_by_name.keys().chain(to_by_name.keys()).copied().collect();
    names.sort();
    names.dedup();

    let mut changes: Vec<Change> = names
        .into_iter()
        .map(|name| {
            let old = from_by_name.get(name).copied();
            let new = to_by_name.get(name).copied();
            build_change(name, old, new, &license_of)
        })
        .collect();

    changes.sort_by(|a, b| a.status.rank().cmp(&b.status.rank()).then(a.name.cmp(&b.name)));
    changes
}

fn build_change(
    name: &str,
    old: Option<&Package>,
    new: Option<&Package>,
    license_of: &impl Fn(&Package) -> Option<String>,
) -> Change {
    let status = match (old, new) {
        (None, Some(_)) => ChangeStatus::Added,
        (Some(_), None) => ChangeStatus::Removed,
        (Some(old), Some(new)) => {
            if differs(old, new, license_of) {
                ChangeStatus::Updated
            } else {
                ChangeStatus::Unchanged
            }
        }
        (None, None) => unreachable!("name came from one of the two sides"),
    };

    Change {
        name: name.to_string(),
        status,
        from_version: old.map(|p| p.semver_component()),
        to_version: new.map(|p| p.semver_component()),
        from_commit: old.and_then(|p| p.commit_component()),
        to_commit: new.and_then(|p| p.commit_component()),
        from_source: old.map(|p| p.source().to_string()),
        to_source: new.map(|p| p.source().to_string()),
        from_license: old.and_then(license_of),
        to_license: new.and_then(license_of),
        from_resolver: old.map(|p| p.resolver().to_string()),
        to_resolver: new.map(|p| p.resolver().to_string()),
    }
}

fn differs(old: &Package, new: &Package, license_of: &impl Fn(&Package) -> Option<String>) -> bool {
    old.semver_component() != new.semver_component()
        || old.commit_component() != new.commit_component()
        || old.source() != new.source()
        || old.resolver() != new.resolver()
        || license_of(old) != license_of(new)
}
