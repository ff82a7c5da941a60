//! Canonical license identifier registry.
//!
//! A curated subset of the SPDX license list: the identifiers that show up
//! in practice across source-based dependency trees, each tagged with its
//! licensing category for policy summaries.

/// Broad licensing category of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Category {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    NonCommercial,
    PublicDomain,
    Proprietary,
    Unknown,
}

/// A registry entry.
#[derive(Debug, Clone, Copy)]
pub struct LicenseInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub osi_approved: bool,
    pub category: Category,
}

use Category::*;

const REGISTRY: &[LicenseInfo] = &[
    // Permissive
    LicenseInfo { id: "MIT", name: "MIT License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "MIT-0", name: "MIT No Attribution", osi_approved: true, category: Permissive },
    LicenseInfo { id: "0BSD", name: "BSD Zero Clause License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "Apache-1.1", name: "Apache License 1.1", osi_approved: true, category: Permissive },
    LicenseInfo { id: "Apache-2.0", name: "Apache License 2.0", osi_approved: true, category: Permissive },
    LicenseInfo { id: "BSD-2-Clause", name: "BSD 2-Clause \"Simplified\" License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "BSD-3-Clause", name: "BSD 3-Clause \"New\" or \"Revised\" License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "BSD-4-Clause", name: "BSD 4-Clause \"Original\" License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "BSL-1.0", name: "Boost Software License 1.0", osi_approved: true, category: Permissive },
    LicenseInfo { id: "ISC", name: "ISC License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "NCSA", name: "University of Illinois/NCSA Open Source License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "X11", name: "X11 License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "Zlib", name: "zlib License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "libpng-2.0", name: "PNG Reference Library version 2", osi_approved: false, category: Permissive },
    LicenseInfo { id: "curl", name: "curl License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "OpenSSL", name: "OpenSSL License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "Artistic-2.0", name: "Artistic License 2.0", osi_approved: true, category: Permissive },
    LicenseInfo { id: "Python-2.0", name: "Python License 2.0", osi_approved: true, category: Permissive },
    LicenseInfo { id: "PHP-3.01", name: "PHP License v3.01", osi_approved: true, category: Permissive },
    LicenseInfo { id: "Ruby", name: "Ruby License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "PostgreSQL", name: "PostgreSQL License", osi_approved: true, category: Permissive },
    LicenseInfo { id: "Vim", name: "Vim License", osi_approved: false, category: Permissive },
    LicenseInfo { id: "AFL-3.0", name: "Academic Free License v3.0", osi_approved: true, category: Permissive },
    LicenseInfo { id: "CC-BY-4.0", name: "Creative Commons Attribution 4.0 International", osi_approved: false, category: Permissive },
    LicenseInfo { id: "Unicode-DFS-2016", name: "Unicode License Agreement - Data Files and Software (2016)", osi_approved: false, category: Permissive },
    // Weak copyleft
    LicenseInfo { id: "MPL-1.1", name: "Mozilla Public License 1.1", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "MPL-2.0", name: "Mozilla Public License 2.0", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "LGPL-2.1-only", name: "GNU Lesser General Public License v2.1 only", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "LGPL-2.1-or-later", name: "GNU Lesser General Public License v2.1 or later", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "LGPL-3.0-only", name: "GNU Lesser General Public License v3.0 only", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "LGPL-3.0-or-later", name: "GNU Lesser General Public License v3.0 or later", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "EPL-1.0", name: "Eclipse Public License 1.0", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "EPL-2.0", name: "Eclipse Public License 2.0", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "CDDL-1.0", name: "Common Development and Distribution License 1.0", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "CDDL-1.1", name: "Common Development and Distribution License 1.1", osi_approved: false, category: WeakCopyleft },
    LicenseInfo { id: "EUPL-1.2", name: "European Union Public License 1.2", osi_approved: true, category: WeakCopyleft },
    LicenseInfo { id: "CC-BY-SA-4.0", name: "Creative Commons Attribution Share Alike 4.0 International", osi_approved: false, category: WeakCopyleft },
    // Strong copyleft
    LicenseInfo { id: "GPL-2.0-only", name: "GNU General Public License v2.0 only", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "GPL-2.0-or-later", name: "GNU General Public License v2.0 or later", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "GPL-3.0-only", name: "GNU General Public License v3.0 only", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "GPL-3.0-or-later", name: "GNU General Public License v3.0 or later", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "AGPL-3.0-only", name: "GNU Affero General Public License v3.0 only", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "AGPL-3.0-or-later", name: "GNU Affero General Public License v3.0 or later", osi_approved: true, category: StrongCopyleft },
    LicenseInfo { id: "OSL-3.0", name: "Open Software License 3.0", osi_approved: true, category: StrongCopyleft },
    // Non-commercial
    LicenseInfo { id: "CC-BY-NC-4.0", name: "Creative Commons Attribution Non Commercial 4.0 International", osi_approved: false, category: NonCommercial },
    LicenseInfo { id: "CC-BY-NC-SA-4.0", name: "Creative Commons Attribution Non Commercial Share Alike 4.0 International", osi_approved: false, category: NonCommercial },
    // Public domain
    LicenseInfo { id: "Unlicense", name: "The Unlicense", osi_approved: true, category: PublicDomain },
    LicenseInfo { id: "CC0-1.0", name: "Creative Commons Zero v1.0 Universal", osi_approved: false, category: PublicDomain },
    LicenseInfo { id: "WTFPL", name: "Do What The F*ck You Want To Public License", osi_approved: false, category: PublicDomain },
    // Source-available / restricted
    LicenseInfo { id: "BUSL-1.1", name: "Business Source License 1.1", osi_approved: false, category: Proprietary },
    LicenseInfo { id: "SSPL-1.0", name: "Server Side Public License v1", osi_approved: false, category: Proprietary },
    LicenseInfo { id: "Elastic-2.0", name: "Elastic License 2.0", osi_approved: false, category: Proprietary },
];

/// Look up an identifier (exact, case-sensitive match).
pub fn lookup(id: &str) -> Option<&'static LicenseInfo> {
    REGISTRY.iter().find(|info| info.id == id)
}

/// The category of an identifier, `Unknown` for anything not registered.
pub fn category_of(id: &str) -> Category {
    lookup(id).map(|info| info.category).unwrap_or(Category::Unknown)
}

/// All registry entries.
pub fn all() -> &'static [LicenseInfo] {
    REGISTRY
}
