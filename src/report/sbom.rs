//! SBOM synthesis in SPDX-2.3 JSON shape.
//!
//! The document describes the root project and every locked package, with
//! DEPENDS_ON relationships taken from each installed package's manifest and
//! restricted to the locked set.

use chrono::Utc;
use serde_json::{json, Value};

use crate::core::manifest::Manifest;
use crate::core::package::Package;
use crate::purl::purl_for;
use crate::util::context::ProjectContext;

const SPDX_VERSION: &str = "SPDX-2.3";
const GENERATOR: &str = concat!("Tool: quay-", env!("CARGO_PKG_VERSION"));

/// Build the SBOM document.
pub fn build(ctx: &ProjectContext, root: &Manifest, packages: &[Package]) -> Value {
    let root_id = spdx_id(&root.package.name);
    let created = Utc::now().to_rfc3339();

    let mut spdx_packages = vec![json!({
        "SPDXID": root_id,
        "name": root.package.name,
        "versionInfo": root.package.version,
        "downloadLocation": "NOASSERTION",
        "licenseDeclared": root.package.license.clone().unwrap_or_else(|| "NOASSERTION".into()),
    })];

    let mut relationships = vec![json!({
        "spdxElementId": "SPDXRef-DOCUMENT",
        "relationshipType": "DESCRIBES",
        "relatedSpdxElement": root_id,
    })];

    let locked_names: Vec<&str> = packages.iter().map(|p| p.name()).collect();

    for pkg in packages {
        let mut entry = json!({
            "SPDXID": spdx_id(pkg.name()),
            "name": pkg.name(),
            "versionInfo": pkg.semver_component(),
            "downloadLocation": pkg.source(),
        });

        if let Some(license) = pkg.declared_license(ctx) {
            entry["licenseDeclared"] = json!(license);
        }
        if let Some(checksum) = pkg.checksum() {
            if let Some(hex) = checksum.strip_prefix("sha256:") {
                entry["checksums"] = json!([{
                    "algorithm": "SHA256",
                    "checksumValue": hex,
                }]);
            }
        }
        if let Some(purl) = purl_for(pkg) {
            entry["externalRefs"] = json!([{
                "referenceCategory": "PACKAGE-MANAGER",
                "referenceType": "purl",
                "referenceLocator": purl,
            }]);
        }
        spdx_packages.push(entry);
    }

    // Root depends on its declared direct dependencies.
    for dep in root.dependency_names() {
        if locked_names.contains(&dep.as_str()) {
            relationships.push(depends_on(&root.package.name, &dep));
        }
    }

    // Each installed package depends on what its own manifest declares,
    // restricted to the locked set.
    for pkg in packages {
        if let Some(spec) = pkg.spec(ctx) {
            for dep in spec.dependency_names() {
                if locked_names.contains(&dep.as_str()) {
                    relationships.push(depends_on(pkg.name(), &dep));
                }
            }
        }
    }

    json!({
        "spdxVersion": SPDX_VERSION,
        "dataLicense": "CC0-1.0",
        "SPDXID": "SPDXRef-DOCUMENT",
        "name": format!("{}-{}-sbom", root.package.name, root.package.version),
        "documentNamespace": format!(
            "https://quay.dev/spdxdocs/{}-{}",
            root.package.name, root.package.version
        ),
        "creationInfo": {
            "created": created,
            "creators": [GENERATOR],
        },
        "packages": spdx_packages,
        "relationships": relationships,
    })
}

fn depends_on(from: &str, to: &str) -> Value {
    json!({
        "spdxElementId": spdx_id(from),
        "relationshipType": "DEPENDS_ON",
        "relatedSpdxElement": spdx_id(to),
    })
}

/// SPDX identifiers only allow letters, digits, `.` and `-`.
fn spdx_id(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("SPDXRef-Package-{}", sanitized)
}
