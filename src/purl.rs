//! Package-URL derivation.
//!
//! Maps a resolved package to the canonical identifier used for
//! vulnerability lookup and SBOM emission. Known forge hosts produce a
//! directly-indexable `pkg:<type>/<owner>/<repo>@<version>`; everything else
//! falls back to `pkg:generic` with the source URL preserved as a
//! `download_url` qualifier.

use url::form_urlencoded;
use url::Url;

use crate::core::package::Package;

/// Forge host keywords that vulnerability databases index directly.
const KNOWN_HOSTS: &[&str] = &["github", "gitlab", "bitbucket", "codeberg"];

/// Derive the purl for a package. Path dependencies have none.
pub fn purl_for(pkg: &Package) -> Option<String> {
    if pkg.resolver().is_path() {
        return None;
    }

    let version = pkg.semver_component();

    if let Some(purl) = forge_purl(pkg.source(), &version) {
        return Some(purl);
    }

    Some(generic_purl(pkg.name(), &version, pkg.source()))
}

fn forge_purl(source: &str, version: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    let host = url.host_str()?.to_lowercase();
    let kind = KNOWN_HOSTS.iter().find(|k| host.contains(*k))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    if segments.len() < 2 {
        return None;
    }

    let owner = segments[0];
    let repo = segments[1].strip_suffix(".git").unwrap_or(segments[1]);

    Some(format!("pkg:{}/{}/{}@{}", kind, owner, repo, version))
}

fn generic_purl(name: &str, version: &str, source: &str) -> String {
    let encoded_name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    let encoded_source: String = form_urlencoded::byte_serialize(source.as_bytes()).collect();
    format!(
        "pkg:generic/{}@{}?download_url={}",
        encoded_name, version, encoded_source
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package::ResolverKind;
    use semver::Version;

    fn pkg(resolver: ResolverKind, source: &str, version: &str) -> Package {
        Package::new("mylib", resolver, source, Version::parse(version).unwrap())
    }

    #[test]
    fn test_github_purl() {
        let p = pkg(ResolverKind::Git, "https://github.com/acme/mylib.git", "1.2.0");
        assert_eq!(purl_for(&p).as_deref(), Some("pkg:github/acme/mylib@1.2.0"));
    }

    #[test]
    fn test_codeberg_purl() {
        let p = pkg(ResolverKind::Git, "https://codeberg.org/acme/mylib", "0.9.1");
        assert_eq!(
            purl_for(&p).as_deref(),
            Some("pkg:codeberg/acme/mylib@0.9.1")
        );
    }

    #[test]
    fn test_path_dependency_has_no_purl() {
        let p = pkg(ResolverKind::Path, "../mylib", "1.0.0");
        assert_eq!(purl_for(&p), None);
    }

    #[test]
    fn test_generic_purl_preserves_source() {
        let p = pkg(ResolverKind::Git, "https://git.example.org/mylib.git", "2.0.0");
        let purl = purl_for(&p).unwrap();
        assert!(purl.starts_with("pkg:generic/mylib@2.0.0?download_url="));
        assert!(purl.contains("git.example.org"));
        assert!(!purl.contains("://"));
    }

    #[test]
    fn test_known_host_with_short_path_falls_back_to_generic() {
        let p = pkg(ResolverKind::Git, "https://github.com/mylib.git", "1.0.0");
        let purl = purl_for(&p).unwrap();
        assert!(purl.starts_with("pkg:generic/"));
    }

    #[test]
    fn test_pinned_commit_is_stripped_from_version() {
        let p = pkg(
            ResolverKind::Git,
            "https://github.com/acme/mylib",
            "1.2.0+git.commit.0abc12",
        );
        assert_eq!(purl_for(&p).as_deref(), Some("pkg:github/acme/mylib@1.2.0"));
    }
}
