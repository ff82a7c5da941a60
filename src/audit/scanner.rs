//! Vulnerability scan orchestration.
//!
//! Partitions the locked packages by purl, serves what it can from the
//! per-purl cache, and issues a single batch query for the rest. Each
//! received result is persisted immediately so a partial batch still
//! updates what it can.

use anyhow::Result;

use crate::audit::osv::OsvClient;
use crate::audit::{cache, PackageScanResult};
use crate::core::package::Package;
use crate::purl::purl_for;
use crate::util::context::ProjectContext;
use crate::util::Shell;

/// Options for a scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Never touch the network; cache misses yield empty results.
    pub offline: bool,

    /// Clear the cache before scanning.
    pub update_db: bool,
}

/// Scan the locked packages, in lockfile order.
pub fn scan_packages(
    ctx: &ProjectContext,
    packages: &[Package],
    opts: ScanOptions,
    shell: &Shell,
) -> Result<Vec<PackageScanResult>> {
    if opts.update_db {
        cache::clear(ctx)?;
    }

    // Pair every package with its purl; path dependencies have none and
    // always yield an empty result.
    let purls: Vec<Option<String>> = packages.iter().map(purl_for).collect();

    let mut vulnerabilities: Vec<Option<Vec<crate::audit::Vulnerability>>> =
        vec![None; packages.len()];
    let mut pending: Vec<(usize, String)> = Vec::new();

    for (idx, purl) in purls.iter().enumerate() {
        let Some(purl) = purl else {
            vulnerabilities[idx] = Some(Vec::new());
            continue;
        };

        match cache::lookup(ctx, purl) {
            Some(cached) => vulnerabilities[idx] = Some(cached),
            None if opts.offline => {
                tracing::debug!("offline: no cached audit data for {}", purl);
                vulnerabilities[idx] = Some(Vec::new());
            }
            None => pending.push((idx, purl.clone())),
        }
    }

    if !pending.is_empty() {
        let queries: Vec<String> = pending.iter().map(|(_, purl)| purl.clone()).collect();

        let spinner = shell.spinner(format!(
            "querying vulnerability database for {} package(s)",
            queries.len()
        ));
        let client = OsvClient::new()?;
        let results = client.query_batch(&queries);
        spinner.finish_and_clear();
        let results = results?;

        for ((idx, purl), vulns) in pending.into_iter().zip(results) {
            if let Err(err) = cache::store(ctx, &purl, &vulns) {
                tracing::warn!("failed to cache audit result for {}: {:#}", purl, err);
            }
            vulnerabilities[idx] = Some(vulns);
        }
    }

    Ok(packages
        .iter()
        .zip(purls)
        .zip(vulnerabilities)
        .map(|((pkg, purl), vulns)| PackageScanResult {
            package: pkg.clone(),
            purl,
            vulnerabilities: vulns.unwrap_or_default(),
        })
        .collect())
}
