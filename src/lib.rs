//! Quay - a source-based package manager with built-in supply-chain compliance
//!
//! This crate provides the core library functionality for Quay: the package
//! and lockfile model, content-integrity checksums, vulnerability auditing,
//! license and dependency policy, lockfile diffing with a change audit
//! trail, and the unified compliance report.

pub mod audit;
pub mod core;
pub mod diff;
pub mod integrity;
pub mod licenses;
pub mod ops;
pub mod policy;
pub mod purl;
pub mod report;
pub mod sources;
pub mod spdx;
pub mod util;

pub use crate::core::{
    lockfile::Lockfile, manifest::Manifest, package::Package, package::ResolverKind,
};
pub use crate::util::context::ProjectContext;
