//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Resolved packages and their source kinds
//! - Manifests (the root project's and each dependency's)
//! - The lockfile

pub mod lockfile;
pub mod manifest;
pub mod package;

pub use lockfile::{Lockfile, LockedPackage};
pub use manifest::Manifest;
pub use package::{Package, ResolverKind};
