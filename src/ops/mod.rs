//! High-level operations.
//!
//! The install and update pipelines, with the compliance hooks wired in
//! order: policy gate, source fetch, checksum verify-or-compute, lockfile
//! write, changelog append.

pub mod install;
pub mod update;

pub use install::{install, InstallOptions};
pub use update::update;
