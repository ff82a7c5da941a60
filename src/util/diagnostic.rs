//! User-facing diagnostic errors.
//!
//! Fatal conditions carry a diagnostic code and a `help:` suggestion so the
//! user always knows the next command to run.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no lockfile is found.
    pub const MISSING_LOCKFILE: &str = "help: Run `quay install` to create the lockfile";

    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "help: Run quay from a directory containing Quay.toml";

    /// Suggestion when a checksum disagrees with the lockfile.
    pub const CHECKSUM_MISMATCH: &str =
        "help: Run `quay update` to re-resolve, or pass --skip-verify to bypass verification";

    /// Suggestion when the policy gate blocks an operation.
    pub const POLICY_BLOCKED: &str = "help: Run `quay policy check` for rule-by-rule detail";
}

/// Missing lockfile - every compliance command needs the resolved set.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("Missing lockfile. Run `quay install`.")]
#[diagnostic(
    code(quay::lockfile::missing),
    help("The compliance commands operate on Quay.lock; install first")
)]
pub struct MissingLockfileError;

/// A locked checksum disagrees with the installed source tree.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("checksum mismatch for `{package}`: expected {expected}, got {actual}")]
#[diagnostic(
    code(quay::integrity::checksum_mismatch),
    help("Run `quay update` to re-resolve, or pass --skip-verify to bypass verification")
)]
pub struct ChecksumMismatchError {
    pub package: String,
    pub expected: String,
    pub actual: String,
}

/// The dependency policy blocked an install or update.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("dependency policy violated: {violations} error(s)")]
#[diagnostic(
    code(quay::policy::blocked),
    help("Run `quay policy check` for rule-by-rule detail")
)]
pub struct PolicyBlockedError {
    pub violations: usize,
}

/// An output format the command does not understand.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("unknown output format `{format}`")]
#[diagnostic(
    code(quay::cli::unknown_format),
    help("Supported formats: {supported}")
)]
pub struct UnknownFormatError {
    pub format: String,
    pub supported: String,
}
