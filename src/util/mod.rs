//! Shared utilities

pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use context::ProjectContext;
pub use shell::{ColorChoice, Shell, Status, Verbosity};
