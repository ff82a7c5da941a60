//! Command implementations

pub mod audit;
pub mod completions;
pub mod diff;
pub mod install;
pub mod licenses;
pub mod policy;
pub mod report;
pub mod update;

use std::path::Path;

use anyhow::Result;

use quay::util::Shell;

/// Write command output to a file or stdout.
pub fn emit_output(shell: &Shell, content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => quay::util::fs::write_atomic_string(path, content),
        None => {
            shell.print(content);
            Ok(())
        }
    }
}
