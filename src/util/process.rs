//! Subprocess execution utilities.
//!
//! Used for the non-git version control tools (hg, fossil) and the optional
//! external report signer.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Human-readable command line for error messages.
    pub fn display(&self) -> String {
        let mut s = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run the process, capturing output, and fail on non-zero exit.
    pub fn exec_with_output(&self) -> Result<Output> {
        let output = self
            .build_command()
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` exited with {}: {}",
                self.display(),
                output.status,
                stderr.trim()
            );
        }

        Ok(output)
    }

    /// Run the process and return whether it succeeded, swallowing spawn
    /// failures (for optional tools like the report signer).
    pub fn exec_check(&self) -> Result<bool> {
        let status = self
            .build_command()
            .status()
            .with_context(|| format!("failed to spawn `{}`", self.display()))?;
        Ok(status.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_with_output_captures_stdout() {
        let output = ProcessBuilder::new("echo").arg("hello").exec_with_output();
        let output = output.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_exec_with_output_fails_on_nonzero() {
        let result = ProcessBuilder::new("false").exec_with_output();
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        let pb = ProcessBuilder::new("hg").args(["clone", "url"]);
        assert_eq!(pb.display(), "hg clone url");
    }
}
