//! Centralized terminal output.
//!
//! All CLI output flows through [`Shell`]: aligned status lines, warnings,
//! and a spinner for network fetches. Color is a process-wide toggle so
//! report renderers and the diff printer agree with the status lines.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Process-wide color switch, set once at startup from the CLI flags.
static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);

/// Whether terminal color is enabled for this process.
pub fn color_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only
    Quiet,
    /// Default: status messages
    #[default]
    Normal,
    /// --verbose: debug detail
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success (green)
    Installed,
    Updated,
    Verified,
    Generated,

    // In-progress (cyan)
    Fetching,
    Checking,
    Auditing,
    Scanning,

    // Info (blue)
    Info,

    // Warning (yellow)
    Skipped,
    Warning,

    // Error (red)
    Blocked,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Installed => "Installed",
            Status::Updated => "Updated",
            Status::Verified => "Verified",
            Status::Generated => "Generated",
            Status::Fetching => "Fetching",
            Status::Checking => "Checking",
            Status::Auditing => "Auditing",
            Status::Scanning => "Scanning",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Blocked => "Blocked",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Installed | Status::Updated | Status::Verified | Status::Generated => {
                "\x1b[1;32m"
            }
            Status::Fetching | Status::Checking | Status::Auditing | Status::Scanning => {
                "\x1b[1;36m"
            }
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Blocked | Status::Error => "\x1b[1;31m",
        }
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
}

impl Shell {
    /// Create a shell from CLI flags, fixing the process-wide color toggle.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        COLOR_ENABLED.store(use_color, Ordering::Relaxed);

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Shell { verbosity }
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print an aligned status line (`    Auditing 12 packages`).
    pub fn status(&self, status: Status, message: impl Display) {
        if self.is_quiet() && !matches!(status, Status::Error | Status::Blocked) {
            return;
        }

        let text = status.as_str();
        let mut stderr = io::stderr().lock();
        if color_enabled() {
            let _ = writeln!(
                stderr,
                "{}{:>12}\x1b[0m {}",
                status.color_code(),
                text,
                message
            );
        } else {
            let _ = writeln!(stderr, "{:>12} {}", text, message);
        }
    }

    /// Print a warning.
    pub fn warn(&self, message: impl Display) {
        self.status(Status::Warning, message);
    }

    /// Print an error.
    pub fn error(&self, message: impl Display) {
        self.status(Status::Error, message);
    }

    /// Print a plain line to stdout (report bodies, diff output).
    pub fn print(&self, message: impl Display) {
        println!("{}", message);
    }

    /// Start a spinner for a network round-trip. Returns a disabled bar in
    /// quiet mode or when stderr is not a terminal.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if self.is_quiet() || !io::stderr().is_terminal() {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("static template is valid"),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell {
            verbosity: Verbosity::Normal,
        }
    }
}
