//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use quay::audit::Severity;

/// Output format shared by the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Terminal,
    /// Machine-readable JSON output
    Json,
}

/// Output format for `quay diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DiffFormat {
    #[default]
    Terminal,
    Json,
    /// Table suitable for pull-request descriptions
    Markdown,
}

/// Quay - a source-based package manager with built-in supply-chain
/// compliance
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug/info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    /// Run without network access
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the locked dependencies, verifying content checksums
    Install(InstallArgs),

    /// Refetch locked dependencies and regenerate their checksums
    Update(UpdateArgs),

    /// Check locked dependencies against the vulnerability database
    Audit(AuditArgs),

    /// Inventory dependency licenses against the license policy
    Licenses(LicensesArgs),

    /// Dependency policy management
    Policy(PolicyArgs),

    /// Diff two lockfile states
    Diff(DiffArgs),

    /// Produce the unified compliance report
    ComplianceReport(ReportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Require the lockfile to be usable as-is; verify path dependencies too
    #[arg(long)]
    pub frozen: bool,

    /// Skip checksum verification (missing checksums are still computed)
    #[arg(long)]
    pub skip_verify: bool,
}

#[derive(Args)]
pub struct UpdateArgs {}

#[derive(Args)]
pub struct AuditArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Clear the vulnerability cache before querying
    #[arg(long)]
    pub update_db: bool,

    /// Exit non-zero when a vulnerability at or above this severity remains
    #[arg(long, default_value_t = Severity::Low)]
    pub fail_above: Severity,

    /// Hide vulnerabilities below this severity
    #[arg(long)]
    pub min_severity: Option<Severity>,

    /// Ignore file to apply (defaults to .quay-audit-ignore.yml)
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct LicensesArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Fail when any dependency is denied or unlicensed
    #[arg(long)]
    pub check: bool,

    /// Skip on-disk license detection
    #[arg(long)]
    pub no_detect: bool,
}

#[derive(Args)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommands,
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Evaluate the locked dependencies against the policy
    Check(PolicyCheckArgs),

    /// Write a documented starter policy file
    Init(PolicyInitArgs),

    /// Summarize the loaded policy
    Show,
}

#[derive(Args)]
pub struct PolicyCheckArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct PolicyInitArgs {
    /// Overwrite an existing policy file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Old side: current, last-install, a lockfile path, or a git ref
    #[arg(default_value = "last-install")]
    pub from: String,

    /// New side: current, last-install, a lockfile path, or a git ref
    #[arg(default_value = "current")]
    pub to: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = DiffFormat::Terminal)]
    pub format: DiffFormat,

    /// Include unchanged packages in terminal output
    #[arg(long)]
    pub unchanged: bool,

    /// Write the diff to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Output format: json, html, or markdown
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Record an attestation by this reviewer
    #[arg(long)]
    pub reviewer: Option<String>,

    /// Produce a detached signature next to the output file
    #[arg(long)]
    pub sign: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
