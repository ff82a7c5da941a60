//! Quay CLI - a source-based package manager with built-in supply-chain
//! compliance.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quay::util::{ColorChoice, Shell};

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Shared flags every command sees.
pub struct GlobalOptions {
    pub shell: Shell,
    pub offline: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color: ColorChoice = match cli.color.parse() {
        Ok(choice) => choice,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    };

    let global = GlobalOptions {
        shell: Shell::from_flags(cli.quiet, cli.verbose, color),
        offline: cli.offline,
    };

    match run(cli.command, &global) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands, global: &GlobalOptions) -> Result<i32> {
    match command {
        Commands::Install(args) => commands::install::execute(args, global),
        Commands::Update(args) => commands::update::execute(args, global),
        Commands::Audit(args) => commands::audit::execute(args, global),
        Commands::Licenses(args) => commands::licenses::execute(args, global),
        Commands::Policy(args) => commands::policy::execute(args, global),
        Commands::Diff(args) => commands::diff::execute(args, global),
        Commands::ComplianceReport(args) => commands::report::execute(args, global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
