mod commands;
mod config;
mod script;
mod tree;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, check, export, ApplyArgs, CheckArgs, ExportArgs};

/// Pagecraft CLI - replay edits against block pages
#[derive(Parser, Debug)]
#[command(name = "pagecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a page and report invariant violations
    Check(CheckArgs),

    /// Replay an operation script and write the resulting page
    Apply(ApplyArgs),

    /// Print a block and its descendants as a nested structure
    Export(ExportArgs),
}

fn run(command: Command) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();

    match command {
        Command::Check(args) => check(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
        Command::Export(args) => export(args, &cwd),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli.command) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
