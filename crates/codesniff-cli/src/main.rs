//! codesniff CLI tool.
//!
//! Usage:
//! ```bash
//! codesniff check [OPTIONS] [PATH]...
//! codesniff list-standards
//! codesniff docs [--standard NAME]
//! codesniff init
//! ```
//!
//! Exit status: 0 clean, 1 warnings only, 2 errors, 3 fatal setup error.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Exit status for a run that could not start.
const EXIT_FATAL: u8 = 3;

/// Coding-standard checker for PHP, JavaScript and CSS sources
#[derive(Parser)]
#[command(name = "codesniff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check files against a coding standard
    Check(CheckArgs),

    /// List installed standards and their sniffs
    ListStandards,

    /// Print documentation for the sniffs of a standard
    Docs {
        /// Standard name or rule-set path (default: from config)
        #[arg(long)]
        standard: Option<String>,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Arguments of the `check` subcommand.
#[derive(clap::Args)]
pub struct CheckArgs {
    /// Files or directories to check (default: current directory)
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Standard name, directory or rule-set file; several may be
    /// joined with commas
    #[arg(long)]
    pub standard: Option<String>,

    /// Only run these sniff codes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub sniffs: Vec<String>,

    /// Report format
    #[arg(short, long, default_value = "full")]
    pub report: ReportFormat,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// File extensions to check, as `ext` or `ext/family` (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Pause after each file with diagnostics
    #[arg(short, long)]
    pub interactive: bool,

    /// Do not recurse into subdirectories
    #[arg(short = 'l', long)]
    pub local: bool,

    /// Report errors only
    #[arg(short = 'n', long)]
    pub no_warnings: bool,

    /// Columns per tab stop
    #[arg(long)]
    pub tab_width: Option<usize>,

    /// Source encoding (`utf-8` or `iso-8859-1`)
    #[arg(long)]
    pub encoding: Option<String>,
}

/// Report format for check results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Diagnostics grouped per file.
    #[default]
    Full,
    /// One line per diagnostic.
    Compact,
    /// JSON output.
    Json,
    /// Per-file totals.
    Summary,
    /// Diagnostics with source snippets.
    Rich,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Check(args) => commands::check::run(&args, cli.verbose, cli.config.as_deref()),
        Commands::ListStandards => commands::list_standards::run().map(|()| ExitCode::SUCCESS),
        Commands::Docs { standard } => {
            commands::docs::run(standard, cli.config.as_deref()).map(|()| ExitCode::SUCCESS)
        }
        Commands::Init { force } => commands::init::run(force).map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}
