//! stackmirror — mirror local template trees into an object store.
//!
//! # Usage
//!
//! ```text
//! stackmirror sync <local> <bucket> [prefix] [--dry-run] [--json]
//! stackmirror sync --all [--dry-run] [--json]
//! stackmirror plan <local> <bucket> [prefix] | --all [--json]
//! stackmirror changed <local> <bucket> [prefix] [--stage-dir <dir>] [--json]
//! ```
//!
//! Global options: `--config <file>` (default `./stackmirror.yaml` when
//! present), `--store-root <dir>` for a directory-backed store, `--region` and
//! `--endpoint` for S3, and `-v`/`-vv` for more log output on stderr.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{changed::ChangedArgs, plan::PlanArgs, sync::SyncArgs, Globals};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stackmirror",
    version,
    about = "Mirror local template directories into an object store",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    /// Increase log verbosity (-v info, -vv debug). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload changed files and delete removed ones.
    Sync(SyncArgs),

    /// Show what sync would upload and delete, as a table.
    Plan(PlanArgs),

    /// Copy files that differ from the mirror into a stage directory.
    Changed(ChangedArgs),
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(&cli.globals),
        Commands::Plan(args) => args.run(&cli.globals),
        Commands::Changed(args) => args.run(&cli.globals),
    }
}
