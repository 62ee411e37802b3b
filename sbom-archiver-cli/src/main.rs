//! sbom-archiver: archives SBOM inventory records whose build is no longer
//! active in the release system.
//!
//! # Usage
//!
//! ```text
//! sbom-archiver run [--once] [--interval-secs N] [--max-concurrent N] [--log-format text|json]
//! sbom-archiver init-db
//! sbom-archiver pending [--json]
//! ```
//!
//! Configuration comes from `SBOM_ARCHIVER_*` environment variables; see
//! `sbom_archiver_core::config`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{pending::PendingArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sbom-archiver",
    version,
    about = "Archive SBOM inventory records whose build is no longer released",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconciler in the foreground until SIGINT/SIGTERM.
    Run(RunArgs),

    /// Create the inventory table and indexes if they do not exist.
    InitDb,

    /// List records not yet archived.
    Pending(PendingArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::InitDb => commands::init_db::run(),
        Commands::Pending(args) => args.run(),
    }
}
