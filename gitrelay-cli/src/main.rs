//! Gitrelay — encrypted git-bundle consumer.
//!
//! # Usage
//!
//! ```text
//! gitrelay run  [--dry-run]   # poll the bucket on an interval
//! gitrelay once [--dry-run]   # perform a single pass and exit
//! ```
//!
//! All connection settings come from the environment; see
//! `gitrelay_core::config` for the variable names.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{once::OnceArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "gitrelay",
    version,
    about = "Pull encrypted git bundles from S3, decrypt, and push to GitLab",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the polling daemon (with a /metrics endpoint).
    Run(RunArgs),

    /// Perform exactly one sync pass, then exit.
    Once(OnceArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    gitrelay_daemon::init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run().await,
        Commands::Once(args) => args.run().await,
    }
}
