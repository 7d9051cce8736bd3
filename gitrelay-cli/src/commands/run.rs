//! `gitrelay run` — the long-lived polling daemon.

use anyhow::{Context, Result};
use clap::Args;

use gitrelay_core::Config;
use gitrelay_daemon::{run_from_config, RunOptions};

/// Arguments for `gitrelay run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Report would-be destinations without pushing or committing anything.
    /// Implies a single cycle.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub async fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        run_from_config(
            config,
            RunOptions {
                dry_run: self.dry_run,
                run_once: false,
            },
        )
        .await
        .context("daemon exited with an error")
    }
}
