//! `gitrelay once` — single-pass mode for one-shot jobs.

use anyhow::{Context, Result};
use clap::Args;

use gitrelay_core::Config;
use gitrelay_daemon::{run_from_config, RunOptions};

/// Arguments for `gitrelay once`.
#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Report would-be destinations without pushing or committing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl OnceArgs {
    pub async fn run(self) -> Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        run_from_config(
            config,
            RunOptions {
                dry_run: self.dry_run,
                run_once: true,
            },
        )
        .await
        .context("sync pass failed")
    }
}
