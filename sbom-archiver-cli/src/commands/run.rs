//! `sbom-archiver run`: the long-lived reconciler.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use sbom_archiver_core::{config::MAX_CONCURRENT_CHECKS_LIMIT, Settings};
use sbom_archiver_daemon::{init_tracing, run_once_blocking, start_blocking, LogFormat, Reconciler};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run a single cycle, print its summary as JSON, and exit.
    #[arg(long)]
    pub once: bool,

    /// Seconds to wait between cycles. Overrides SBOM_ARCHIVER_INTERVAL_SECS.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    /// Maximum simultaneous oracle requests. Overrides SBOM_ARCHIVER_MAX_CONCURRENT_CHECKS.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_CONCURRENT_CHECKS_LIMIT))]
    pub max_concurrent: Option<u64>,

    /// Log line format: text or json.
    #[arg(long, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut settings = Settings::from_env().context("invalid configuration")?;
        if let Some(secs) = self.interval_secs {
            settings.cycle_interval = Duration::from_secs(secs);
        }
        if let Some(max) = self.max_concurrent {
            settings.max_concurrent_checks = max as usize;
        }

        init_tracing(self.log_format);
        tracing::info!(settings = ?settings, "configuration loaded");

        let reconciler =
            Reconciler::from_settings(&settings).context("failed to initialise reconciler")?;

        if self.once {
            let summary = run_once_blocking(reconciler).context("reconcile cycle failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .context("failed to render cycle summary JSON")?
            );
            return Ok(());
        }

        start_blocking(reconciler).context("reconciler exited with error")
    }
}
