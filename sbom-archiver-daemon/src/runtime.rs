use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use sbom_archiver_core::{RecordStore, Settings, SqliteStore};
use sbom_archiver_oracle::{ActivityOracle, ReleaseClient};

use crate::cycle::{reconcile_once, CycleOptions, CycleSummary};
use crate::error::{join_err, ReconcileError};

pub use sbom_archiver_core::config::DEFAULT_CYCLE_INTERVAL;

/// Log line format for the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'; expected: text, json")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// The long-lived reconcile loop: cycle, wait, repeat until cancelled.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    oracle: Arc<dyn ActivityOracle>,
    options: CycleOptions,
    interval: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, oracle: Arc<dyn ActivityOracle>) -> Self {
        Self {
            store,
            oracle,
            options: CycleOptions::default(),
            interval: DEFAULT_CYCLE_INTERVAL,
        }
    }

    /// Wire the SQLite store and HTTP release client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ReconcileError> {
        let store = SqliteStore::from_connection_string(&settings.store_url)?;
        let oracle = ReleaseClient::from_settings(settings)?;
        Ok(Self::new(Arc::new(store), Arc::new(oracle))
            .with_interval(settings.cycle_interval)
            .with_max_concurrent_checks(settings.max_concurrent_checks))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.options.max_concurrent_checks = max.max(1);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle on its own task so that a panic is contained to the cycle.
    pub async fn run_cycle(
        &self,
        cycle: u64,
        cancel: &CancellationToken,
    ) -> Result<CycleSummary, ReconcileError> {
        let store = self.store.clone();
        let oracle = self.oracle.clone();
        let options = self.options;
        let cancel = cancel.clone();
        let span = tracing::info_span!("cycle", cycle);

        tokio::spawn(
            async move { reconcile_once(store, oracle, &options, &cancel).await }.instrument(span),
        )
        .await
        .map_err(|err| join_err("reconcile_cycle", err))?
    }

    /// Loop until `cancel` fires. Returns the number of cycles started.
    ///
    /// A failed cycle is logged and the loop carries on after the usual wait.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            max_concurrent_checks = self.options.max_concurrent_checks,
            "reconciler started",
        );

        let mut cycles = 0u64;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            cycles += 1;
            tracing::info!(cycle = cycles, "reconcile cycle starting");

            match self.run_cycle(cycles, &cancel).await {
                Ok(summary) => log_summary(cycles, &summary),
                Err(err) => {
                    tracing::error!(
                        cycle = cycles,
                        archived = 0,
                        error = %err,
                        "reconcile cycle failed",
                    );
                }
            }

            if wait_or_cancel(&cancel, self.interval).await {
                break;
            }
        }

        tracing::info!(cycles, "reconciler stopped");
        cycles
    }
}

/// Sleep for `interval` unless `cancel` fires first. Returns `true` if cancelled.
pub async fn wait_or_cancel(cancel: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(interval) => false,
    }
}

fn log_summary(cycle: u64, summary: &CycleSummary) {
    tracing::info!(
        cycle,
        pending = summary.pending,
        active = summary.active,
        archived = summary.archived,
        already_archived = summary.already_archived,
        unresolved = summary.unresolved,
        store_failures = summary.store_failures,
        not_evaluated = summary.not_evaluated,
        cancelled = summary.cancelled,
        duration_ms = summary.duration_ms,
        "reconcile cycle finished",
    );
}

/// Start the reconciler and block the current thread until a shutdown signal.
pub fn start_blocking(reconciler: Reconciler) -> Result<(), ReconcileError> {
    let runtime = build_runtime()?;
    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let signal_handle = spawn_signal_listener(cancel.clone());

        reconciler.run(cancel.clone()).await;

        cancel.cancel();
        signal_handle
            .await
            .map_err(|err| join_err("signal_handler", err))?
    })
}

/// Run exactly one cycle and return its summary. Ctrl-C still stops dispatch.
pub fn run_once_blocking(reconciler: Reconciler) -> Result<CycleSummary, ReconcileError> {
    let runtime = build_runtime()?;
    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let signal_handle = spawn_signal_listener(cancel.clone());

        let result = reconciler.run_cycle(1, &cancel).await;
        if let Ok(summary) = &result {
            log_summary(1, summary);
        }

        cancel.cancel();
        signal_handle
            .await
            .map_err(|err| join_err("signal_handler", err))??;
        result
    })
}

fn build_runtime() -> Result<tokio::runtime::Runtime, ReconcileError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn spawn_signal_listener(
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<Result<(), ReconcileError>> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            signal = shutdown_signal() => match signal {
                Ok(()) => {
                    tracing::info!("received shutdown signal, stopping reconciler");
                    cancel.cancel();
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(error = %err, "signal handler failed, stopping reconciler");
                    cancel.cancel();
                    Err(ReconcileError::Runtime(err))
                }
            }
        }
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the `info` default.
///
/// Logs go to stderr; stdout is reserved for command output.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };
}
