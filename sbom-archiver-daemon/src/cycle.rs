//! One reconcile cycle: fetch pending records, ask the oracle about each,
//! archive the inactive ones, and return what happened.
//!
//! Records are independent. Each record's evaluate-then-archive sequence runs
//! on its own blocking worker; at most `max_concurrent_checks` run at once.
//! Outcomes are reduced into a [`CycleSummary`] after the workers finish, so
//! no counter is shared between them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use sbom_archiver_core::{InventoryRecord, RecordStore};
use sbom_archiver_oracle::ActivityOracle;

use crate::error::{join_err, ReconcileError};

pub use sbom_archiver_core::config::DEFAULT_MAX_CONCURRENT_CHECKS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    /// Upper bound on simultaneous oracle requests. `1` evaluates sequentially.
    pub max_concurrent_checks: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }
}

/// Result of evaluating a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The oracle still lists the build. Nothing written.
    Active,
    /// The oracle no longer lists the build; `rows` is the affected-row count
    /// of the archive update (0 if another writer got there first).
    Archived { rows: usize },
    /// The oracle could not answer. Nothing written; retried next cycle.
    Unresolved,
    /// The oracle said inactive but the archive update failed.
    StoreFailed,
}

/// Per-cycle accumulator returned by [`reconcile_once`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub pending: usize,
    pub active: usize,
    /// Rows flipped to archived this cycle.
    pub archived: usize,
    pub already_archived: usize,
    pub unresolved: usize,
    pub store_failures: usize,
    pub not_evaluated: usize,
    pub cancelled: bool,
    pub duration_ms: u128,
}

impl CycleSummary {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Active => self.active += 1,
            RecordOutcome::Archived { rows: 0 } => self.already_archived += 1,
            RecordOutcome::Archived { rows } => self.archived += rows,
            RecordOutcome::Unresolved => self.unresolved += 1,
            RecordOutcome::StoreFailed => self.store_failures += 1,
        }
    }
}

/// Evaluate one record against the oracle and archive it if inactive.
///
/// Never returns an error: every failure is logged with the record's
/// identity and folded into the outcome.
pub fn evaluate_record(
    store: &dyn RecordStore,
    oracle: &dyn ActivityOracle,
    record: &InventoryRecord,
) -> RecordOutcome {
    let key = record.key();

    let active = match oracle.is_build_active(&key) {
        Ok(active) => active,
        Err(err) => {
            tracing::warn!(
                collection = %key.collection_id,
                project = %key.project_id,
                build = %key.build_number,
                status = ?err.status(),
                error = %err,
                "could not determine build activity; record left pending",
            );
            return RecordOutcome::Unresolved;
        }
    };

    if active {
        tracing::debug!(
            collection = %key.collection_id,
            project = %key.project_id,
            build = %key.build_number,
            "build still active",
        );
        return RecordOutcome::Active;
    }

    match store.mark_archived(&key) {
        Ok(rows) => {
            tracing::info!(
                collection = %key.collection_id,
                project = %key.project_id,
                build = %key.build_number,
                rows,
                "build no longer active; record archived",
            );
            RecordOutcome::Archived { rows }
        }
        Err(err) => {
            tracing::error!(
                collection = %key.collection_id,
                project = %key.project_id,
                build = %key.build_number,
                error = %err,
                "archive update failed",
            );
            RecordOutcome::StoreFailed
        }
    }
}

/// Run one full cycle.
///
/// Returns `Err` only when the cycle could not start: the pending fetch
/// failed or the worker pool broke. Per-record failures are counted in the
/// summary. Once `cancel` fires no further records are dispatched; records
/// already in flight complete.
pub async fn reconcile_once(
    store: Arc<dyn RecordStore>,
    oracle: Arc<dyn ActivityOracle>,
    options: &CycleOptions,
    cancel: &CancellationToken,
) -> Result<CycleSummary, ReconcileError> {
    let started = Instant::now();
    let mut summary = CycleSummary::default();

    if cancel.is_cancelled() {
        summary.cancelled = true;
        return Ok(summary);
    }

    let fetch_store = store.clone();
    let pending = tokio::task::spawn_blocking(move || fetch_store.fetch_pending())
        .await
        .map_err(|err| join_err("fetch_pending", err))??;
    summary.pending = pending.len();

    if pending.is_empty() {
        tracing::info!("no pending records");
        summary.duration_ms = started.elapsed().as_millis();
        return Ok(summary);
    }
    tracing::info!(pending = pending.len(), "fetched pending records");

    let limiter = Arc::new(Semaphore::new(options.max_concurrent_checks.max(1)));
    let mut tasks = JoinSet::new();
    let mut dispatched = 0usize;

    for record in pending {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = limiter.clone().acquire_owned() => {
                permit.map_err(|_| ReconcileError::LimiterClosed)?
            }
        };
        let store = store.clone();
        let oracle = oracle.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            evaluate_record(store.as_ref(), oracle.as_ref(), &record)
        });
        dispatched += 1;
    }

    if dispatched < summary.pending {
        summary.cancelled = true;
        summary.not_evaluated = summary.pending - dispatched;
        tracing::info!(
            skipped = summary.not_evaluated,
            "cancellation requested; remaining records not dispatched",
        );
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => summary.record(outcome),
            Err(err) => {
                tracing::error!(error = %err, "record evaluation worker failed");
                summary.not_evaluated += 1;
            }
        }
    }

    summary.duration_ms = started.elapsed().as_millis();
    Ok(summary)
}
