//! Reconciler runtime: per-cycle algorithm, long-running loop, signals, tracing.

pub mod cycle;
mod error;
mod runtime;

pub use cycle::{
    evaluate_record, reconcile_once, CycleOptions, CycleSummary, RecordOutcome,
    DEFAULT_MAX_CONCURRENT_CHECKS,
};
pub use error::ReconcileError;
pub use runtime::{
    init_tracing, run_once_blocking, start_blocking, wait_or_cancel, LogFormat, Reconciler,
    DEFAULT_CYCLE_INTERVAL,
};
