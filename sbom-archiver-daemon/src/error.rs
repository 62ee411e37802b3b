use thiserror::Error;

/// Failures that abort a whole reconcile cycle or prevent the loop from starting.
///
/// Record-level failures never surface here; they are counted in the
/// [`CycleSummary`](crate::CycleSummary) instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] sbom_archiver_core::StoreError),

    #[error("oracle client error: {0}")]
    Oracle(#[from] sbom_archiver_oracle::OracleError),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },

    #[error("concurrency limiter closed")]
    LimiterClosed,

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub(crate) fn join_err(task: &'static str, err: tokio::task::JoinError) -> ReconcileError {
    ReconcileError::Join {
        task,
        message: err.to_string(),
    }
}
