//! Error types for sbom-archiver-core.

use thiserror::Error;

/// All errors that can arise from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configured connection string does not name a usable database.
    #[error("invalid store connection string '{0}'")]
    InvalidConnectionString(String),

    /// Connection or query failure reported by SQLite.
    #[error("data access error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded into an [`InventoryRecord`](crate::InventoryRecord).
    #[error("cannot decode record {key}: {reason}")]
    Serialization { key: String, reason: String },
}

/// Startup configuration errors. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or blank.
    #[error("missing required setting {name}")]
    Missing { name: &'static str },

    /// A setting is present but cannot be used.
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}
