//! Error types for sbom-archiver-oracle.

use thiserror::Error;

/// Any failure to obtain a definite answer from the release system.
///
/// None of these mean "inactive". Callers must leave the record untouched.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The release system answered with a non-success status.
    #[error("release query failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("release query transport error: {0}")]
    Transport(String),

    /// The response body is not the JSON shape we expect.
    #[error("cannot decode release response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The JSON decoded but a required nested field is absent.
    #[error("release response schema mismatch: {0}")]
    Schema(String),

    /// The configured base URL cannot carry collection/project path segments.
    #[error("invalid oracle base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl OracleError {
    /// HTTP status for audit logging, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
